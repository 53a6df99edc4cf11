// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Result;
use crate::models::ApiConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ApiConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/geo+json, application/json"),
    );

    let client = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// Capped retries with exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every later one
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.retry_attempts, Duration::from_millis(config.backoff_ms))
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Longest time a request can take when every attempt hits `timeout`.
    pub fn worst_case(&self, timeout: Duration) -> Duration {
        let attempts = timeout.saturating_mul(self.max_retries.saturating_add(1));
        (0..self.max_retries).fold(attempts, |total, attempt| {
            total.saturating_add(self.delay(attempt))
        })
    }
}

/// Status codes worth another attempt: rate limiting and server errors.
pub fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// GET a JSON document, retrying transient failures according to `policy`.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
    query: &[(&str, &str)],
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<T> {
    let mut attempt = 0;
    loop {
        let result = client
            .get(url.clone())
            .query(query)
            .timeout(timeout)
            .send()
            .await;

        match result {
            Ok(response) if is_retryable(response.status()) && attempt < policy.max_retries => {
                log::debug!(
                    "{} returned {}, retry {}/{}",
                    url,
                    response.status(),
                    attempt + 1,
                    policy.max_retries
                );
            }
            Ok(response) => {
                let body = response.error_for_status()?.text().await?;
                return Ok(serde_json::from_str(&body)?);
            }
            Err(error)
                if (error.is_timeout() || error.is_connect()) && attempt < policy.max_retries =>
            {
                log::debug!(
                    "{} failed ({}), retry {}/{}",
                    url,
                    error,
                    attempt + 1,
                    policy.max_retries
                );
            }
            Err(error) => return Err(error.into()),
        }

        tokio::time::sleep(policy.delay(attempt)).await;
        attempt += 1;
    }
}
