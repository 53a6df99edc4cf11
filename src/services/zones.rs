// src/services/zones.rs

//! Zone fetcher service.
//!
//! Fetches each zone's feed independently through a bounded pool. A zone that
//! fails or stalls yields an empty slot and never holds up its siblings.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, CountyCode, FeedPayload};
use crate::utils::http::{self, RetryPolicy};

/// Source of raw alert payloads for one zone.
#[async_trait]
pub trait ZoneAlertSource: Send + Sync {
    /// Fetch the active alerts for a zone, giving each network call `timeout`.
    async fn fetch(&self, county_code: &str, timeout: Duration) -> Result<FeedPayload>;

    /// Upper bound on how long one `fetch` may take, retries included.
    fn max_duration(&self, timeout: Duration) -> Duration {
        timeout
    }
}

/// HTTP source backed by the public zone-keyed active alerts endpoint.
pub struct NwsAlertSource {
    client: Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl NwsAlertSource {
    /// Create a source from the API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        let endpoint = Url::parse(&format!(
            "{}/alerts/active",
            config.base_url.trim_end_matches('/')
        ))?;

        Ok(Self {
            client,
            endpoint,
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ZoneAlertSource for NwsAlertSource {
    async fn fetch(&self, county_code: &str, timeout: Duration) -> Result<FeedPayload> {
        log::debug!("Checking for alerts in {} at {}", county_code, self.endpoint);

        let query = [
            ("zone", county_code),
            ("status", "actual"),
            ("message_type", "alert"),
        ];
        http::get_json(&self.client, &self.endpoint, &query, timeout, &self.retry)
            .await
            .map_err(|e| match e {
                AppError::Json(e) => {
                    AppError::fetch(county_code, format!("invalid response structure: {e}"))
                }
                other => other,
            })
    }

    fn max_duration(&self, timeout: Duration) -> Duration {
        self.retry.worst_case(timeout)
    }
}

/// One zone's slot in a fetch round.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneResult {
    pub county_code: CountyCode,
    /// `None` when the zone failed or timed out
    pub payload: Option<FeedPayload>,
}

/// Results of fetching every zone, in the order the zones were requested.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub results: Vec<ZoneResult>,
    pub failures: usize,
}

impl FetchOutcome {
    pub fn get(&self, county_code: &str) -> Option<&ZoneResult> {
        self.results.iter().find(|r| r.county_code == county_code)
    }

    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failures
    }
}

/// Fan-out/fan-in fetcher over a [`ZoneAlertSource`].
pub struct ZoneFetcher<'a> {
    source: &'a dyn ZoneAlertSource,
    max_workers: usize,
    timeout: Duration,
}

impl<'a> ZoneFetcher<'a> {
    pub fn new(source: &'a dyn ZoneAlertSource, max_workers: usize, timeout: Duration) -> Self {
        Self {
            source,
            max_workers: max_workers.max(1),
            timeout,
        }
    }

    pub fn from_config(source: &'a dyn ZoneAlertSource, config: &ApiConfig) -> Self {
        Self::new(source, config.max_workers, config.timeout())
    }

    /// Fetch all zones concurrently, bounded by the worker count.
    ///
    /// Returns only after every zone has produced a result or timed out.
    /// Repeated zone codes share one slot.
    pub async fn fetch_all(&self, zones: &[CountyCode]) -> FetchOutcome {
        let mut seen = HashSet::new();
        let unique: Vec<&CountyCode> = zones.iter().filter(|z| seen.insert(*z)).collect();
        let guard = self.source.max_duration(self.timeout);

        let mut slots: HashMap<&str, Option<FeedPayload>> = HashMap::with_capacity(unique.len());
        let mut zone_stream = stream::iter(unique.iter().copied())
            .map(|zone| async move {
                let fetch = self.source.fetch(zone, self.timeout);
                let result = match tokio::time::timeout(guard, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::fetch(
                        zone.as_str(),
                        format!("no response within {guard:?}"),
                    )),
                };
                (zone, result)
            })
            .buffer_unordered(self.max_workers);

        let mut failures = 0;
        while let Some((zone, result)) = zone_stream.next().await {
            let payload = match result {
                Ok(payload) => {
                    log::debug!("Zone {}: {} features", zone, payload.features.len());
                    Some(payload)
                }
                Err(error) => {
                    failures += 1;
                    log::warn!("Failed to fetch alerts for {}: {}", zone, error);
                    None
                }
            };
            slots.insert(zone.as_str(), payload);
        }

        let results = unique
            .iter()
            .map(|zone| ZoneResult {
                county_code: (*zone).clone(),
                payload: slots.remove(zone.as_str()).flatten(),
            })
            .collect();

        FetchOutcome { results, failures }
    }
}
