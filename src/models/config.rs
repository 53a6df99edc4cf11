//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::pipeline::Blocklist;

/// Root application configuration.
///
/// Constructed once per run and passed by reference to every stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Zones and announcement switches
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Alert type globs to suppress
    #[serde(default)]
    pub blocked_events: BlockedEventsConfig,

    /// Feed endpoint and fetch behavior
    #[serde(default)]
    pub api: ApiConfig,

    /// Persisted state location
    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.max_workers == 0 {
            return Err(AppError::validation("api.max_workers must be > 0"));
        }
        if self.alerting.max_alerts == 0 {
            return Err(AppError::validation(
                "alerting.max_alerts must be > 0 (use say_alert = false to mute alerts)",
            ));
        }
        url::Url::parse(&self.api.base_url)?;
        if self.state.path.as_os_str().is_empty() {
            return Err(AppError::validation("state.path is empty"));
        }
        if self.alerting.county_codes.iter().any(|c| c.trim().is_empty()) {
            return Err(AppError::validation("alerting.county_codes contains an empty code"));
        }
        Blocklist::new(&self.blocked_events.global)?;
        Blocklist::new(&self.blocked_events.say_alert)?;
        Ok(())
    }
}

/// Zones to poll and which announcements are enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Master switch; a disabled poller leaves state and decisions untouched
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Zone identifiers to poll
    #[serde(default)]
    pub county_codes: Vec<String>,

    /// Announce active alerts
    #[serde(default = "defaults::enabled")]
    pub say_alert: bool,

    /// Announce the transition to no active alerts
    #[serde(default = "defaults::enabled")]
    pub say_all_clear: bool,

    /// Re-announce when the zones covered by an active type change
    #[serde(default = "defaults::enabled")]
    pub say_alerts_changed: bool,

    /// Maximum number of types carried in one alert announcement
    #[serde(default = "defaults::max_alerts")]
    pub max_alerts: usize,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            county_codes: Vec::new(),
            say_alert: defaults::enabled(),
            say_all_clear: defaults::enabled(),
            say_alerts_changed: defaults::enabled(),
            max_alerts: defaults::max_alerts(),
        }
    }
}

/// Shell-style globs matched against alert type names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockedEventsConfig {
    /// Dropped before sorting and change detection
    #[serde(default)]
    pub global: Vec<String>,

    /// Tracked, but never announced
    #[serde(default)]
    pub say_alert: Vec<String>,
}

/// Feed endpoint and HTTP behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-zone request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum zones fetched concurrently
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,

    /// Extra attempts after a transient failure
    #[serde(default = "defaults::retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds, doubled per attempt
    #[serde(default = "defaults::backoff")]
    pub backoff_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_workers: defaults::max_workers(),
            retry_attempts: defaults::retry_attempts(),
            backoff_ms: defaults::backoff(),
        }
    }
}

/// Persisted state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "defaults::state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: defaults::state_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }
    pub fn max_alerts() -> usize {
        99
    }

    // API defaults
    pub fn base_url() -> String {
        "https://api.weather.gov".into()
    }
    pub fn user_agent() -> String {
        concat!("alertcast/", env!("CARGO_PKG_VERSION"), " (weather alert poller)").into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_workers() -> usize {
        10
    }
    pub fn retry_attempts() -> u32 {
        3
    }
    pub fn backoff() -> u64 {
        1000
    }

    pub fn state_path() -> PathBuf {
        PathBuf::from("data.json")
    }
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = Config::from_toml("").unwrap();
        assert!(config.alerting.enabled);
        assert!(config.alerting.say_alert);
        assert!(config.alerting.say_all_clear);
        assert!(config.alerting.say_alerts_changed);
        assert_eq!(config.alerting.max_alerts, 99);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.max_workers, 10);
        assert_eq!(config.state.path, PathBuf::from("data.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let config = Config::from_toml(
            r#"
            [alerting]
            enabled = false
            county_codes = ["TXC039", "TXC201"]
            say_all_clear = false
            max_alerts = 5

            [blocked_events]
            global = ["*Statement", "Test*"]

            [api]
            timeout_secs = 3
            max_workers = 2

            [state]
            path = "/var/lib/alertcast/state.json"
            "#,
        )
        .unwrap();

        assert!(!config.alerting.enabled);
        assert_eq!(config.alerting.county_codes, vec!["TXC039", "TXC201"]);
        assert!(!config.alerting.say_all_clear);
        assert!(config.alerting.say_alert);
        assert_eq!(config.alerting.max_alerts, 5);
        assert_eq!(config.blocked_events.global.len(), 2);
        assert_eq!(config.api.timeout(), Duration::from_secs(3));
        assert_eq!(config.api.base_url, "https://api.weather.gov");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = Config::from_toml("[alerting\ncounty_codes = 1").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_rejects_zero_max_alerts() {
        let config = Config::from_toml("[alerting]\nmax_alerts = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.api.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let mut config = Config::default();
        config.blocked_events.global = vec!["[z-a] Warning".into()];
        assert!(matches!(
            config.validate(),
            Err(AppError::Pattern { .. })
        ));
    }
}
