// src/error.rs

//! Unified error handling for the alert pipeline.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Blocklist glob could not be compiled
    #[error("Invalid blocklist pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted state exists but cannot be read back
    #[error("State file {path} is corrupt: {message}")]
    StateCorrupt { path: String, message: String },

    /// Zone fetch error
    #[error("Fetch error for zone {zone}: {message}")]
    Fetch { zone: String, message: String },
}

impl AppError {
    /// Create a blocklist pattern error.
    pub fn pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a corrupt-state error for the given file.
    pub fn state_corrupt(path: &Path, message: impl fmt::Display) -> Self {
        Self::StateCorrupt {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error for a zone.
    pub fn fetch(zone: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            zone: zone.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error is fatal at startup (bad config or unreadable state).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Validation(_)
                | Self::Toml(_)
                | Self::Pattern { .. }
                | Self::StateCorrupt { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_corrupt_is_fatal_fetch_is_not() {
        let corrupt = AppError::state_corrupt(Path::new("data.json"), "expected value");
        assert!(corrupt.is_fatal());
        assert_eq!(
            corrupt.to_string(),
            "State file data.json is corrupt: expected value"
        );

        let fetch = AppError::fetch("TXC039", "timed out");
        assert!(!fetch.is_fatal());
    }
}
