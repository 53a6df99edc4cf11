//! Cross-cycle state persisted between polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;

/// What the previous cycles left behind for the next one to diff against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct State {
    /// Filtered snapshot of the most recent cycle
    #[serde(default)]
    pub last_alerts: Snapshot,

    /// Snapshot that was last announced
    #[serde(default)]
    pub last_say_alert: Snapshot,

    /// When the most recent all-clear was decided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_all_clear: Option<DateTime<Utc>>,
}

impl State {
    /// The state of a fresh installation.
    pub fn empty() -> Self {
        Self::default()
    }
}
