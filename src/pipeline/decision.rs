//! Announcement decision engine.
//!
//! Each cycle moves the alert area into one of two phases and yields at most
//! one announcement. The cycle's snapshot always becomes the next cycle's
//! `last_alerts`, so the machine never reaches a terminal state.
//!
//! | current   | previous  | phase          | decision                         |
//! |-----------|-----------|----------------|----------------------------------|
//! | non-empty | any       | ActiveAlerts   | alert if first, new or changed   |
//! | empty     | non-empty | NoActiveAlerts | all-clear (once)                 |
//! | empty     | empty     | NoActiveAlerts | none                             |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AlertType, Config, Snapshot, State};

use super::diff::DiffResult;
use super::filter::Blocklist;

/// Whether any alert is active after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NoActiveAlerts,
    ActiveAlerts,
}

/// The single output of a cycle for downstream announcers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Decision {
    /// Announce these alert types, highest severity first
    EmitAlert { alert_types: Vec<AlertType> },
    EmitAllClear,
    None,
}

impl Decision {
    pub fn is_none(&self) -> bool {
        matches!(self, Decision::None)
    }
}

/// Announcement switches, resolved once per run.
#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    pub say_alert: bool,
    pub say_all_clear: bool,
    /// Coverage changes of an active type re-trigger the alert
    pub say_alerts_changed: bool,
    pub max_alerts: usize,
    /// Types that are tracked but never announced
    pub silent: Blocklist,
}

impl DecisionPolicy {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            say_alert: config.alerting.say_alert,
            say_all_clear: config.alerting.say_all_clear,
            say_alerts_changed: config.alerting.say_alerts_changed,
            max_alerts: config.alerting.max_alerts,
            silent: Blocklist::new(&config.blocked_events.say_alert)?,
        })
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            say_alert: true,
            say_all_clear: true,
            say_alerts_changed: true,
            max_alerts: 99,
            silent: Blocklist::empty(),
        }
    }
}

/// Phase and decision produced for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub phase: Phase,
    pub decision: Decision,
}

/// Decide what to announce and advance `state` to the current snapshot.
///
/// `coverage` must be computed against `state.last_alerts` before the call.
pub fn decide(
    state: &mut State,
    current: &Snapshot,
    coverage: &DiffResult,
    policy: &DecisionPolicy,
    now: DateTime<Utc>,
) -> Verdict {
    let verdict = if !current.is_empty() {
        let decision = decide_active(state, current, coverage, policy);
        if decision.is_none() {
            // Forget announced types that have since expired so their return counts as new.
            state.last_say_alert.retain_types(|t| current.contains(t));
        }
        Verdict {
            phase: Phase::ActiveAlerts,
            decision,
        }
    } else if !state.last_alerts.is_empty() {
        state.last_say_alert = Snapshot::default();
        let decision = if policy.say_all_clear {
            log::info!("All alerts cleared, announcing all-clear");
            state.last_all_clear = Some(now);
            Decision::EmitAllClear
        } else {
            log::info!("All alerts cleared, all-clear announcements disabled");
            Decision::None
        };
        Verdict {
            phase: Phase::NoActiveAlerts,
            decision,
        }
    } else {
        Verdict {
            phase: Phase::NoActiveAlerts,
            decision: Decision::None,
        }
    };

    state.last_alerts = current.clone();
    verdict
}

fn decide_active(
    state: &mut State,
    current: &Snapshot,
    coverage: &DiffResult,
    policy: &DecisionPolicy,
) -> Decision {
    if !policy.say_alert {
        return Decision::None;
    }

    let announceable = |alert_type: &str| !policy.silent.is_blocked(alert_type);

    let first = state.last_say_alert.is_empty();
    let new_types: Vec<&str> = current
        .alert_types()
        .filter(|t| announceable(*t) && !state.last_say_alert.contains(t))
        .collect();
    let changed = policy.say_alerts_changed && coverage.changed_types().any(announceable);

    if !(first || changed || !new_types.is_empty()) {
        log::debug!("Active alerts unchanged since last announcement");
        return Decision::None;
    }

    let alert_types: Vec<AlertType> = current
        .alert_types()
        .filter(|t| announceable(*t))
        .take(policy.max_alerts)
        .map(String::from)
        .collect();

    if alert_types.is_empty() {
        log::info!("No announceable alert types in {} active", current.len());
        return Decision::None;
    }

    log::info!(
        "Announcing {} alert types (first: {}, new: {:?}, coverage changed: {})",
        alert_types.len(),
        first,
        new_types,
        changed
    );
    state.last_say_alert = current.clone();
    Decision::EmitAlert { alert_types }
}
