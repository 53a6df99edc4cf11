//! Coverage change detection between consecutive snapshots.
//!
//! Only alert types present in both snapshots are compared. A type that
//! appears or disappears is an existence change and is left to the decision
//! engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{AlertType, CountyCode, Snapshot};

/// Zones that joined or left an alert type that stayed active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageChange {
    pub alert_type: AlertType,
    pub added: Vec<CountyCode>,
    pub removed: Vec<CountyCode>,
}

/// Coverage changes, in current snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<CoverageChange>,
}

impl DiffResult {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Get the number of changed alert types.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn changed_types(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.alert_type.as_str())
    }
}

/// Compare zone coverage of every alert type active in both snapshots.
pub fn detect_coverage_changes(previous: &Snapshot, current: &Snapshot) -> DiffResult {
    let changes = current
        .alert_types()
        .filter(|alert_type| previous.contains(alert_type))
        .filter_map(|alert_type| {
            let prev: BTreeSet<&str> = previous.county_codes(alert_type);
            let curr: BTreeSet<&str> = current.county_codes(alert_type);

            let added: Vec<CountyCode> = curr.difference(&prev).map(|c| c.to_string()).collect();
            let removed: Vec<CountyCode> =
                prev.difference(&curr).map(|c| c.to_string()).collect();

            if added.is_empty() && removed.is_empty() {
                return None;
            }

            log::info!(
                "Coverage changed for {}: +{:?} -{:?}",
                alert_type,
                added,
                removed
            );
            Some(CoverageChange {
                alert_type: alert_type.to_string(),
                added,
                removed,
            })
        })
        .collect();

    DiffResult { changes }
}
