//! Ordered alert set for one polling cycle.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::alert::{AlertRecord, AlertType, Severity};

/// Alert types mapped to their per-zone records.
///
/// Types are ordered by descending maximum severity; types of equal severity
/// keep the order in which they were first seen. No type is ever present with
/// an empty record list.
///
/// Serialized as a JSON object whose key order is the snapshot order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    entries: Vec<(AlertType, Vec<AlertRecord>)>,
}

impl Snapshot {
    /// Group records by alert type, collapse duplicates per zone and order by severity.
    ///
    /// Within a type only the first record for each zone is kept; its severity
    /// is raised to the highest severity seen for that zone.
    pub fn from_records(records: impl IntoIterator<Item = AlertRecord>) -> Self {
        let mut entries: Vec<(AlertType, Vec<AlertRecord>)> = Vec::new();
        let mut positions: HashMap<AlertType, usize> = HashMap::new();

        for record in records {
            let idx = *positions.entry(record.event.clone()).or_insert_with(|| {
                entries.push((record.event.clone(), Vec::new()));
                entries.len() - 1
            });
            let list = &mut entries[idx].1;

            match list.iter_mut().find(|r| r.county_code == record.county_code) {
                Some(existing) => {
                    if record.severity > existing.severity {
                        log::debug!(
                            "Duplicate {} for {}: raising severity {} -> {}",
                            record.event,
                            record.county_code,
                            existing.severity,
                            record.severity
                        );
                        existing.severity = record.severity;
                    }
                }
                None => list.push(record),
            }
        }

        // Vec::sort_by is stable, so ties keep first-seen order.
        entries.sort_by(|(_, a), (_, b)| max_severity(b).cmp(&max_severity(a)));

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of alert types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of records across all types.
    pub fn record_count(&self) -> usize {
        self.entries.iter().map(|(_, records)| records.len()).sum()
    }

    /// Iterate `(alert type, records)` in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AlertRecord])> {
        self.entries
            .iter()
            .map(|(alert_type, records)| (alert_type.as_str(), records.as_slice()))
    }

    /// Alert type names in snapshot order.
    pub fn alert_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(alert_type, _)| alert_type.as_str())
    }

    pub fn get(&self, alert_type: &str) -> Option<&[AlertRecord]> {
        self.entries
            .iter()
            .find(|(name, _)| name == alert_type)
            .map(|(_, records)| records.as_slice())
    }

    pub fn contains(&self, alert_type: &str) -> bool {
        self.get(alert_type).is_some()
    }

    /// Highest severity among the records of a type.
    pub fn max_severity(&self, alert_type: &str) -> Option<Severity> {
        self.get(alert_type).map(max_severity)
    }

    /// Zones contributing to a type (empty if the type is absent).
    pub fn county_codes(&self, alert_type: &str) -> BTreeSet<&str> {
        self.get(alert_type)
            .unwrap_or_default()
            .iter()
            .map(|r| r.county_code.as_str())
            .collect()
    }

    /// Keep only the types for which `keep` returns true. Order is preserved.
    pub fn retain_types(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|(alert_type, _)| keep(alert_type));
    }
}

fn max_severity(records: &[AlertRecord]) -> Severity {
    records
        .iter()
        .map(|r| r.severity)
        .max()
        .unwrap_or_default()
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (alert_type, records) in &self.entries {
            map.serialize_entry(alert_type, records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of alert type to alert records")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Snapshot, A::Error> {
                let mut entries: Vec<(AlertType, Vec<AlertRecord>)> = Vec::new();
                while let Some((alert_type, records)) =
                    access.next_entry::<AlertType, Vec<AlertRecord>>()?
                {
                    if records.is_empty() || entries.iter().any(|(name, _)| *name == alert_type) {
                        continue;
                    }
                    entries.push((alert_type, records));
                }
                Ok(Snapshot { entries })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}
