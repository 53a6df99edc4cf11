// src/pipeline/cycle.rs

//! One polling cycle: fetch, normalize, filter, diff, decide, persist.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, CountyCode, Snapshot};
use crate::services::{ZoneAlertSource, ZoneFetcher, normalize_payload};
use crate::storage::StateStorage;

use super::decision::{self, Decision, DecisionPolicy, Phase};
use super::diff::{CoverageChange, detect_coverage_changes};
use super::filter::{Blocklist, filter_and_sort};

/// Everything a downstream announcer needs from one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub decision: Decision,
    pub phase: Phase,
    /// Filtered alert set, highest severity first
    pub snapshot: Snapshot,
    pub coverage_changes: Vec<CoverageChange>,
    pub zones_fetched: usize,
    /// Zones that contributed nothing because their fetch failed
    pub zones_failed: Vec<CountyCode>,
    /// Whether the state file was rewritten
    pub state_written: bool,
    /// Set when polling is disabled or no zones are configured; nothing was
    /// fetched and `snapshot` is the previous cycle's
    pub skipped: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Stages of the alert pipeline, built once per run from the configuration.
pub struct AlertPipeline<'a> {
    enabled: bool,
    zones: &'a [CountyCode],
    fetcher: ZoneFetcher<'a>,
    blocklist: Blocklist,
    policy: DecisionPolicy,
}

impl<'a> AlertPipeline<'a> {
    pub fn new(config: &'a Config, source: &'a dyn ZoneAlertSource) -> Result<Self> {
        Ok(Self {
            enabled: config.alerting.enabled,
            zones: &config.alerting.county_codes,
            fetcher: ZoneFetcher::from_config(source, &config.api),
            blocklist: Blocklist::new(&config.blocked_events.global)?,
            policy: DecisionPolicy::from_config(config)?,
        })
    }

    /// Run a single cycle against `storage`.
    ///
    /// The state is loaded first so a corrupt state file fails before any
    /// network traffic. A failed flush fails the cycle; the decision is not
    /// returned and the next cycle decides again from the old state.
    pub async fn run_cycle(&self, storage: &mut dyn StateStorage) -> Result<CycleOutcome> {
        let started_at = Utc::now();
        let mut state = storage.load().await?;

        // An empty zone list would read as "everything cleared".
        if !self.enabled || self.zones.is_empty() {
            if self.enabled {
                log::warn!("No county codes configured, skipping cycle");
            } else {
                log::info!("Alert polling disabled, skipping cycle");
            }
            return Ok(Self::skipped(state.last_alerts, started_at));
        }

        log::info!("Fetching alerts for {} zones", self.zones.len());
        let fetched = self.fetcher.fetch_all(self.zones).await;

        let mut records = Vec::new();
        let mut zones_failed = Vec::new();
        for result in &fetched.results {
            match &result.payload {
                Some(payload) => records.extend(normalize_payload(&result.county_code, payload)),
                None => zones_failed.push(result.county_code.clone()),
            }
        }

        let snapshot = filter_and_sort(records, &self.blocklist);
        let coverage = detect_coverage_changes(&state.last_alerts, &snapshot);
        let verdict = decision::decide(&mut state, &snapshot, &coverage, &self.policy, Utc::now());

        let state_written = storage.flush(&state).await?;

        log::info!(
            "Cycle complete: {} alert types from {}/{} zones, decision {:?}",
            snapshot.len(),
            fetched.succeeded(),
            fetched.results.len(),
            verdict.decision
        );

        Ok(CycleOutcome {
            decision: verdict.decision,
            phase: verdict.phase,
            snapshot,
            coverage_changes: coverage.changes,
            zones_fetched: fetched.succeeded(),
            zones_failed,
            state_written,
            skipped: false,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn skipped(previous: Snapshot, started_at: DateTime<Utc>) -> CycleOutcome {
        let phase = if previous.is_empty() {
            Phase::NoActiveAlerts
        } else {
            Phase::ActiveAlerts
        };
        CycleOutcome {
            decision: Decision::None,
            phase,
            snapshot: previous,
            coverage_changes: Vec::new(),
            zones_fetched: 0,
            zones_failed: Vec::new(),
            state_written: false,
            skipped: true,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Build the pipeline and run one cycle.
pub async fn run_cycle(
    config: &Config,
    source: &dyn ZoneAlertSource,
    storage: &mut dyn StateStorage,
) -> Result<CycleOutcome> {
    AlertPipeline::new(config, source)?.run_cycle(storage).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::models::{Feature, FeatureProperties, FeedPayload, State};

    /// Feed whose per-zone answers can be swapped between cycles.
    #[derive(Default)]
    struct ScriptedSource {
        zones: Mutex<HashMap<String, Option<Vec<(&'static str, &'static str)>>>>,
    }

    impl ScriptedSource {
        /// `None` makes the zone fail.
        fn set(&self, zone: &str, alerts: Option<Vec<(&'static str, &'static str)>>) {
            self.zones.lock().unwrap().insert(zone.to_string(), alerts);
        }
    }

    #[async_trait]
    impl ZoneAlertSource for ScriptedSource {
        async fn fetch(&self, county_code: &str, _timeout: Duration) -> Result<FeedPayload> {
            let answer = self.zones.lock().unwrap().get(county_code).cloned();
            match answer.flatten() {
                Some(alerts) => Ok(FeedPayload {
                    features: alerts
                        .into_iter()
                        .map(|(event, severity)| Feature {
                            properties: Some(FeatureProperties {
                                event: Some(event.to_string()),
                                severity: Some(severity.to_string()),
                                ends: Some("2026-05-01T18:30:00-05:00".to_string()),
                                ..FeatureProperties::default()
                            }),
                        })
                        .collect(),
                }),
                None => Err(AppError::fetch(county_code, "connection refused")),
            }
        }
    }

    /// In-memory storage that can be told to fail its next flush.
    #[derive(Default)]
    struct MemoryStorage {
        state: Option<State>,
        fail_flush: bool,
        flushes: usize,
    }

    #[async_trait]
    impl StateStorage for MemoryStorage {
        async fn load(&mut self) -> Result<State> {
            Ok(self.state.clone().unwrap_or_default())
        }

        async fn flush(&mut self, state: &State) -> Result<bool> {
            if self.fail_flush {
                return Err(AppError::Io(std::io::Error::other("disk full")));
            }
            self.flushes += 1;
            self.state = Some(state.clone());
            Ok(true)
        }
    }

    fn config(zones: &[&str]) -> Config {
        let mut config = Config::default();
        config.alerting.county_codes = zones.iter().map(|z| z.to_string()).collect();
        config
    }

    #[tokio::test]
    async fn test_failed_zone_contributes_nothing() {
        let config = config(&["A", "B"]);
        let source = ScriptedSource::default();
        source.set("A", Some(vec![("Tornado Warning", "Extreme")]));
        source.set("B", None);
        let mut storage = MemoryStorage::default();

        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();

        assert_eq!(outcome.zones_fetched, 1);
        assert_eq!(outcome.zones_failed, vec!["B"]);
        assert_eq!(outcome.snapshot.county_codes("Tornado Warning").len(), 1);
        assert!(matches!(outcome.decision, Decision::EmitAlert { .. }));
    }

    #[tokio::test]
    async fn test_global_blocklist_applies_before_diff() {
        let mut config = config(&["A"]);
        config.blocked_events.global = vec!["*Statement".into()];
        let source = ScriptedSource::default();
        source.set(
            "A",
            Some(vec![("Special Weather Statement", "Extreme")]),
        );
        let mut storage = MemoryStorage::default();

        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();

        assert!(outcome.snapshot.is_empty());
        assert_eq!(outcome.phase, Phase::NoActiveAlerts);
        assert_eq!(outcome.decision, Decision::None);
    }

    #[tokio::test]
    async fn test_flush_failure_fails_cycle_and_decision_is_retried() {
        let config = config(&["A"]);
        let source = ScriptedSource::default();
        source.set("A", Some(vec![("Tornado Warning", "Extreme")]));
        let mut storage = MemoryStorage {
            fail_flush: true,
            ..MemoryStorage::default()
        };

        assert!(run_cycle(&config, &source, &mut storage).await.is_err());
        assert!(storage.state.is_none());

        storage.fail_flush = false;
        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();
        assert!(matches!(outcome.decision, Decision::EmitAlert { .. }));
        assert_eq!(storage.flushes, 1);
    }

    #[tokio::test]
    async fn test_clearing_zone_list_does_not_announce_all_clear() {
        let mut config = config(&["A"]);
        let source = ScriptedSource::default();
        source.set("A", Some(vec![("Tornado Warning", "Extreme")]));
        let mut storage = MemoryStorage::default();
        run_cycle(&config, &source, &mut storage).await.unwrap();
        let before = storage.state.clone();

        config.alerting.county_codes.clear();
        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();

        assert!(outcome.skipped);
        assert_eq!(outcome.decision, Decision::None);
        assert_eq!(outcome.phase, Phase::ActiveAlerts);
        assert!(outcome.snapshot.contains("Tornado Warning"));
        assert!(!outcome.state_written);
        assert_eq!(storage.flushes, 1);
        assert_eq!(storage.state, before);
    }

    #[tokio::test]
    async fn test_disabled_poller_leaves_state_alone() {
        let mut config = config(&["A"]);
        let source = ScriptedSource::default();
        source.set("A", Some(vec![("Tornado Warning", "Extreme")]));
        let mut storage = MemoryStorage::default();
        run_cycle(&config, &source, &mut storage).await.unwrap();

        config.alerting.enabled = false;
        source.set("A", Some(vec![]));
        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();
        assert!(outcome.skipped);
        assert_eq!(outcome.decision, Decision::None);
        assert_eq!(storage.flushes, 1);

        // Re-enabling sees the real clear and announces it once.
        config.alerting.enabled = true;
        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.decision, Decision::EmitAllClear);
    }

    #[tokio::test]
    async fn test_outcome_serializes_for_downstream() {
        let config = config(&["A"]);
        let source = ScriptedSource::default();
        source.set("A", Some(vec![("Flood Watch", "Severe")]));
        let mut storage = MemoryStorage::default();

        let outcome = run_cycle(&config, &source, &mut storage).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["decision"]["kind"], "emit-alert");
        assert_eq!(json["phase"], "active_alerts");
        assert_eq!(json["snapshot"]["Flood Watch"][0]["county_code"], "A");
        assert_eq!(json["snapshot"]["Flood Watch"][0]["severity"], 3);
        assert_eq!(
            json["snapshot"]["Flood Watch"][0]["end_time_utc"],
            "2026-05-01T23:30:00.000000Z"
        );
    }
}
