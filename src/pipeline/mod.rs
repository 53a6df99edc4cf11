//! Pipeline stages and the cycle entry point.
//!
//! - `filter`: blocklist and severity ordering
//! - `diff`: coverage change detection
//! - `decision`: alert / all-clear state machine
//! - `cycle`: one full polling cycle

pub mod cycle;
pub mod decision;
pub mod diff;
pub mod filter;

pub use cycle::{AlertPipeline, CycleOutcome, run_cycle};
pub use decision::{Decision, DecisionPolicy, Phase, Verdict, decide};
pub use diff::{CoverageChange, DiffResult, detect_coverage_changes};
pub use filter::{Blocklist, filter_and_sort};
