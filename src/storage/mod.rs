//! Storage abstractions for cross-cycle state.
//!
//! The state is read once when a cycle starts and written once when it ends.
//! A write either lands completely or leaves the previous file untouched.
//!
//! ## File Layout
//!
//! ```text
//! {
//!   "last_alerts":    { "Tornado Warning": [ { "county_code": "TXC039", ... } ] },
//!   "last_say_alert": { ... },
//!   "last_all_clear": "2026-05-01T23:30:00Z"
//! }
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::State;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for state storage backends.
///
/// Only one cycle may hold a storage at a time.
#[async_trait]
pub trait StateStorage: Send {
    /// Load the persisted state. A missing state is an empty state.
    async fn load(&mut self) -> Result<State>;

    /// Persist `state`, replacing the previous one.
    ///
    /// Returns `false` when the stored state already matched and nothing was written.
    async fn flush(&mut self, state: &State) -> Result<bool>;
}
