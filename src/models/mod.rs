// src/models/mod.rs

//! Domain models for the alert pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod alert;
mod config;
mod feed;
mod snapshot;
mod state;

// Re-export all public types
pub use alert::{AlertRecord, AlertType, CountyCode, EndTime, Severity};
pub use config::{
    AlertingConfig, ApiConfig, BlockedEventsConfig, Config, LoggingConfig, StateConfig,
};
pub use feed::{Feature, FeatureProperties, FeedPayload};
pub use snapshot::Snapshot;
pub use state::State;
