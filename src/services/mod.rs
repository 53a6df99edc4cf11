//! Service layer for the alert pipeline.
//!
//! This module contains the business logic for:
//! - Zone fetching (`ZoneFetcher` over a `ZoneAlertSource`)
//! - Alert normalization (`normalize_payload`)

pub mod normalize;
mod zones;

pub use normalize::normalize_payload;
pub use zones::{FetchOutcome, NwsAlertSource, ZoneAlertSource, ZoneFetcher, ZoneResult};
