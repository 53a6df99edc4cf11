//! Alert normalizer.
//!
//! Turns a zone's raw feed payload into canonical [`AlertRecord`]s. A bad
//! timestamp degrades the record's end time to [`EndTime::Invalid`]; it never
//! drops the record.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::{AlertRecord, EndTime, FeatureProperties, FeedPayload, Severity};

const UNKNOWN_EVENT: &str = "Unknown Event";

/// Naive layouts accepted after RFC 3339 and RFC 2822, read as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalize every feature in a zone's payload.
pub fn normalize_payload(county_code: &str, payload: &FeedPayload) -> Vec<AlertRecord> {
    payload
        .features
        .iter()
        .map(|feature| {
            let props = feature.properties.clone().unwrap_or_default();
            normalize_properties(county_code, props)
        })
        .collect()
}

fn normalize_properties(county_code: &str, props: FeatureProperties) -> AlertRecord {
    let severity = resolve_severity(&props);
    let end_time_utc = match props.ends.as_deref() {
        Some(raw) => parse_end_time(raw).unwrap_or_else(|| {
            log::warn!("Unparsable end time '{raw}' for {county_code}");
            EndTime::Invalid
        }),
        None => EndTime::Invalid,
    };

    AlertRecord {
        county_code: county_code.to_string(),
        severity,
        description: props.description.unwrap_or_default(),
        end_time_utc,
        event: props
            .event
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_EVENT.to_string()),
        headline: props.headline.filter(|h| !h.is_empty()),
        instruction: props.instruction.filter(|i| !i.is_empty()),
    }
}

/// Resolve severity: provider keyword, then event-name words, then `Unknown`.
pub fn resolve_severity(props: &FeatureProperties) -> Severity {
    props
        .severity
        .as_deref()
        .and_then(Severity::from_keyword)
        .or_else(|| props.event.as_deref().and_then(Severity::from_event_name))
        .unwrap_or(Severity::Unknown)
}

/// Parse a provider timestamp into UTC.
pub fn parse_end_time(raw: &str) -> Option<EndTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(EndTime::At(at.with_timezone(&Utc)));
    }
    if let Ok(at) = DateTime::parse_from_rfc2822(raw) {
        return Some(EndTime::At(at.with_timezone(&Utc)));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| EndTime::At(naive.and_utc()))
}
