//! Canonical alert record and severity scale.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of one monitored zone (e.g. `TXC039`).
pub type CountyCode = String;

/// Hazard category name, taken verbatim from the feed's `event` field.
pub type AlertType = String;

/// Ordinal hazard severity, ascending.
///
/// Persisted as its ordinal (`0..=4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Unknown,
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    /// Map a provider-supplied severity keyword. Exact, case-sensitive match.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Extreme" => Some(Self::Extreme),
            "Severe" => Some(Self::Severe),
            "Moderate" => Some(Self::Moderate),
            "Minor" => Some(Self::Minor),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Infer severity from words in the event name.
    ///
    /// The table is checked in order and the first substring hit wins, so
    /// "Winter Storm Watch Statement" resolves to `Severe`.
    pub fn from_event_name(event: &str) -> Option<Self> {
        const WORDS: [(&str, Severity); 4] = [
            ("Warning", Severity::Extreme),
            ("Watch", Severity::Severe),
            ("Advisory", Severity::Moderate),
            ("Statement", Severity::Minor),
        ];

        WORDS
            .iter()
            .find(|(word, _)| event.contains(word))
            .map(|(_, severity)| *severity)
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Minor),
            2 => Some(Self::Moderate),
            3 => Some(Self::Severe),
            4 => Some(Self::Extreme),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Minor => "Minor",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
            Self::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_ordinal(value)
            .ok_or_else(|| serde::de::Error::custom(format!("severity out of range: {value}")))
    }
}

/// End of an alert's validity window.
///
/// `Invalid` is the sentinel for a missing or unparsable provider timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndTime {
    At(DateTime<Utc>),
    #[default]
    Invalid,
}

impl EndTime {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::At(_))
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Invalid => None,
        }
    }
}

impl Serialize for EndTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::At(at) => {
                serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            Self::Invalid => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for EndTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.is_empty() {
            return Ok(Self::Invalid);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| Self::At(at.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

/// A single hazard affecting a single zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Zone the alert was fetched for
    pub county_code: CountyCode,

    /// Resolved severity
    pub severity: Severity,

    /// Long-form provider description
    #[serde(default)]
    pub description: String,

    /// End of validity, canonical UTC or the invalid sentinel
    #[serde(default)]
    pub end_time_utc: EndTime,

    /// Alert type name
    pub event: AlertType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::Unknown < Severity::Minor);
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Moderate < Severity::Severe);
        assert!(Severity::Severe < Severity::Extreme);
    }

    #[test]
    fn test_from_keyword() {
        assert_eq!(Severity::from_keyword("Extreme"), Some(Severity::Extreme));
        assert_eq!(Severity::from_keyword("Unknown"), Some(Severity::Unknown));
        assert_eq!(Severity::from_keyword("extreme"), None);
        assert_eq!(Severity::from_keyword(""), None);
    }

    #[test]
    fn test_from_event_name() {
        assert_eq!(
            Severity::from_event_name("Tornado Warning"),
            Some(Severity::Extreme)
        );
        assert_eq!(
            Severity::from_event_name("Flood Watch"),
            Some(Severity::Severe)
        );
        assert_eq!(
            Severity::from_event_name("Heat Advisory"),
            Some(Severity::Moderate)
        );
        assert_eq!(
            Severity::from_event_name("Rip Current Statement"),
            Some(Severity::Minor)
        );
        assert_eq!(Severity::from_event_name("Air Quality Alert"), None);
    }

    #[test]
    fn test_ordinal_round_trip_bounds() {
        assert_eq!(Severity::Extreme.ordinal(), 4);
        assert_eq!(Severity::from_ordinal(0), Some(Severity::Unknown));
        assert_eq!(Severity::from_ordinal(5), None);
    }

    #[test]
    fn test_end_time_serialization() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 18, 30, 0).unwrap();
        let json = serde_json::to_string(&EndTime::At(at)).unwrap();
        assert_eq!(json, "\"2026-05-01T18:30:00.000000Z\"");

        assert_eq!(serde_json::to_string(&EndTime::Invalid).unwrap(), "\"\"");
        let back: EndTime = serde_json::from_str("\"\"").unwrap();
        assert_eq!(back, EndTime::Invalid);
        let null: EndTime = serde_json::from_str("null").unwrap();
        assert_eq!(null, EndTime::Invalid);
    }

    #[test]
    fn test_severity_rejects_out_of_range() {
        assert!(serde_json::from_str::<Severity>("9").is_err());
        assert_eq!(serde_json::from_str::<Severity>("3").unwrap(), Severity::Severe);
    }
}
