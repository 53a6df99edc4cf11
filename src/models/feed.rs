//! Raw feed payload as returned by the zone alerts endpoint.
//!
//! Only the fields the normalizer reads are modelled; everything else in the
//! GeoJSON document is ignored.

use serde::{Deserialize, Serialize};

/// One zone's response body. A document without `features` does not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPayload {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Option<FeatureProperties>,
}

/// Provider properties of a single alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub event: Option<String>,

    /// Provider severity keyword (`Extreme`, `Severe`, ...)
    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub headline: Option<String>,

    #[serde(default)]
    pub instruction: Option<String>,

    /// End of the hazard, free-form timestamp
    #[serde(default)]
    pub ends: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_geojson_subset() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "id": "urn:oid:1",
                    "properties": {
                        "event": "Tornado Warning",
                        "severity": "Extreme",
                        "ends": "2026-05-01T18:30:00-05:00",
                        "headline": null
                    }
                },
                { "properties": null }
            ]
        }"#;

        let payload: FeedPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.features.len(), 2);
        let props = payload.features[0].properties.as_ref().unwrap();
        assert_eq!(props.event.as_deref(), Some("Tornado Warning"));
        assert!(props.headline.is_none());
        assert!(payload.features[1].properties.is_none());
    }

    #[test]
    fn test_missing_features_is_rejected() {
        assert!(serde_json::from_str::<FeedPayload>(r#"{"title": "x"}"#).is_err());
    }
}
