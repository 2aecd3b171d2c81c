//! Publication Types
//!
//! What an engine hands to its output sink after every applied update.

use chrono::{DateTime, Utc};
use serde::Serialize;
use source_selector::SourceId;
use std::collections::BTreeMap;

/// Descriptive metadata copied from the active source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptiveMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl DescriptiveMetadata {
    /// Pick the descriptive keys out of a source's metadata
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Self {
        let field = |key: &str| metadata.get(key).cloned();
        Self {
            unit_of_measurement: field("unit_of_measurement"),
            device_class: field("device_class"),
            state_class: field("state_class"),
            icon: field("icon"),
        }
    }
}

/// Audit trail published alongside the value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    /// Active source
    pub current_source: Option<SourceId>,
    /// All sources in priority order
    pub source_entities: Vec<SourceId>,
    /// Index of the active source
    pub source_index: Option<usize>,
    /// Number of applied source switches
    pub fallback_count: u64,
    /// Time of the last applied switch (RFC 3339)
    pub last_fallback_time: Option<DateTime<Utc>>,
}

/// Attribute mapping of a publication
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputAttributes {
    #[serde(flatten)]
    pub provenance: Provenance,
    #[serde(flatten)]
    pub metadata: DescriptiveMetadata,
}

/// One output update of a fallback sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Publication {
    pub unique_id: String,
    pub name: String,
    /// Selected value, `None` when no source is available
    pub state: Option<String>,
    pub available: bool,
    pub attributes: OutputAttributes,
}

/// Output sink for publications
pub trait Publisher {
    /// Accept a publication
    fn publish(&mut self, publication: Publication);
}

impl Publisher for Vec<Publication> {
    fn publish(&mut self, publication: Publication) {
        self.push(publication);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_metadata_picks_descriptive_keys() {
        let mut source = BTreeMap::new();
        source.insert("unit_of_measurement".to_string(), "°C".to_string());
        source.insert("device_class".to_string(), "temperature".to_string());
        source.insert("friendly_name".to_string(), "Probe A".to_string());

        let metadata = DescriptiveMetadata::from_metadata(&source);
        assert_eq!(metadata.unit_of_measurement.as_deref(), Some("°C"));
        assert_eq!(metadata.device_class.as_deref(), Some("temperature"));
        assert_eq!(metadata.state_class, None);
        assert_eq!(metadata.icon, None);
    }

    #[test]
    fn test_publication_json_shape() {
        let publication = Publication {
            unique_id: "outdoor".to_string(),
            name: "Outdoor".to_string(),
            state: Some("21.5".to_string()),
            available: true,
            attributes: OutputAttributes {
                provenance: Provenance {
                    current_source: Some("sensor.b".to_string()),
                    source_entities: vec!["sensor.a".to_string(), "sensor.b".to_string()],
                    source_index: Some(1),
                    fallback_count: 2,
                    last_fallback_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
                },
                metadata: DescriptiveMetadata {
                    unit_of_measurement: Some("°C".to_string()),
                    ..Default::default()
                },
            },
        };

        let json = serde_json::to_value(&publication).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "unique_id": "outdoor",
                "name": "Outdoor",
                "state": "21.5",
                "available": true,
                "attributes": {
                    "current_source": "sensor.b",
                    "source_entities": ["sensor.a", "sensor.b"],
                    "source_index": 1,
                    "fallback_count": 2,
                    "last_fallback_time": "2024-03-01T12:00:00Z",
                    "unit_of_measurement": "°C"
                }
            })
        );
    }
}
