//! State Feed Parsing
//!
//! One JSON object per line:
//! `{"entity_id": "sensor.a", "state": "21.5", "attributes": {"unit_of_measurement": "°C"}}`.
//! A `null` state removes the source record. Non-string states and
//! attribute values are kept as their JSON text.

use crate::HostError;
use serde::Deserialize;
use source_selector::SourceRecord;
use std::collections::BTreeMap;

/// One source update read from the feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedUpdate {
    pub entity_id: String,
    #[serde(default)]
    pub state: Option<serde_json::Value>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl FeedUpdate {
    /// Registry record for this update, `None` for a removal
    pub fn record(&self) -> Option<SourceRecord> {
        let value = self.state.as_ref().and_then(stringify)?;
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), stringify(v)?)))
            .collect();
        Some(SourceRecord { value, attributes })
    }
}

fn stringify(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse one feed line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<FeedUpdate>, HostError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}
