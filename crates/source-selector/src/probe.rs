//! Source Prober

use crate::registry::Registry;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// State strings that mark a source as not currently reporting
pub const UNAVAILABLE_STATES: [&str; 3] = ["unavailable", "unknown", "None"];

/// Value and metadata observed for a source at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSnapshot {
    /// Raw value, verbatim from the registry
    pub value: String,
    /// Metadata, verbatim from the registry
    pub metadata: BTreeMap<String, String>,
}

/// Classification of a source's current record
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// Registry has no record
    Absent,
    /// Record holds one of [`UNAVAILABLE_STATES`]
    Unavailable(String),
    /// Record holds a real value
    Valid(SourceSnapshot),
}

impl Probe {
    /// Snapshot of a valid probe
    pub fn into_snapshot(self) -> Option<SourceSnapshot> {
        match self {
            Probe::Valid(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Look up `source` in the registry and classify it
pub fn probe<R: Registry + ?Sized>(registry: &R, source: &str) -> Probe {
    let Some(record) = registry.get(source) else {
        debug!("Source entity '{}' does not exist", source);
        return Probe::Absent;
    };

    if UNAVAILABLE_STATES.contains(&record.value.as_str()) {
        debug!("Source entity '{}' is {}", source, record.value);
        return Probe::Unavailable(record.value.clone());
    }

    Probe::Valid(SourceSnapshot {
        value: record.value.clone(),
        metadata: record.attributes.clone(),
    })
}
