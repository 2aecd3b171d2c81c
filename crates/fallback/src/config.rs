//! Fallback Sensor Configuration

use chrono::TimeDelta;
use condition_validator::{Condition, ConditionError};
use serde::{Deserialize, Serialize};
use source_selector::SourceId;
use thiserror::Error;

/// Name used when a sensor is configured without one
pub const DEFAULT_NAME: &str = "Fallback Sensor";
/// Hysteresis delay in seconds; 0 disables debouncing
pub const DEFAULT_HYSTERESIS_DELAY: u64 = 0;
/// Minimum number of source entities per sensor
pub const MIN_SOURCES: usize = 2;

/// Errors raised when a sensor configuration is accepted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Fewer than two sources
    #[error("at least 2 source entities are required, got {0}")]
    TooFewSources(usize),

    /// Blank source id
    #[error("source entity at position {0} is empty")]
    EmptySource(usize),

    /// Same source listed twice
    #[error("source entity '{0}' is listed more than once")]
    DuplicateSource(String),

    /// Delay does not fit a time span
    #[error("hysteresis delay of {0}s is out of range")]
    DelayOutOfRange(u64),

    /// Malformed condition
    #[error("condition {index} is malformed: {source}")]
    Condition {
        index: usize,
        #[source]
        source: ConditionError,
    },
}

/// Configuration of one fallback sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Display name
    #[serde(default = "default_name")]
    pub name: String,

    /// Stable identifier; derived from `name` when absent
    #[serde(default)]
    pub unique_id: Option<String>,

    /// Sources in priority order (index 0 is preferred)
    pub entities: Vec<SourceId>,

    /// Seconds a new candidate must stay best before it becomes active
    #[serde(default)]
    pub hysteresis_delay: u64,

    /// Conditions every source value must satisfy
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

impl EngineConfig {
    /// Create a config with default delay and no conditions
    pub fn new<I, S>(name: impl Into<String>, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceId>,
    {
        Self {
            name: name.into(),
            unique_id: None,
            entities: entities.into_iter().map(Into::into).collect(),
            hysteresis_delay: DEFAULT_HYSTERESIS_DELAY,
            conditions: Vec::new(),
        }
    }

    /// Set the unique id
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Set the hysteresis delay in seconds
    pub fn with_hysteresis_delay(mut self, secs: u64) -> Self {
        self.hysteresis_delay = secs;
        self
    }

    /// Set the conditions
    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Check the configuration can be handed to an engine
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entities.len() < MIN_SOURCES {
            return Err(ConfigError::TooFewSources(self.entities.len()));
        }

        for (index, entity) in self.entities.iter().enumerate() {
            if entity.trim().is_empty() {
                return Err(ConfigError::EmptySource(index));
            }
            if self.entities[..index].contains(entity) {
                return Err(ConfigError::DuplicateSource(entity.clone()));
            }
        }

        if self.hysteresis().is_none() {
            return Err(ConfigError::DelayOutOfRange(self.hysteresis_delay));
        }

        for (index, condition) in self.conditions.iter().enumerate() {
            condition
                .validate()
                .map_err(|source| ConfigError::Condition { index, source })?;
        }

        Ok(())
    }

    /// Hysteresis delay as a time span, if representable
    pub fn hysteresis(&self) -> Option<TimeDelta> {
        i64::try_from(self.hysteresis_delay)
            .ok()
            .and_then(TimeDelta::try_seconds)
    }

    /// Configured unique id, or one derived from the name
    pub fn resolved_unique_id(&self) -> String {
        match &self.unique_id {
            Some(id) => id.clone(),
            None => slugify(&self.name),
        }
    }
}

/// Lowercase `name`, replacing runs of other characters with `_`
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = EngineConfig::new("Outdoor", ["sensor.a", "sensor.b"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.hysteresis(), Some(TimeDelta::zero()));
    }

    #[test]
    fn test_too_few_sources() {
        let config = EngineConfig::new("Outdoor", ["sensor.a"]);
        assert_eq!(config.validate(), Err(ConfigError::TooFewSources(1)));
    }

    #[test]
    fn test_empty_and_duplicate_sources() {
        let config = EngineConfig::new("Outdoor", ["sensor.a", " "]);
        assert_eq!(config.validate(), Err(ConfigError::EmptySource(1)));

        let config = EngineConfig::new("Outdoor", ["sensor.a", "sensor.b", "sensor.a"]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateSource("sensor.a".to_string()))
        );
    }

    #[test]
    fn test_delay_out_of_range() {
        let config = EngineConfig::new("Outdoor", ["sensor.a", "sensor.b"]).with_hysteresis_delay(u64::MAX);
        assert_eq!(config.validate(), Err(ConfigError::DelayOutOfRange(u64::MAX)));
    }

    #[test]
    fn test_malformed_condition() {
        let config = EngineConfig::new("Outdoor", ["sensor.a", "sensor.b"])
            .with_conditions(vec![Condition::regex("^ok"), Condition::range(9.0, 1.0)]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Condition { index: 1, .. })
        ));
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"entities": ["sensor.a", "sensor.b"]}"#).unwrap();
        assert_eq!(config.name, DEFAULT_NAME);
        assert_eq!(config.hysteresis_delay, DEFAULT_HYSTERESIS_DELAY);
        assert!(config.conditions.is_empty());
        assert!(config.unique_id.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "name": "Living Room Temperature",
                "unique_id": "living_temp",
                "entities": ["sensor.a", "sensor.b"],
                "hysteresis_delay": 5,
                "conditions": [{"type": "range", "min": -40, "max": 60}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.hysteresis(), Some(TimeDelta::seconds(5)));
        assert_eq!(config.conditions, vec![Condition::range(-40.0, 60.0)]);
        assert_eq!(config.resolved_unique_id(), "living_temp");
    }

    #[test]
    fn test_unique_id_from_name() {
        let config = EngineConfig::new("Living Room  Temp (backup)", ["a", "b"]);
        assert_eq!(config.resolved_unique_id(), "living_room_temp_backup");
    }
}
