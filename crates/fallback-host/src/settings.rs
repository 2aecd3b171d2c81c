//! Host Configuration
//!
//! Read from a TOML/YAML/JSON file and overridden by `FALLBACK_*`
//! environment variables (`__` separates nested keys).

use crate::HostError;
use fallback::EngineConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::Level;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "fallback.toml";

/// Host configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Max log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Fallback sensors to host
    #[serde(default)]
    pub sensors: Vec<EngineConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            sensors: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from `path` plus the environment
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("FALLBACK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Check every sensor and that unique ids do not collide
    pub fn validate(&self) -> Result<(), HostError> {
        if self.log_level.parse::<Level>().is_err() {
            return Err(HostError::LogLevel(self.log_level.clone()));
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            sensor.validate().map_err(|source| HostError::Sensor {
                name: sensor.name.clone(),
                source,
            })?;

            let unique_id = sensor.resolved_unique_id();
            if !seen.insert(unique_id.clone()) {
                return Err(HostError::DuplicateUniqueId(unique_id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condition_validator::Condition;
    use std::io::Write;

    fn write_config(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml() {
        let file = write_config(
            r#"
log_level = "debug"

[[sensors]]
name = "Outdoor Temperature"
entities = ["sensor.north", "sensor.south"]
hysteresis_delay = 10

[[sensors.conditions]]
type = "range"
min = -40
max = 60

[[sensors]]
name = "Door"
unique_id = "front_door"
entities = ["binary_sensor.a", "binary_sensor.b"]
conditions = [{ type = "regex", pattern = "^(on|off)$" }]
"#,
            ".toml",
        );

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.json_logs);
        assert_eq!(config.sensors.len(), 2);

        let outdoor = &config.sensors[0];
        assert_eq!(outdoor.hysteresis_delay, 10);
        assert_eq!(outdoor.conditions, vec![Condition::range(-40.0, 60.0)]);
        assert_eq!(outdoor.resolved_unique_id(), "outdoor_temperature");

        let door = &config.sensors[1];
        assert_eq!(door.hysteresis_delay, 0);
        assert_eq!(door.conditions, vec![Condition::regex("^(on|off)$")]);
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(
            r#"
sensors:
  - entities: [sensor.a, sensor.b]
    conditions:
      - type: template
"#,
            ".yaml",
        );

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.sensors[0].name, fallback::DEFAULT_NAME);
        assert_eq!(
            config.sensors[0].conditions,
            vec![Condition::Unknown("template".to_string())]
        );
    }

    #[test]
    fn test_rejects_too_few_entities() {
        let file = write_config(
            r#"
[[sensors]]
name = "Lonely"
entities = ["sensor.a"]
"#,
            ".toml",
        );

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            HostError::Sensor {
                source: fallback::ConfigError::TooFewSources(1),
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_duplicate_unique_id() {
        let config = AppConfig {
            sensors: vec![
                EngineConfig::new("Temp", ["sensor.a", "sensor.b"]),
                EngineConfig::new("Other", ["sensor.c", "sensor.d"]).with_unique_id("temp"),
            ],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HostError::DuplicateUniqueId(id)) if id == "temp"
        ));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let config = AppConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HostError::LogLevel(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/fallback.toml")).unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[test]
    fn test_example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/fallback.example.toml");
        let config = AppConfig::load(&path).unwrap();
        assert!(!config.sensors.is_empty());
    }
}
