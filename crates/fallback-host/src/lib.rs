//! Fallback Sensor Host
//!
//! Loads sensor definitions, keeps the source registry, and drives every
//! engine from a single event loop fed by JSON lines.

mod clock;
mod feed;
mod host;
mod runtime;
mod settings;

pub use clock::TokioClock;
pub use feed::{parse_line, FeedUpdate};
pub use host::FallbackHost;
pub use runtime::run;
pub use settings::{AppConfig, DEFAULT_CONFIG_PATH};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Host error types
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Sensor '{name}' is misconfigured: {source}")]
    Sensor {
        name: String,
        #[source]
        source: fallback::ConfigError,
    },

    #[error("Duplicate unique_id '{0}'")]
    DuplicateUniqueId(String),

    #[error("Invalid log level '{0}'")]
    LogLevel(String),

    #[error("Malformed feed line: {0}")]
    Feed(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to set tracing subscriber: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize logging to stderr
pub fn init_logging(config: &AppConfig) -> Result<(), HostError> {
    let level: Level = config
        .log_level
        .parse()
        .map_err(|_| HostError::LogLevel(config.log_level.clone()))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
