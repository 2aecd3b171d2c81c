//! Fallback Sensors - Main Entry Point
//!
//! Usage: `fallback-sensors [CONFIG]`. Source updates are read as JSON lines
//! from stdin; publications are written as JSON lines to stdout.

use anyhow::Context;
use fallback_host::{init_logging, run, AppConfig, FallbackHost, TokioClock, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = AppConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    init_logging(&config)?;

    info!("=== Fallback Sensors v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Loaded {} sensors from {}", config.sensors.len(), path.display());

    let mut host = FallbackHost::new(config.sensors, TokioClock::new())?;
    run(&mut host, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    Ok(())
}
