//! Signal relay - Entry Point

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use relay_telemetry::{LogSink, RollingLogBuffer};
use tracing::{info, warn};

/// Webhook-to-broker signal relay
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RELAY_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > RELAY_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RELAY_CONFIG").ok())
        .unwrap_or_else(|| relay_bot::DEFAULT_CONFIG_PATH.to_string());

    let relay_bot::LoadedConfig {
        config,
        found,
        warnings,
    } = relay_bot::AppConfig::load(&config_path)?;

    // Logging needs the configured filter and buffer size, so it starts after loading
    let logs = Arc::new(RollingLogBuffer::new(config.telemetry.log_buffer_lines));
    let sink: Arc<dyn LogSink> = logs.clone();
    relay_telemetry::init_logging(&config.telemetry.log_level, Some(sink))?;

    info!("Starting signal relay v{}", env!("CARGO_PKG_VERSION"));
    if found {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
    }
    for warning in &warnings {
        warn!("{warning}");
    }

    let app = relay_bot::Application::new(config, logs)?;
    app.run().await?;

    Ok(())
}
