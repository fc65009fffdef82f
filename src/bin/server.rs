//! Streaming Server
//!
//! Serves live system audio over HTTP. Usage: `soundsync-server [config-path]`

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundsync::{audio::capture::CaptureCommand, config::AppConfig, ui::WebServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting soundsync server");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load_or_create(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    tracing::info!("Using config {}", config_path.display());

    let server = WebServer::new(config.server.clone(), CaptureCommand::from(&config.capture));

    tokio::select! {
        result = server.run() => {
            result.with_context(|| format!("serving on {}", config.server.addr()))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
