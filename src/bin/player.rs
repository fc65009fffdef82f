//! Native Player
//!
//! Plays the server's live stream through the local output device.
//! Usage: `soundsync-player [base-url]`

use anyhow::Result;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundsync::{
    audio::{device::list_output_devices, output::AudioOutput},
    config::AppConfig,
    network::client::StreamClient,
    playback::{Player, VisualFrame},
    telemetry::Stats,
};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Latest monitoring readings, shown next to the visualizer
#[derive(Default)]
struct MonitorStatus {
    stats: Option<Stats>,
    ping: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting soundsync player");

    let mut config = AppConfig::load_or_create(&AppConfig::default_path())?.player;
    if let Some(url) = std::env::args().nth(1) {
        config.server_url = url;
    }
    let config = config.sanitized();

    println!("\n=== Available Output Devices ===");
    for device in list_output_devices() {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}", device.name, default_marker);
    }
    println!();

    let client = StreamClient::new(config.server_url.clone());
    let status = Arc::new(Mutex::new(MonitorStatus::default()));

    // Monitoring runs independently of playback; failures only log
    let stats_task = {
        let client = client.clone();
        let status = status.clone();
        let period = Duration::from_millis(config.stats_interval_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match client.fetch_stats().await {
                    Ok(stats) => status.lock().stats = Some(stats),
                    Err(e) => tracing::debug!("Stats fetch failed: {}", e),
                }
            }
        })
    };
    let ping_task = {
        let client = client.clone();
        let status = status.clone();
        let period = Duration::from_millis(config.ping_interval_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match client.measure_ping().await {
                    Ok(rtt) => status.lock().ping = Some(rtt),
                    Err(e) => tracing::debug!("Ping failed: {}", e),
                }
            }
        })
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stopping playback");
            let _ = stop_tx.send(true);
        }
    });

    tracing::info!(
        "Volume {:.0}%, bass {:+.1} dB - press Ctrl+C to stop",
        config.volume * 100.0,
        config.bass_db
    );

    let mut player = Player::default();
    let mut last_draw: Option<Instant> = None;
    let output_config = config.clone();
    let result = player
        .run(
            move || AudioOutput::start(&output_config),
            client.open_stream(),
            stop_rx,
            |frame| {
                if last_draw.map_or(true, |t| t.elapsed() >= REDRAW_INTERVAL) {
                    last_draw = Some(Instant::now());
                    draw(frame, &status.lock());
                }
            },
        )
        .await;

    stats_task.abort();
    ping_task.abort();
    println!();

    match result {
        Ok(stats) => {
            tracing::info!(
                "Session ended: {} frames received, {} scheduled, {} dropped, {} resyncs",
                stats.frames_received,
                stats.frames_scheduled,
                stats.frames_dropped,
                stats.resyncs
            );
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn draw(frame: &VisualFrame, status: &MonitorStatus) {
    let ping = status
        .ping
        .map(|rtt| format!("{}ms", rtt.as_millis()))
        .unwrap_or_else(|| "-".to_string());
    let server = status
        .stats
        .as_ref()
        .map(|s| {
            format!(
                "{} listeners, cpu {:.1}%, ram {} MB, {:.1} KB/s",
                s.listeners, s.cpu, s.ram, s.bandwidth
            )
        })
        .unwrap_or_else(|| "-".to_string());

    let mut stdout = std::io::stdout().lock();
    let _ = write!(
        stdout,
        "\r[{}] bass [{}] queue {:>2} | ping {} | {}",
        frame.spectrum, frame.bass, frame.queued, ping, server
    );
    let _ = stdout.flush();
}
