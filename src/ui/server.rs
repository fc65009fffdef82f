//! HTTP server
//!
//! | Path      | Description                               |
//! |-----------|-------------------------------------------|
//! | `/stream` | Live raw PCM, one capture process per GET |
//! | `/stats`  | Telemetry snapshot as JSON                |
//! | `/ping`   | Plain-text `pong` for RTT measurement     |

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::audio::capture::CaptureCommand;
use crate::config::ServerConfig;
use crate::telemetry::registry::StreamState;
use crate::ui::handlers;

/// Shared state passed to all request handlers
#[derive(Clone)]
pub struct AppState {
    pub stream_state: Arc<StreamState>,
    pub capture: Arc<CaptureCommand>,
}

impl AppState {
    pub fn new(stream_state: Arc<StreamState>, capture: CaptureCommand) -> Self {
        Self {
            stream_state,
            capture: Arc::new(capture),
        }
    }
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    // Answers preflight requests; the handlers set the origin header themselves
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stream", get(handlers::stream_audio))
        .route("/stats", get(handlers::get_stats))
        .route("/ping", get(handlers::ping))
        .layer(cors)
        .with_state(state)
}

/// Streaming web server
pub struct WebServer {
    config: ServerConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(config: ServerConfig, capture: CaptureCommand) -> Self {
        Self {
            config,
            state: AppState::new(Arc::new(StreamState::new()), capture),
        }
    }

    /// Bind and serve until the process exits
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.config.addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Streaming server listening on http://{}", listener.local_addr()?);
        tracing::info!("Capture command: {} {}", self.state.capture.program, self.state.capture.args.join(" "));

        axum::serve(listener, router(self.state)).await
    }
}
