//! HTTP API handlers

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::audio::capture::CaptureSession;
use crate::network::relay::relay_stream;
use crate::telemetry::system::Stats;
use crate::ui::server::AppState;

const ALLOW_ANY_ORIGIN: (header::HeaderName, &str) = (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");

/// Start a capture for this listener and relay it as the response body.
///
/// The listener is only counted once the capture is running, so a failed
/// start leaves the registry untouched.
pub async fn stream_audio(State(state): State<AppState>) -> Response {
    let session = match CaptureSession::spawn(&state.capture) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to start audio capture: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to start audio").into_response();
        }
    };

    let guard = state.stream_state.register();
    tracing::info!(
        "Listener connected, capture session {} ({} active)",
        session.id(),
        state.stream_state.listeners()
    );

    let body = Body::from_stream(relay_stream(session, guard, state.stream_state.clone()));
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            ALLOW_ANY_ORIGIN,
        ],
        body,
    )
        .into_response()
}

/// Telemetry snapshot
pub async fn get_stats(State(state): State<AppState>) -> Response {
    let stats = Stats::collect(&state.stream_state);
    ([ALLOW_ANY_ORIGIN], Json(stats)).into_response()
}

pub async fn ping() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain"), ALLOW_ANY_ORIGIN],
        "pong",
    )
        .into_response()
}
