//! HTTP client for the streaming server
//!
//! Used by the native player for the audio stream and for the monitoring
//! side channel (`/stats` and `/ping`).

use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use std::time::{Duration, Instant};

use crate::error::PlaybackError;
use crate::telemetry::system::Stats;

const MONITOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Live PCM byte stream
pub type AudioByteStream = BoxStream<'static, Result<Bytes, PlaybackError>>;

#[derive(Debug, Clone)]
pub struct StreamClient {
    base_url: String,
    http: reqwest::Client,
}

impl StreamClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Open `/stream`. Chunks are yielded as they arrive, with no framing.
    pub async fn open_stream(&self) -> Result<AudioByteStream, PlaybackError> {
        let url = self.url("/stream");
        tracing::info!("Connecting to {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlaybackError::Status(status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(PlaybackError::from))
            .boxed())
    }

    /// Fetch the server telemetry snapshot
    pub async fn fetch_stats(&self) -> Result<Stats, PlaybackError> {
        let response = self
            .http
            .get(self.url("/stats"))
            .timeout(MONITOR_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlaybackError::Status(status.as_u16()));
        }
        Ok(response.json::<Stats>().await?)
    }

    /// Round-trip time of a `/ping` request
    pub async fn measure_ping(&self) -> Result<Duration, PlaybackError> {
        let started = Instant::now();
        let response = self
            .http
            .get(self.url("/ping"))
            .timeout(MONITOR_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlaybackError::Status(status.as_u16()));
        }
        response.bytes().await?;
        Ok(started.elapsed())
    }
}
