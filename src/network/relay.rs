//! Capture-to-HTTP relay
//!
//! The relay stream owns both the capture process and the listener guard.
//! When the response body is dropped, on client disconnect or capture end,
//! both are dropped with it: the process is killed and the listener count
//! goes back down.

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use std::sync::Arc;

use crate::audio::capture::CaptureSession;
use crate::constants::RELAY_CHUNK_SIZE;
use crate::telemetry::registry::{ListenerGuard, StreamState};

struct RelayState {
    session: CaptureSession,
    _guard: ListenerGuard,
    stream_state: Arc<StreamState>,
    buf: Vec<u8>,
    relayed: u64,
}

impl Drop for RelayState {
    fn drop(&mut self) {
        tracing::info!(
            "Relay for capture session {} ended after {} bytes",
            self.session.id(),
            self.relayed
        );
    }
}

/// Forward capture output as a byte stream, chunk by chunk and unmodified.
///
/// Bytes are counted as soon as they are read, before the write to the
/// client is attempted. The stream ends on capture EOF or read error.
pub fn relay_stream(
    session: CaptureSession,
    guard: ListenerGuard,
    stream_state: Arc<StreamState>,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let state = RelayState {
        session,
        _guard: guard,
        stream_state,
        buf: vec![0u8; RELAY_CHUNK_SIZE],
        relayed: 0,
    };

    stream::unfold(state, |mut state| async move {
        match state.session.read_chunk(&mut state.buf).await {
            Ok(0) => {
                tracing::debug!("Capture session {} reached end of output", state.session.id());
                None
            }
            Ok(n) => {
                state.stream_state.record_bytes(n);
                state.relayed += n as u64;
                let chunk = Bytes::copy_from_slice(&state.buf[..n]);
                Some((Ok(chunk), state))
            }
            Err(e) => {
                tracing::debug!("Capture session {} read failed: {}", state.session.id(), e);
                None
            }
        }
    })
}
