//! Player state machine
//!
//! ```text
//! Idle ──start──► Initializing ──first bytes──► Playing ──► Stopped | Error ──► Idle
//! ```
//!
//! `Stopped` and `Error` are published once teardown is done, immediately
//! followed by `Idle`. The failure text stays available from
//! [`Player::last_error`].
//!
//! A single task interleaves the network reads and the scheduling ticks, so
//! the playback queue is only ever touched from one place and stays FIFO.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::PlaybackError;
use crate::playback::scheduler::{AudioEngine, PlaybackScheduler, SchedulerStats};
use crate::playback::visualizer::{VisualFrame, Visualizer};

/// One display refresh
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

const VISUALIZER_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerState {
    Idle,
    Initializing,
    Playing,
    Stopped,
    Error(String),
}

impl PlayerState {
    /// Whether a new session may be started from this state
    pub fn is_at_rest(&self) -> bool {
        matches!(self, PlayerState::Idle | PlayerState::Stopped | PlayerState::Error(_))
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Initializing => write!(f, "initializing"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Stopped => write!(f, "stopped"),
            PlayerState::Error(e) => write!(f, "error: {}", e),
        }
    }
}

pub struct Player {
    scheduler: PlaybackScheduler,
    state_tx: watch::Sender<PlayerState>,
    tick_interval: Duration,
    last_error: Option<String>,
}

impl Player {
    pub fn new(tick_interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(PlayerState::Idle);
        Self {
            scheduler: PlaybackScheduler::new(),
            state_tx,
            tick_interval,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state_tx.borrow().clone()
    }

    /// Why the most recent session failed, if it did
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: PlayerState) {
        tracing::info!("Player {}", state);
        self.state_tx.send_replace(state);
    }

    /// Run one playback session until the stream ends, fails, or `stop`
    /// becomes true.
    ///
    /// `open_engine` builds the output graph, `connect` issues the streaming
    /// request. The engine is dropped (closing the device) and the queue is
    /// cleared on every exit path. No retry is attempted.
    pub async fn run<E, F, S>(
        &mut self,
        open_engine: impl FnOnce() -> Result<E, PlaybackError>,
        connect: F,
        mut stop: watch::Receiver<bool>,
        mut on_frame: impl FnMut(&VisualFrame),
    ) -> Result<SchedulerStats, PlaybackError>
    where
        E: AudioEngine,
        F: Future<Output = Result<S, PlaybackError>>,
        S: Stream<Item = Result<Bytes, PlaybackError>> + Unpin,
    {
        if !self.state().is_at_rest() {
            return Err(PlaybackError::Output("player already running".to_string()));
        }

        // Counters are per session
        self.scheduler = PlaybackScheduler::new();
        self.last_error = None;
        self.set_state(PlayerState::Initializing);

        let result = self
            .session(open_engine, connect, &mut stop, &mut on_frame)
            .await;

        let stats = self.scheduler.stats();
        self.scheduler.reset();

        let outcome = match result {
            Ok(()) => {
                self.set_state(PlayerState::Stopped);
                Ok(stats)
            }
            Err(e) => {
                tracing::error!("Playback failed: {}", e);
                self.last_error = Some(e.to_string());
                self.set_state(PlayerState::Error(e.to_string()));
                Err(e)
            }
        };
        self.set_state(PlayerState::Idle);
        outcome
    }

    async fn session<E, F, S>(
        &mut self,
        open_engine: impl FnOnce() -> Result<E, PlaybackError>,
        connect: F,
        stop: &mut watch::Receiver<bool>,
        on_frame: &mut impl FnMut(&VisualFrame),
    ) -> Result<(), PlaybackError>
    where
        E: AudioEngine,
        F: Future<Output = Result<S, PlaybackError>>,
        S: Stream<Item = Result<Bytes, PlaybackError>> + Unpin,
    {
        let mut engine = open_engine()?;

        let mut stream = tokio::select! {
            biased;
            _ = stop_requested(stop) => return Ok(()),
            stream = connect => stream?,
        };

        let mut visualizer = Visualizer::new(engine.analyzer(), VISUALIZER_WIDTH);
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(stop) => {
                    tracing::debug!("Stop requested");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.scheduler.tick(&mut engine);
                    if let Some(e) = engine.take_error() {
                        return Err(e);
                    }
                    if self.state() == PlayerState::Playing {
                        on_frame(&visualizer.render(self.scheduler.queued()));
                    }
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        if !bytes.is_empty() && self.state() == PlayerState::Initializing {
                            self.set_state(PlayerState::Playing);
                        }
                        self.scheduler.push_bytes(&bytes);
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        tracing::info!("Stream ended");
                        return Ok(());
                    }
                },
            }
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

/// Resolves once `stop` holds `true` or its sender is gone
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::DecodedBuffer;
    use crate::constants::FRAME_SIZE;
    use futures_util::stream;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Engine that logs (start time, samples) into shared storage
    #[derive(Clone, Default)]
    struct RecordingEngine {
        log: Arc<Mutex<Vec<(f64, usize)>>>,
    }

    impl AudioEngine for RecordingEngine {
        fn current_time(&self) -> f64 {
            0.0
        }

        fn schedule(&mut self, buffer: DecodedBuffer, start_at: f64) {
            self.log.lock().push((start_at, buffer.len()));
        }
    }

    type ByteStream = futures_util::stream::BoxStream<'static, Result<Bytes, PlaybackError>>;

    fn chunks_then_hang(chunks: Vec<Bytes>) -> ByteStream {
        stream::iter(chunks.into_iter().map(Ok))
            .chain(stream::pending())
            .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_until_stopped() {
        let engine = RecordingEngine::default();
        let log = engine.log.clone();
        let mut player = Player::default();
        let states = player.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = stop_tx.send(true);
        });

        let data = Bytes::from(vec![0u8; FRAME_SIZE * 3 + 100]);
        let mut frames_seen = 0;
        let stats = player
            .run(
                move || Ok(engine),
                async move { Ok(chunks_then_hang(vec![data])) },
                stop_rx,
                |_| frames_seen += 1,
            )
            .await
            .unwrap();

        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.frames_scheduled, 3);
        assert_eq!(stats.pending_bytes, 100);
        assert!(frames_seen > 0);
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(player.last_error().is_none());
        assert!(states.has_changed().unwrap());

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert!((log[0].0 - 0.05).abs() < 1e-9);
        assert!(log.iter().all(|&(_, n)| n == 1024));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_initializing_until_bytes_arrive() {
        let mut player = Player::default();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut states = player.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                seen.push(state.clone());
                if state == PlayerState::Initializing {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let _ = stop_tx.send(true);
                }
                if state == PlayerState::Idle {
                    break;
                }
            }
            seen
        });

        player
            .run(
                || Ok(RecordingEngine::default()),
                async { Ok(chunks_then_hang(vec![])) },
                stop_rx,
                |_| {},
            )
            .await
            .unwrap();

        let seen = watcher.await.unwrap();
        assert!(!seen.contains(&PlayerState::Playing));
        assert_eq!(seen.first(), Some(&PlayerState::Initializing));
        assert_eq!(seen.last(), Some(&PlayerState::Idle));
    }

    #[tokio::test]
    async fn test_fetch_failure_enters_error() {
        let mut player = Player::default();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let result = player
            .run(
                || Ok(RecordingEngine::default()),
                async { Err::<ByteStream, _>(PlaybackError::Status(500)) },
                stop_rx,
                |_| {},
            )
            .await;

        assert!(matches!(result, Err(PlaybackError::Status(500))));
        assert_eq!(player.state(), PlayerState::Idle);
        assert!(player.last_error().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_engine_failure_enters_error() {
        let mut player = Player::default();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let result = player
            .run(
                || Err::<RecordingEngine, _>(PlaybackError::DeviceNotFound("none".into())),
                async { Ok(chunks_then_hang(vec![])) },
                stop_rx,
                |_| {},
            )
            .await;

        assert!(matches!(result, Err(PlaybackError::DeviceNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_error_discards_queue() {
        let engine = RecordingEngine::default();
        let log = engine.log.clone();
        let mut player = Player::default();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let items: Vec<Result<Bytes, PlaybackError>> = vec![
            Ok(Bytes::from(vec![0u8; FRAME_SIZE * 2])),
            Err(PlaybackError::Fetch("connection reset".into())),
        ];

        let result = player
            .run(
                move || Ok(engine),
                async move { Ok(stream::iter(items)) },
                stop_rx,
                |_| {},
            )
            .await;

        assert!(matches!(result, Err(PlaybackError::Fetch(_))));
        // The error arrived before any tick could schedule the frames
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_stream_stops() {
        let mut player = Player::default();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let stats = player
            .run(
                || Ok(RecordingEngine::default()),
                async { Ok(stream::iter(vec![Ok(Bytes::from_static(&[1, 2, 3]))])) },
                stop_rx,
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(stats.pending_bytes, 3);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[tokio::test]
    async fn test_player_can_restart_after_failure() {
        let mut player = Player::default();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let first = player
            .run(
                || Ok(RecordingEngine::default()),
                async { Err::<ByteStream, _>(PlaybackError::Fetch("refused".into())) },
                stop_rx.clone(),
                |_| {},
            )
            .await;
        assert!(first.is_err());
        assert!(player.last_error().is_some());

        let second = player
            .run(
                || Ok(RecordingEngine::default()),
                async { Ok(stream::iter(vec![Ok(Bytes::from_static(&[0; 8]))])) },
                stop_rx,
                |_| {},
            )
            .await;
        assert!(second.is_ok());
        assert!(player.last_error().is_none());
        assert_eq!(player.state(), PlayerState::Idle);
    }
}
