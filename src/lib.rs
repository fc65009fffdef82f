//! # soundsync
//!
//! Low-latency live audio streaming over HTTP.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                                  SERVER                                      │
//! │                                                                              │
//! │   GET /stream (one per listener)                                             │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐                     │
//! │  │   parec #1   │   │   parec #2   │   │   parec #N   │  capture sessions   │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘                     │
//! │         │ stdout           │ stdout           │ stdout                       │
//! │         ▼                  ▼                  ▼                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐                     │
//! │  │ Stream Relay │   │ Stream Relay │   │ Stream Relay │  8 KiB reads         │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘                     │
//! │         │                  │                  │                              │
//! │         │      ┌───────────┴──────────────────┴───────┐                      │
//! │         │      │ StreamState (listeners, total bytes) │◄── GET /stats        │
//! │         │      └──────────────────────────────────────┘                      │
//! └─────────┼────────────────────────────────────────────────────────────────────┘
//!           │ chunked HTTP body, raw s16le / 48 kHz / stereo
//!           ▼
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                                  PLAYER                                      │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐               │
//! │  │ FrameAssembler │──►│ PlaybackQueue  │──►│   Scheduler    │ next-play-time │
//! │  │  4096-byte     │   │ trim 30 → 20   │   │  (per tick)    │               │
//! │  └────────────────┘   └────────────────┘   └───────┬────────┘               │
//! │                                                    ▼                         │
//! │        ┌───────────┐   ┌──────┐   ┌──────────┐   ┌────────┐                 │
//! │        │ low shelf │──►│ gain │──►│ analyzer │──►│ device │                 │
//! │        └───────────┘   └──────┘   └────┬─────┘   └────────┘                 │
//! │                                         ▼                                    │
//! │                                    Visualizer                                │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod network;
pub mod playback;
pub mod telemetry;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Sample rate of the relayed PCM stream
    pub const SAMPLE_RATE: u32 = 48000;

    /// Channel count (stereo)
    pub const CHANNELS: u16 = 2;

    /// Bytes per interleaved stereo sample pair (2 channels x 16 bit)
    pub const BYTES_PER_SAMPLE_PAIR: usize = 4;

    /// Target latency requested from the capture utility
    pub const CAPTURE_LATENCY_MS: u32 = 50;

    /// Size of each read from the capture subprocess
    pub const RELAY_CHUNK_SIZE: usize = 8192;

    /// Size of one playback frame (1024 stereo sample pairs)
    pub const FRAME_SIZE: usize = 4096;

    /// Queue length above which the playback queue is trimmed
    pub const QUEUE_HIGH_WATER: usize = 30;

    /// Queue length kept after a trim
    pub const QUEUE_TRIM_TO: usize = 20;

    /// Lead applied when the schedule cursor has fallen behind the clock (seconds)
    pub const RESYNC_LEAD_SECS: f64 = 0.05;

    /// How far ahead of the clock frames may be scheduled (seconds)
    pub const SCHEDULE_AHEAD_SECS: f64 = 0.2;

    /// Analyzer transform size
    pub const FFT_SIZE: usize = 256;

    /// Number of low bins averaged into the bass indicator
    pub const BASS_BINS: usize = 10;

    /// Corner frequency of the bass shelf filter
    pub const BASS_SHELF_HZ: f32 = 200.0;

    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;
}
