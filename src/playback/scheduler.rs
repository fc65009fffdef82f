//! Timed playback scheduling
//!
//! The scheduler keeps a cursor (`next_play_time`) on the output's audio
//! clock. Each tick it moves frames from the queue onto the output back to
//! back, so consecutive frames start exactly where the previous one ended.
//! If the cursor falls behind the clock (an underrun) it jumps ahead to
//! `now + 50 ms` and playback resumes from there.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio::analyzer::FrequencyAnalyzer;
use crate::audio::frame::{AudioFrame, DecodedBuffer};
use crate::constants::{RESYNC_LEAD_SECS, SCHEDULE_AHEAD_SECS};
use crate::error::PlaybackError;
use crate::playback::buffer::{FrameAssembler, PlaybackQueue};

/// Output side of the player: a clock and a place to put timed buffers
pub trait AudioEngine {
    /// Current position of the audio clock in seconds
    fn current_time(&self) -> f64;

    /// Play `buffer` starting at `start_at` on the audio clock
    fn schedule(&mut self, buffer: DecodedBuffer, start_at: f64);

    /// Frequency analyzer on the output graph, if the engine has one
    fn analyzer(&self) -> Option<Arc<Mutex<FrequencyAnalyzer>>> {
        None
    }

    /// Asynchronous failure reported by the device, if any
    fn take_error(&mut self) -> Option<PlaybackError> {
        None
    }
}

/// Scheduler counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStats {
    pub frames_received: u64,
    pub frames_scheduled: u64,
    pub frames_dropped: u64,
    pub resyncs: u64,
    pub queued: usize,
    pub pending_bytes: usize,
}

/// Jitter buffer plus schedule cursor
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    assembler: FrameAssembler,
    queue: PlaybackQueue,
    /// `None` until the first frame is scheduled
    next_play_time: Option<f64>,
    frames_received: u64,
    frames_scheduled: u64,
    resyncs: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes from the network
    pub fn push_bytes(&mut self, data: &[u8]) {
        let queue = &mut self.queue;
        let received = &mut self.frames_received;
        self.assembler.push(data, |frame| {
            *received += 1;
            queue.push(frame);
        });
    }

    /// One scheduling pass. Returns the number of frames handed to the engine.
    pub fn tick<E: AudioEngine + ?Sized>(&mut self, engine: &mut E) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let now = engine.current_time();
        let mut cursor = match self.next_play_time {
            Some(t) if t >= now => t,
            Some(_) => {
                self.resyncs += 1;
                tracing::debug!("Playback underrun, resynchronizing at {:.3}s", now);
                now + RESYNC_LEAD_SECS
            }
            None => now + RESYNC_LEAD_SECS,
        };

        let mut scheduled = 0;
        while cursor < now + SCHEDULE_AHEAD_SECS {
            let Some(frame) = self.queue.pop() else {
                break;
            };
            cursor += self.schedule_frame(engine, &frame, cursor);
            scheduled += 1;
        }

        self.next_play_time = Some(cursor);
        self.queue.trim();
        scheduled
    }

    fn schedule_frame<E: AudioEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        frame: &AudioFrame,
        start_at: f64,
    ) -> f64 {
        let buffer = frame.decode();
        let duration = buffer.duration();
        engine.schedule(buffer, start_at);
        self.frames_scheduled += 1;
        duration
    }

    /// Where the next frame will start, if anything has been scheduled
    pub fn next_play_time(&self) -> Option<f64> {
        self.next_play_time
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Drop all buffered audio and forget the schedule cursor
    pub fn reset(&mut self) {
        self.assembler.clear();
        self.queue.clear();
        self.next_play_time = None;
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            frames_received: self.frames_received,
            frames_scheduled: self.frames_scheduled,
            frames_dropped: self.queue.dropped(),
            resyncs: self.resyncs,
            queued: self.queue.len(),
            pending_bytes: self.assembler.pending_len(),
        }
    }
}
