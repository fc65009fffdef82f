//! Timed audio output
//!
//! [`AudioOutput`] owns a cpal output stream running on its own thread. The
//! audio clock is the number of frames the stream has rendered. Buffers are
//! scheduled against that clock and mixed into the output when their start
//! time comes up, then passed through the bass shelf, the gain stage and the
//! analyzer tap on the way to the device.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::analyzer::FrequencyAnalyzer;
use crate::audio::device::{check_output_format, get_output_device};
use crate::audio::filter::FilterChain;
use crate::audio::frame::DecodedBuffer;
use crate::config::PlayerConfig;
use crate::constants::{BASS_SHELF_HZ, CHANNELS, FFT_SIZE, SAMPLE_RATE};
use crate::error::PlaybackError;
use crate::playback::scheduler::AudioEngine;

const ANALYZER_SMOOTHING: f32 = 0.85;

/// A decoded buffer pinned to a frame position on the output clock
#[derive(Debug, Clone)]
pub struct ScheduledBuffer {
    pub start_frame: u64,
    pub buffer: DecodedBuffer,
}

impl ScheduledBuffer {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.buffer.len() as u64
    }
}

/// Mixes scheduled buffers onto the output timeline. Runs inside the
/// audio callback.
pub struct TimelineRenderer {
    incoming: Receiver<ScheduledBuffer>,
    active: Vec<ScheduledBuffer>,
    position: u64,
    clock: Arc<AtomicU64>,
    chain: FilterChain,
    analyzer: Arc<Mutex<FrequencyAnalyzer>>,
    tap: Vec<(f32, f32)>,
}

impl TimelineRenderer {
    pub fn new(
        incoming: Receiver<ScheduledBuffer>,
        clock: Arc<AtomicU64>,
        chain: FilterChain,
        analyzer: Arc<Mutex<FrequencyAnalyzer>>,
    ) -> Self {
        Self {
            incoming,
            active: Vec::new(),
            position: 0,
            clock,
            chain,
            analyzer,
            tap: Vec::with_capacity(4096),
        }
    }

    /// Fill an interleaved stereo output buffer
    pub fn render(&mut self, out: &mut [f32]) {
        while let Ok(scheduled) = self.incoming.try_recv() {
            self.active.push(scheduled);
        }
        // Anything that ended before now can never play
        let position = self.position;
        self.active.retain(|s| s.end_frame() > position);

        self.tap.clear();
        let channels = CHANNELS as usize;
        for (i, slot) in out.chunks_mut(channels).enumerate() {
            let t = self.position + i as u64;
            let (mut left, mut right) = (0.0f32, 0.0f32);
            for scheduled in &self.active {
                if t >= scheduled.start_frame && t < scheduled.end_frame() {
                    let idx = (t - scheduled.start_frame) as usize;
                    left += scheduled.buffer.left[idx];
                    right += scheduled.buffer.right[idx];
                }
            }

            self.chain.process(&mut left, &mut right);
            self.tap.push((left, right));

            slot[0] = left;
            if slot.len() > 1 {
                slot[1] = right;
            }
        }

        // Never block the audio thread on the visualizer
        if let Some(mut analyzer) = self.analyzer.try_lock() {
            for &(l, r) in &self.tap {
                analyzer.push(l, r);
            }
        }

        self.position += (out.len() / channels) as u64;
        self.clock.store(self.position, Ordering::Release);
    }
}

/// cpal-backed [`AudioEngine`]
pub struct AudioOutput {
    sample_rate: u32,
    clock: Arc<AtomicU64>,
    schedule_tx: Sender<ScheduledBuffer>,
    analyzer: Arc<Mutex<FrequencyAnalyzer>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Receiver<PlaybackError>,
}

impl AudioOutput {
    /// Open the configured output device and start rendering silence
    pub fn start(config: &PlayerConfig) -> Result<Self, PlaybackError> {
        let device_name = config.device.clone();
        let sample_rate = SAMPLE_RATE;
        let clock = Arc::new(AtomicU64::new(0));
        let analyzer = Arc::new(Mutex::new(FrequencyAnalyzer::new(FFT_SIZE, ANALYZER_SMOOTHING)));
        let running = Arc::new(AtomicBool::new(true));
        let (schedule_tx, schedule_rx) = unbounded::<ScheduledBuffer>();
        let (error_tx, error_rx) = bounded::<PlaybackError>(16);
        let (ready_tx, ready_rx) = bounded::<Result<(), PlaybackError>>(1);

        let renderer = TimelineRenderer::new(
            schedule_rx,
            clock.clone(),
            FilterChain::new(sample_rate, BASS_SHELF_HZ, config.bass_db, config.volume),
            analyzer.clone(),
        );
        let running_for_loop = running.clone();

        let handle = thread::Builder::new()
            .name("playback-output".to_string())
            .spawn(move || {
                let stream = match build_stream(&device_name, sample_rate, renderer, error_tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(PlaybackError::Output(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep thread alive while running
                while running_for_loop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }
                // Stream is dropped here, closing the device
            })
            .map_err(|e| PlaybackError::Output(e.to_string()))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(PlaybackError::Output("output thread exited".to_string())));

        let mut output = Self {
            sample_rate,
            clock,
            schedule_tx,
            analyzer,
            running,
            thread_handle: Some(handle),
            error_rx,
        };

        match ready {
            Ok(()) => {
                tracing::info!("Audio output started at {} Hz", sample_rate);
                Ok(output)
            }
            Err(e) => {
                output.stop();
                Err(e)
            }
        }
    }

    /// Close the device and join the output thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioEngine for AudioOutput {
    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn schedule(&mut self, buffer: DecodedBuffer, start_at: f64) {
        let start_frame = (start_at * self.sample_rate as f64).round().max(0.0) as u64;
        let _ = self.schedule_tx.send(ScheduledBuffer {
            start_frame,
            buffer,
        });
    }

    fn analyzer(&self) -> Option<Arc<Mutex<FrequencyAnalyzer>>> {
        Some(self.analyzer.clone())
    }

    fn take_error(&mut self) -> Option<PlaybackError> {
        self.error_rx.try_recv().ok()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_stream(
    device_name: &str,
    sample_rate: u32,
    mut renderer: TimelineRenderer,
    error_tx: Sender<PlaybackError>,
) -> Result<cpal::Stream, PlaybackError> {
    let device = get_output_device(device_name)?;
    check_output_format(&device, CHANNELS, sample_rate)?;
    let config = StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.render(data),
            move |err| {
                let _ = error_tx.try_send(PlaybackError::Output(err.to_string()));
            },
            None,
        )
        .map_err(|e| PlaybackError::Output(e.to_string()))
}
