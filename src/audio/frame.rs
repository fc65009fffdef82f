//! PCM frame types
//!
//! The wire format is interleaved stereo, signed 16-bit little-endian.

use bytes::Bytes;

use crate::constants::{BYTES_PER_SAMPLE_PAIR, SAMPLE_RATE};

/// Fixed-size chunk of interleaved s16le stereo PCM
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFrame {
    data: Bytes,
}

impl AudioFrame {
    /// Wrap raw PCM bytes. Returns `None` unless the length is a whole
    /// number of stereo sample pairs.
    pub fn new(data: Bytes) -> Option<Self> {
        if data.len() % BYTES_PER_SAMPLE_PAIR != 0 {
            return None;
        }
        Some(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.data.len() / BYTES_PER_SAMPLE_PAIR
    }

    /// Playback duration in seconds
    pub fn duration(&self, sample_rate: u32) -> f64 {
        self.samples_per_channel() as f64 / sample_rate as f64
    }

    /// Split into normalized left/right channels
    pub fn decode(&self) -> DecodedBuffer {
        let samples = self.samples_per_channel();
        let mut left = Vec::with_capacity(samples);
        let mut right = Vec::with_capacity(samples);

        for pair in self.data.chunks_exact(BYTES_PER_SAMPLE_PAIR) {
            let (l, r) = decode_pair([pair[0], pair[1], pair[2], pair[3]]);
            left.push(l);
            right.push(r);
        }

        DecodedBuffer {
            left,
            right,
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// Convert one signed 16-bit little-endian sample to [-1, 1)
#[inline]
pub fn decode_sample(lo: u8, hi: u8) -> f32 {
    i16::from_le_bytes([lo, hi]) as f32 / 32768.0
}

/// Decode a 4-byte stereo sample pair
#[inline]
pub fn decode_pair(bytes: [u8; 4]) -> (f32, f32) {
    (
        decode_sample(bytes[0], bytes[1]),
        decode_sample(bytes[2], bytes[3]),
    )
}

/// Planar float audio ready to be scheduled on an output
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedBuffer {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Exact duration in seconds: samples / sample rate
    pub fn duration(&self) -> f64 {
        self.left.len() as f64 / self.sample_rate as f64
    }
}
