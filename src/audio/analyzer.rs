//! Frequency analyzer tap
//!
//! Mirrors the browser `AnalyserNode`: a Blackman-windowed FFT over the most
//! recent `fft_size` samples, smoothed over time and reported as bytes where
//! 0 maps to -100 dB and 255 to -30 dB.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

pub struct FrequencyAnalyzer {
    fft_size: usize,
    smoothing: f32,
    window: Vec<f32>,
    /// Ring of the latest mono samples
    history: Vec<f32>,
    write_index: usize,
    smoothed: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FrequencyAnalyzer {
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        assert!(fft_size.is_power_of_two(), "FFT size must be power of 2");

        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / fft_size as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            window,
            history: vec![0.0; fft_size],
            write_index: 0,
            smoothed: vec![0.0; fft_size / 2],
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Number of magnitude bins (half the transform size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed one stereo sample pair; analysis runs on the channel average
    #[inline]
    pub fn push(&mut self, left: f32, right: f32) {
        self.history[self.write_index] = (left + right) * 0.5;
        self.write_index = (self.write_index + 1) % self.fft_size;
    }

    /// Run the transform and fill `out` with byte magnitudes
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        for i in 0..self.fft_size {
            let sample = self.history[(self.write_index + i) % self.fft_size];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        for (i, value) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[i].norm() * scale;
            *value = self.smoothing * *value + (1.0 - self.smoothing) * magnitude;
        }

        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = magnitude_to_byte(magnitude);
        }
    }
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}

impl std::fmt::Debug for FrequencyAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyAnalyzer")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zero() {
        let mut analyzer = FrequencyAnalyzer::new(256, 0.0);
        let mut out = vec![0xffu8; analyzer.bin_count()];
        analyzer.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_low_tone_lands_in_low_bins() {
        let mut analyzer = FrequencyAnalyzer::new(256, 0.0);
        // 375 Hz is exactly bin 2 at 48 kHz / 256
        for i in 0..256 {
            let x = (2.0 * PI * 375.0 * i as f32 / 48000.0).sin() * 0.8;
            analyzer.push(x, x);
        }
        let mut out = vec![0u8; 128];
        analyzer.byte_frequency_data(&mut out);

        assert!(out.iter().all(|&b| b <= out[2]));
        assert!(out[2] > 200);
        assert!(out[100] < 128, "leakage at bin 100: {}", out[100]);
    }

    #[test]
    fn test_magnitude_mapping() {
        assert_eq!(magnitude_to_byte(0.0), 0);
        assert_eq!(magnitude_to_byte(1e-6), 0); // -120 dB
        assert_eq!(magnitude_to_byte(1.0), 255); // 0 dB
    }
}
