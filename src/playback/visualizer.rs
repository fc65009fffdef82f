//! Spectrum and bass bars
//!
//! Purely observational. If the analyzer is busy or missing the previous
//! reading is reused; nothing here can stop playback.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio::analyzer::FrequencyAnalyzer;
use crate::constants::{BASS_BINS, FFT_SIZE};

/// One rendered visualizer frame
#[derive(Debug, Clone, PartialEq)]
pub struct VisualFrame {
    /// One character column per group of bins
    pub spectrum: String,
    /// Horizontal bass meter
    pub bass: String,
    /// Average of the lowest bins, 0.0 - 1.0
    pub bass_level: f32,
    /// Frames waiting in the playback queue
    pub queued: usize,
}

pub struct Visualizer {
    analyzer: Option<Arc<Mutex<FrequencyAnalyzer>>>,
    bins: Vec<u8>,
    width: usize,
}

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

impl Visualizer {
    pub fn new(analyzer: Option<Arc<Mutex<FrequencyAnalyzer>>>, width: usize) -> Self {
        Self {
            analyzer,
            bins: vec![0; FFT_SIZE / 2],
            width: width.max(1),
        }
    }

    /// Refresh the bins from the analyzer and render both bars
    pub fn render(&mut self, queued: usize) -> VisualFrame {
        if let Some(analyzer) = &self.analyzer {
            if let Some(mut analyzer) = analyzer.try_lock() {
                analyzer.byte_frequency_data(&mut self.bins);
            }
        }

        let bass_level = bass_average(&self.bins) / 255.0;
        VisualFrame {
            spectrum: spectrum_bar(&self.bins, self.width),
            bass: meter(bass_level, self.width),
            bass_level,
            queued,
        }
    }
}

/// Mean of the lowest bins (the bass indicator)
pub fn bass_average(bins: &[u8]) -> f32 {
    let low = &bins[..bins.len().min(BASS_BINS)];
    if low.is_empty() {
        return 0.0;
    }
    low.iter().map(|&b| b as f32).sum::<f32>() / low.len() as f32
}

fn spectrum_bar(bins: &[u8], width: usize) -> String {
    if bins.is_empty() {
        return " ".repeat(width);
    }
    let group = bins.len().div_ceil(width).max(1);
    bins.chunks(group)
        .map(|chunk| {
            let peak = chunk.iter().copied().max().unwrap_or(0) as usize;
            LEVELS[peak * (LEVELS.len() - 1) / 255]
        })
        .collect()
}

fn meter(level: f32, width: usize) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), " ".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bass_average_uses_lowest_ten_bins() {
        let mut bins = vec![0u8; 128];
        bins[..10].copy_from_slice(&[10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        bins[10] = 255;
        assert_eq!(bass_average(&bins), 55.0);
        assert_eq!(bass_average(&[]), 0.0);
    }

    #[test]
    fn test_without_analyzer_renders_silence() {
        let mut viz = Visualizer::new(None, 16);
        let frame = viz.render(3);
        assert_eq!(frame.bass_level, 0.0);
        assert_eq!(frame.bass, " ".repeat(16));
        assert_eq!(frame.spectrum.chars().count(), 16);
        assert_eq!(frame.queued, 3);
    }

    #[test]
    fn test_meter_width() {
        assert_eq!(meter(1.0, 4), "████");
        assert_eq!(meter(0.5, 4), "██  ");
        assert_eq!(meter(2.0, 4).chars().count(), 4);
    }

    #[test]
    fn test_busy_analyzer_keeps_previous_reading() {
        let analyzer = Arc::new(Mutex::new(FrequencyAnalyzer::new(256, 0.0)));
        let mut viz = Visualizer::new(Some(analyzer.clone()), 8);
        viz.bins[0] = 200;

        let _guard = analyzer.lock();
        let frame = viz.render(0);
        assert_eq!(viz.bins[0], 200);
        assert!(frame.bass_level > 0.0);
    }
}
