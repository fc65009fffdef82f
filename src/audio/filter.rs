//! Output filter graph stages: bass shelf and gain

use std::f32::consts::PI;

/// Biquad IIR filter (direct form I), one instance per channel
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadFilter {
    /// Low shelf with shelf slope 1 (Audio EQ Cookbook)
    pub fn low_shelf(sample_rate: u32, freq: f32, gain_db: f32) -> Self {
        let mut filter = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.set_low_shelf(sample_rate, freq, gain_db);
        filter
    }

    /// Recompute coefficients without clearing the delay line
    pub fn set_low_shelf(&mut self, sample_rate: u32, freq: f32, gain_db: f32) {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq / sample_rate as f32;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        // S = 1
        let alpha = sin_w0 / 2.0 * 2.0_f32.sqrt();
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha);
        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = flush_denormal(output);

        output
    }

}

#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 {
        0.0
    } else {
        x
    }
}

/// Linear gain
#[derive(Debug, Clone, Copy)]
pub struct GainStage {
    pub gain: f32,
}

impl GainStage {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    #[inline]
    pub fn process(&self, input: f32) -> f32 {
        input * self.gain
    }
}

/// Stereo bass shelf followed by gain
#[derive(Debug, Clone)]
pub struct FilterChain {
    shelf: [BiquadFilter; 2],
    gain: GainStage,
}

impl FilterChain {
    pub fn new(sample_rate: u32, shelf_hz: f32, bass_db: f32, volume: f32) -> Self {
        let shelf = BiquadFilter::low_shelf(sample_rate, shelf_hz, bass_db);
        Self {
            shelf: [shelf.clone(), shelf],
            gain: GainStage::new(volume),
        }
    }

    /// Process one stereo sample pair in place
    #[inline]
    pub fn process(&mut self, left: &mut f32, right: &mut f32) {
        *left = self.gain.process(self.shelf[0].process(*left));
        *right = self.gain.process(self.shelf[1].process(*right));
    }
}
