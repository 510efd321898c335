//! Second-order IIR sections (RBJ cookbook coefficients).

use std::f32::consts::PI;

pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

const MIN_CORNER_HZ: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Biquad {
    /// Pass-through section.
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn highpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let mut f = Self::new();
        f.update_hpf(freq, q, sample_rate);
        f
    }

    pub fn lowpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let mut f = Self::new();
        f.update_lpf(freq, q, sample_rate);
        f
    }

    pub fn peaking(freq: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let mut f = Self::new();
        f.update_peaking(freq, q, gain_db, sample_rate);
        f
    }

    pub fn update_hpf(&mut self, freq: f32, q: f32, sample_rate: f32) {
        let (cos_w0, alpha) = omega(freq, q, sample_rate);
        let a0 = 1.0 + alpha;
        self.set(
            (1.0 + cos_w0) / 2.0 / a0,
            -(1.0 + cos_w0) / a0,
            (1.0 + cos_w0) / 2.0 / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha) / a0,
        );
    }

    pub fn update_lpf(&mut self, freq: f32, q: f32, sample_rate: f32) {
        let (cos_w0, alpha) = omega(freq, q, sample_rate);
        let a0 = 1.0 + alpha;
        self.set(
            (1.0 - cos_w0) / 2.0 / a0,
            (1.0 - cos_w0) / a0,
            (1.0 - cos_w0) / 2.0 / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha) / a0,
        );
    }

    pub fn update_peaking(&mut self, freq: f32, q: f32, gain_db: f32, sample_rate: f32) {
        let (cos_w0, alpha) = omega(freq, q, sample_rate);
        let a = 10f32.powf(gain_db / 40.0);
        let a0 = 1.0 + alpha / a;
        self.set(
            (1.0 + alpha * a) / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha * a) / a0,
            -2.0 * cos_w0 / a0,
            (1.0 - alpha / a) / a0,
        );
    }

    fn set(&mut self, b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) {
        self.b0 = b0;
        self.b1 = b1;
        self.b2 = b2;
        self.a1 = a1;
        self.a2 = a2;
    }

    /// Transposed direct form II.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn process_buffer(&mut self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| self.process(x)).collect()
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

fn omega(freq: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    let freq = clamp_to_nyquist(freq, sample_rate);
    let w0 = 2.0 * PI * freq / sample_rate;
    (w0.cos(), w0.sin() / (2.0 * q.max(1e-3)))
}

/// Keep a corner frequency strictly inside (0, nyquist). Never panics, even
/// for rates too low to fit the usual 10 Hz floor.
pub fn clamp_to_nyquist(freq: f32, sample_rate: f32) -> f32 {
    let ceiling = sample_rate * 0.45;
    let floor = MIN_CORNER_HZ.min(ceiling * 0.5);
    freq.min(ceiling).max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sr).sin())
            .collect()
    }

    fn tail_rms(x: &[f32]) -> f32 {
        let tail = &x[x.len() / 2..];
        (tail.iter().map(|v| v * v).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn highpass_blocks_dc_passes_treble() {
        let mut hp = Biquad::highpass(80.0, BUTTERWORTH_Q, 48_000.0);
        let out = hp.process_buffer(&vec![0.5; 48_000]);
        assert!(out.last().copied().unwrap_or(1.0).abs() < 1e-3);

        hp.reset();
        let tone = sine(2_000.0, 48_000.0, 4_800);
        let ratio = tail_rms(&hp.process_buffer(&tone)) / tail_rms(&tone);
        assert!(ratio > 0.95);
    }

    #[test]
    fn lowpass_attenuates_above_cutoff() {
        let mut lp = Biquad::lowpass(1_000.0, BUTTERWORTH_Q, 48_000.0);
        let tone = sine(8_000.0, 48_000.0, 4_800);
        assert!(tail_rms(&lp.process_buffer(&tone)) < 0.05);
    }

    #[test]
    fn peaking_boosts_center() {
        let mut eq = Biquad::peaking(3_500.0, 1.0, 6.0, 48_000.0);
        let tone = sine(3_500.0, 48_000.0, 9_600);
        let gain = tail_rms(&eq.process_buffer(&tone)) / tail_rms(&tone);
        assert!((gain - 10f32.powf(6.0 / 20.0)).abs() < 0.05);
    }

    #[test]
    fn clamp_handles_rates_below_the_floor() {
        assert_eq!(clamp_to_nyquist(5.0, 48_000.0), 10.0);
        assert_eq!(clamp_to_nyquist(30_000.0, 48_000.0), 21_600.0);

        let tiny = clamp_to_nyquist(80.0, 20.0);
        assert!(tiny > 0.0 && tiny <= 9.0);
        let mut hp = Biquad::highpass(80.0, BUTTERWORTH_Q, 20.0);
        assert!(hp.process(0.5).is_finite());
    }
}
