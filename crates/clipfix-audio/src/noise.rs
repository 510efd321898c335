//! Noise reduction: high-pass, downward gate, then a strength-dependent low-pass.

use crate::analysis::{amplitude_to_db, noise_floor_db};
use crate::biquad::{Biquad, BUTTERWORTH_Q};
use crate::stage::AudioStage;
use clipfix_core::{AudioChunk, Enhancement, Result};

const RUMBLE_CUTOFF_HZ: f32 = 80.0;
const ADAPTIVE_MARGIN_DB: f32 = 6.0;
const MIN_THRESHOLD_DB: f32 = -60.0;
const ATTACK_SECS: f32 = 0.005;
const RELEASE_SECS: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseReduction {
    /// 0-100
    pub strength: f32,
    pub adaptive_threshold: bool,
}

impl NoiseReduction {
    pub fn new(strength: f32, adaptive_threshold: bool) -> Self {
        Self {
            strength: strength.clamp(0.0, 100.0),
            adaptive_threshold,
        }
    }

    /// Gate threshold in dBFS for this input.
    pub fn threshold_db(&self, chunk: &AudioChunk) -> f32 {
        if self.adaptive_threshold {
            (noise_floor_db(chunk) + ADAPTIVE_MARGIN_DB).max(MIN_THRESHOLD_DB)
        } else {
            -50.0 + self.strength / 2.0
        }
    }

    /// Gain applied below the threshold.
    pub fn floor_gain(&self) -> f32 {
        1.0 - 0.9 * self.strength / 100.0
    }

    pub fn lowpass_cutoff(&self) -> f32 {
        8_000.0 - self.strength * 30.0
    }
}

impl AudioStage for NoiseReduction {
    fn enhancement(&self) -> Enhancement {
        Enhancement::NoiseReduction
    }

    fn process(&self, chunk: &AudioChunk) -> Result<AudioChunk> {
        let sr = chunk.sample_rate as f32;
        let threshold_db = self.threshold_db(chunk);
        let floor_gain = self.floor_gain();
        let cutoff = self.lowpass_cutoff();
        let attack = time_coefficient(ATTACK_SECS, sr);
        let release = time_coefficient(RELEASE_SECS, sr);

        Ok(chunk.map_channels(|samples| {
            let mut hp = Biquad::highpass(RUMBLE_CUTOFF_HZ, BUTTERWORTH_Q, sr);
            let mut lp = Biquad::lowpass(cutoff, BUTTERWORTH_Q, sr);
            let mut env = 0.0f32;
            let mut gain = floor_gain;

            samples
                .iter()
                .map(|&x| {
                    let y = hp.process(x);
                    let level = y.abs();
                    let coeff = if level > env { attack } else { release };
                    env = coeff * env + (1.0 - coeff) * level;

                    let target = if amplitude_to_db(env) >= threshold_db {
                        1.0
                    } else {
                        floor_gain
                    };
                    let g_coeff = if target > gain { attack } else { release };
                    gain = g_coeff * gain + (1.0 - g_coeff) * target;

                    lp.process(y * gain)
                })
                .collect()
        }))
    }
}

/// One-pole smoothing coefficient for a time constant.
pub(crate) fn time_coefficient(secs: f32, sample_rate: f32) -> f32 {
    (-1.0 / (secs * sample_rate).max(1.0)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_threshold_tracks_strength() {
        let chunk = AudioChunk::silent(1, 48_000, 480);
        assert_eq!(NoiseReduction::new(0.0, false).threshold_db(&chunk), -50.0);
        assert_eq!(NoiseReduction::new(100.0, false).threshold_db(&chunk), 0.0);
    }

    #[test]
    fn adaptive_threshold_is_clamped() {
        let chunk = AudioChunk::silent(1, 48_000, 4_800);
        assert_eq!(NoiseReduction::new(50.0, true).threshold_db(&chunk), MIN_THRESHOLD_DB);
    }

    #[test]
    fn cutoff_shrinks_with_strength() {
        assert_eq!(NoiseReduction::new(0.0, false).lowpass_cutoff(), 8_000.0);
        assert_eq!(NoiseReduction::new(100.0, false).lowpass_cutoff(), 5_000.0);
    }

    #[test]
    fn shape_is_preserved() {
        let chunk = AudioChunk::new(vec![vec![0.1; 1_000], vec![0.2; 1_000]], 44_100).unwrap();
        let out = NoiseReduction::new(50.0, true).process(&chunk).unwrap();
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.frame_length(), 1_000);
        assert_eq!(out.sample_rate, 44_100);
    }
}
