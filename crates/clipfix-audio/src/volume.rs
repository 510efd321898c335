//! Volume normalization to a target peak or RMS level.

use crate::analysis::{peak, rms};
use crate::stage::AudioStage;
use crate::voice::CLIP_CEILING;
use clipfix_core::{AudioChunk, Enhancement, NormalizationMethod, Result};

/// Inputs below this level are treated as silence and left alone.
pub const SILENCE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeNormalization {
    /// 0-100, mapped to 0-1 linear.
    pub target_level: f32,
    pub method: NormalizationMethod,
    pub prevent_clipping: bool,
}

impl VolumeNormalization {
    pub fn new(target_level: f32, method: NormalizationMethod, prevent_clipping: bool) -> Self {
        Self {
            target_level: target_level.clamp(0.0, 100.0),
            method,
            prevent_clipping,
        }
    }

    pub fn measure(&self, chunk: &AudioChunk) -> f32 {
        match self.method {
            NormalizationMethod::Peak => peak(chunk),
            NormalizationMethod::Rms => rms(chunk),
        }
    }

    /// Linear gain this stage would apply, or `None` for silent input.
    pub fn gain_for(&self, chunk: &AudioChunk) -> Option<f32> {
        let level = self.measure(chunk);
        if level < SILENCE_EPSILON {
            return None;
        }
        let mut gain = self.target_level / 100.0 / level;
        if self.prevent_clipping {
            let peak = peak(chunk);
            if peak * gain > CLIP_CEILING {
                gain = CLIP_CEILING / peak;
            }
        }
        Some(gain)
    }
}

impl AudioStage for VolumeNormalization {
    fn enhancement(&self) -> Enhancement {
        Enhancement::VolumeNormalization
    }

    fn process(&self, chunk: &AudioChunk) -> Result<AudioChunk> {
        match self.gain_for(chunk) {
            Some(gain) => Ok(chunk.map_channels(|c| c.iter().map(|x| x * gain).collect())),
            None => Ok(chunk.clone()),
        }
    }
}
