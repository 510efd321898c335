//! Voice enhancement: band-limit, presence boost, mild three-band compression.

use crate::analysis::amplitude_to_db;
use crate::biquad::{Biquad, BUTTERWORTH_Q};
use crate::noise::time_coefficient;
use crate::stage::AudioStage;
use clipfix_core::{AudioChunk, Enhancement, Result};

const VOICE_LOW_HZ: f32 = 80.0;
const VOICE_HIGH_HZ: f32 = 8_000.0;
const PRESENCE_HZ: f32 = 3_500.0;
const PRESENCE_Q: f32 = 1.0;
const NATURAL_MAX_BOOST_DB: f32 = 6.0;
const FULL_MAX_BOOST_DB: f32 = 10.0;
const LOW_SPLIT_HZ: f32 = 300.0;
const HIGH_SPLIT_HZ: f32 = 3_000.0;
const COMPRESS_THRESHOLD_DB: f32 = -18.0;
const COMPRESS_RATIO: f32 = 2.0;
/// Output ceiling, just under full scale.
pub const CLIP_CEILING: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceEnhancement {
    /// 0-100
    pub clarity: f32,
    pub preserve_naturalness: bool,
}

impl VoiceEnhancement {
    pub fn new(clarity: f32, preserve_naturalness: bool) -> Self {
        Self {
            clarity: clarity.clamp(0.0, 100.0),
            preserve_naturalness,
        }
    }

    pub fn presence_boost_db(&self) -> f32 {
        let max = if self.preserve_naturalness {
            NATURAL_MAX_BOOST_DB
        } else {
            FULL_MAX_BOOST_DB
        };
        max * self.clarity / 100.0
    }

    fn process_channel(&self, samples: &[f32], sr: f32) -> Vec<f32> {
        let mut hp = Biquad::highpass(VOICE_LOW_HZ, BUTTERWORTH_Q, sr);
        let mut lp = Biquad::lowpass(VOICE_HIGH_HZ, BUTTERWORTH_Q, sr);
        let mut presence = Biquad::peaking(PRESENCE_HZ, PRESENCE_Q, self.presence_boost_db(), sr);

        let shaped: Vec<f32> = samples
            .iter()
            .map(|&x| presence.process(lp.process(hp.process(x))))
            .collect();

        let mut low_split = Biquad::lowpass(LOW_SPLIT_HZ, BUTTERWORTH_Q, sr);
        let mut high_split = Biquad::highpass(HIGH_SPLIT_HZ, BUTTERWORTH_Q, sr);
        let mut bands = [Compressor::new(sr), Compressor::new(sr), Compressor::new(sr)];

        shaped
            .iter()
            .map(|&x| {
                let low = low_split.process(x);
                let high = high_split.process(x);
                let mid = x - low - high;
                bands[0].process(low) + bands[1].process(mid) + bands[2].process(high)
            })
            .collect()
    }
}

impl AudioStage for VoiceEnhancement {
    fn enhancement(&self) -> Enhancement {
        Enhancement::VoiceEnhancement
    }

    fn process(&self, chunk: &AudioChunk) -> Result<AudioChunk> {
        let sr = chunk.sample_rate as f32;
        let out = chunk.map_channels(|samples| self.process_channel(samples, sr));
        Ok(limit_peak(out, CLIP_CEILING))
    }
}

/// Feed-forward compressor with a smoothed envelope.
struct Compressor {
    env: f32,
    attack: f32,
    release: f32,
}

impl Compressor {
    fn new(sample_rate: f32) -> Self {
        Self {
            env: 0.0,
            attack: time_coefficient(0.01, sample_rate),
            release: time_coefficient(0.1, sample_rate),
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let level = x.abs();
        let coeff = if level > self.env { self.attack } else { self.release };
        self.env = coeff * self.env + (1.0 - coeff) * level;
        let over = amplitude_to_db(self.env) - COMPRESS_THRESHOLD_DB;
        if over <= 0.0 {
            return x;
        }
        let reduction_db = over - over / COMPRESS_RATIO;
        x * 10f32.powf(-reduction_db / 20.0)
    }
}

/// Scale the whole chunk down if any sample exceeds `ceiling`.
pub fn limit_peak(chunk: AudioChunk, ceiling: f32) -> AudioChunk {
    let peak = chunk.samples().fold(0.0f32, |m, x| m.max(x.abs()));
    if peak <= ceiling {
        return chunk;
    }
    let scale = ceiling / peak;
    chunk.map_channels(|c| c.iter().map(|x| x * scale).collect())
}
