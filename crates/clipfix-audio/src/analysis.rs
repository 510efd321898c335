//! Level measurements: RMS, peak, noise floor, dynamic range.

use clipfix_core::AudioChunk;
use serde::{Deserialize, Serialize};

/// Level reported for digital silence.
pub const SILENCE_DB: f32 = -120.0;
/// Analysis window for noise-floor estimation.
const WINDOW_SECS: f32 = 0.01;
/// Windows at or below this quantile count as background.
const FLOOR_QUANTILE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAnalysis {
    pub rms: f32,
    pub peak: f32,
    pub noise_floor_db: f32,
    pub dynamic_range_db: f32,
}

pub fn analyze(chunk: &AudioChunk) -> AudioAnalysis {
    let peak = peak(chunk);
    let noise_floor_db = noise_floor_db(chunk);
    AudioAnalysis {
        rms: rms(chunk),
        peak,
        noise_floor_db,
        dynamic_range_db: (amplitude_to_db(peak) - noise_floor_db).max(0.0),
    }
}

pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 1e-6 {
        SILENCE_DB
    } else {
        20.0 * amplitude.log10()
    }
}

pub fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

pub fn rms(chunk: &AudioChunk) -> f32 {
    let (sum, n) = chunk
        .samples()
        .fold((0.0f64, 0usize), |(s, n), x| (s + (x as f64) * (x as f64), n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64).sqrt() as f32
    }
}

pub fn peak(chunk: &AudioChunk) -> f32 {
    chunk.samples().fold(0.0f32, |m, x| m.max(x.abs()))
}

pub fn slice_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Noise floor in dB: a low quantile of short-window RMS levels, taken
/// across all channels.
pub fn noise_floor_db(chunk: &AudioChunk) -> f32 {
    let window = ((chunk.sample_rate as f32 * WINDOW_SECS) as usize).max(1);
    let mut levels: Vec<f32> = chunk
        .channels
        .iter()
        .flat_map(|c| c.chunks(window).map(slice_rms))
        .collect();
    if levels.is_empty() {
        return SILENCE_DB;
    }
    levels.sort_by(f32::total_cmp);
    let idx = ((levels.len() - 1) as f32 * FLOOR_QUANTILE) as usize;
    amplitude_to_db(levels[idx])
}

/// Drop in noise floor between two versions of the same audio, in dB.
pub fn noise_reduction_db(original: &AudioChunk, processed: &AudioChunk) -> f32 {
    (noise_floor_db(original) - noise_floor_db(processed)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_measures_as_floor() {
        let chunk = AudioChunk::silent(2, 48_000, 4_800);
        let a = analyze(&chunk);
        assert_eq!(a.peak, 0.0);
        assert_eq!(a.rms, 0.0);
        assert_eq!(a.noise_floor_db, SILENCE_DB);
    }

    #[test]
    fn full_scale_square() {
        let samples: Vec<f32> = (0..480).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let chunk = AudioChunk::new(vec![samples], 48_000).unwrap();
        assert!((rms(&chunk) - 1.0).abs() < 1e-6);
        assert_eq!(peak(&chunk), 1.0);
        assert!(noise_floor_db(&chunk).abs() < 1e-3);
    }

    #[test]
    fn db_round_trip() {
        assert!((db_to_amplitude(amplitude_to_db(0.25)) - 0.25).abs() < 1e-5);
        assert!((amplitude_to_db(0.1) + 20.0).abs() < 1e-4);
    }

    #[test]
    fn quiet_windows_set_the_floor() {
        let mut samples = vec![0.001f32; 4_800];
        for s in samples.iter_mut().skip(2_400) {
            *s = 0.5;
        }
        let chunk = AudioChunk::new(vec![samples], 48_000).unwrap();
        assert!((noise_floor_db(&chunk) + 60.0).abs() < 0.5);
        assert!(analyze(&chunk).dynamic_range_db > 50.0);
    }
}
