//! Integration tests for the audio chain.

use clipfix_audio::analysis::{noise_floor_db, peak, rms};
use clipfix_audio::{
    estimate_echo_reduction, AudioProcessor, AudioRenderContext, AudioStage, NoiseReduction,
    VoiceEnhancement, VolumeNormalization,
};
use clipfix_core::{
    AudioChunk, EnhancementConfig, EnhancementSettings, ErrorCode, NormalizationMethod,
};
use proptest::prelude::*;

const SR: u32 = 48_000;

/// Deterministic white noise at `amplitude`.
fn noise(len: usize, amplitude: f32, mut seed: u32) -> Vec<f32> {
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed as f32 / u32::MAX as f32 * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// A tone with a bed of noise under it.
fn noisy_tone() -> AudioChunk {
    let bed = noise(SR as usize, 0.02, 0x1234_5678);
    let samples = bed
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let t = i as f32 / SR as f32;
            let gate = if (t * 4.0) as usize % 2 == 0 { 1.0 } else { 0.0 };
            n + gate * 0.4 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();
    AudioChunk::new(vec![samples], SR).unwrap()
}

fn ramp(peak_level: f32) -> AudioChunk {
    let samples = (0..2_000)
        .map(|i| peak_level * ((i % 200) as f32 / 199.0 * 2.0 - 1.0))
        .collect();
    AudioChunk::new(vec![samples], SR).unwrap()
}

#[test]
fn stronger_noise_reduction_lowers_the_floor() {
    let input = noisy_tone();
    let light = NoiseReduction::new(30.0, true).process(&input).unwrap();
    let heavy = NoiseReduction::new(90.0, true).process(&input).unwrap();
    assert!(noise_floor_db(&heavy) <= noise_floor_db(&light));
    assert!(noise_floor_db(&light) <= noise_floor_db(&input));
}

#[test]
fn chain_rejects_unsupported_sample_rate() {
    let processor = AudioProcessor::new(AudioRenderContext::try_new(SR).unwrap());
    let chunk = AudioChunk::new(vec![vec![0.1; 100]], 20).unwrap();
    let err = processor
        .process(&chunk, &EnhancementConfig::all(), &EnhancementSettings::default())
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AudioDecodeFailed);
}

#[test]
fn peak_normalization_raises_quiet_input() {
    let out = VolumeNormalization::new(80.0, NormalizationMethod::Peak, true)
        .process(&ramp(0.1))
        .unwrap();
    assert!((peak(&out) - 0.8).abs() < 0.1);
}

#[test]
fn peak_normalization_lowers_loud_input() {
    let out = VolumeNormalization::new(50.0, NormalizationMethod::Peak, true)
        .process(&ramp(0.95))
        .unwrap();
    assert!(peak(&out) < 0.95);
}

#[test]
fn silence_through_the_full_chain_stays_silent() {
    let processor = AudioProcessor::new(AudioRenderContext::try_new(SR).unwrap());
    let chunk = AudioChunk::silent(2, SR, SR as usize);
    let out = processor
        .process(&chunk, &EnhancementConfig::all(), &EnhancementSettings::default())
        .unwrap();
    assert!(peak(&out.chunk) < 0.01);
    assert_eq!(out.applied.len(), 4);
    assert_eq!(out.chunk.frame_length(), chunk.frame_length());
}

#[test]
fn voice_enhancement_never_clips() {
    let loud = AudioChunk::new(vec![noise(SR as usize / 2, 0.98, 0xdead_beef)], SR).unwrap();
    for preserve in [true, false] {
        let out = VoiceEnhancement::new(100.0, preserve).process(&loud).unwrap();
        assert!(peak(&out) <= 1.0);
    }
}

#[test]
fn identical_audio_has_no_echo_reduction() {
    let chunk = AudioChunk::new(vec![noise(SR as usize, 0.3, 42)], SR).unwrap();
    let reduction = estimate_echo_reduction(&chunk, &chunk);
    assert!(reduction.abs() < 1e-3);
}

#[test]
fn full_chain_keeps_shape() {
    let processor = AudioProcessor::new(AudioRenderContext::try_new(SR).unwrap());
    let stereo = AudioChunk::new(
        vec![noise(9_600, 0.2, 1), noise(9_600, 0.2, 2)],
        SR,
    )
    .unwrap();
    let out = processor
        .process(&stereo, &EnhancementConfig::all(), &EnhancementSettings::default())
        .unwrap();
    assert_eq!(out.chunk.channel_count(), 2);
    assert_eq!(out.chunk.frame_length(), 9_600);
    assert_eq!(out.chunk.sample_rate, SR);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn fixed_threshold_never_raises_the_floor(strength in 0.0f32..=100.0) {
        let input = noisy_tone();
        let out = NoiseReduction::new(strength, false).process(&input).unwrap();
        prop_assert!(noise_floor_db(&out) <= noise_floor_db(&input) + 0.5);
    }
}

proptest! {
    #[test]
    fn rms_normalization_hits_target(level in 0.01f32..0.3, target in 5.0f32..30.0) {
        let out = VolumeNormalization::new(target, NormalizationMethod::Rms, false)
            .process(&ramp(level))
            .unwrap();
        prop_assert!((rms(&out) - target / 100.0).abs() < 1e-3);
    }
}
