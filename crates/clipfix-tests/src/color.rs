//! Integration tests for color correction and white balance.

use clipfix_color::analysis::{average_luminance, channel_averages};
use clipfix_color::{
    apply_color_correction, calculate_optimal_color_correction, correct_frame, white_balance,
    ColorAdjustment, CorrectionTargets,
};
use clipfix_core::FrameData;
use proptest::prelude::*;

fn brightness(b: f32) -> ColorAdjustment {
    ColorAdjustment {
        brightness: b,
        ..Default::default()
    }
}

fn rgba_pixels() -> impl Strategy<Value = Vec<u8>> {
    (1usize..64).prop_flat_map(|n| proptest::collection::vec(any::<u8>(), n * 4))
}

fn red_minus_blue(pixels: &[u8]) -> f32 {
    let [r, _, b] = channel_averages(pixels);
    r - b
}

proptest! {
    #[test]
    fn brightness_is_monotonic(
        pixels in rgba_pixels(),
        a in -100.0f32..=100.0,
        b in -100.0f32..=100.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let dim = apply_color_correction(&pixels, &brightness(lo));
        let bright = apply_color_correction(&pixels, &brightness(hi));
        prop_assert!(average_luminance(&dim) <= average_luminance(&bright) + 1e-3);
        prop_assert_eq!(dim.len(), pixels.len());
    }

    #[test]
    fn alpha_is_untouched(
        pixels in rgba_pixels(),
        b in -100.0f32..=100.0,
        c in -100.0f32..=100.0,
        s in -100.0f32..=100.0,
        t in -100.0f32..=100.0,
    ) {
        let adj = ColorAdjustment { brightness: b, contrast: c, saturation: s, temperature: t };
        let out = apply_color_correction(&pixels, &adj);
        for (src, dst) in pixels.chunks_exact(4).zip(out.chunks_exact(4)) {
            prop_assert_eq!(src[3], dst[3]);
        }
    }

    #[test]
    fn warm_beats_cool(pixels in rgba_pixels(), w in 1.0f32..=100.0) {
        let warm = white_balance::apply(&pixels, w);
        let cool = white_balance::apply(&pixels, -w);
        prop_assert!(red_minus_blue(&warm) > red_minus_blue(&cool));
    }
}

#[test]
fn mid_gray_brightens() {
    let frame = FrameData::solid(64, 36, [128, 128, 128, 255]);
    let out = correct_frame(&frame, &brightness(20.0)).unwrap();
    assert!(average_luminance(&out.pixels) > average_luminance(&frame.pixels));
    assert_eq!((out.width, out.height), (64, 36));
    assert_eq!(frame.pixels[0], 128);
}

#[test]
fn zero_white_balance_is_identity() {
    let frame = FrameData::test_pattern(32, 8);
    assert_eq!(white_balance::apply(&frame.pixels, 0.0), frame.pixels);
}

#[test]
fn optimal_correction_stays_in_safety_range() {
    let targets = CorrectionTargets::default();
    for level in [0u8, 30, 128, 220, 255] {
        let frame = FrameData::solid(16, 16, [level, level, level, 255]);
        let adj = calculate_optimal_color_correction(&frame.pixels, &targets);
        assert!(adj.brightness.abs() <= targets.max_brightness);
        assert!(adj.contrast.abs() <= targets.max_contrast);
        assert!(adj.temperature.abs() <= 100.0);
    }
}

#[test]
fn auto_white_balance_neutralizes_a_cast() {
    let frame = FrameData::solid(16, 16, [170, 128, 90, 255]);
    let (balanced, adjustment) = white_balance::auto_adjust(&frame.pixels, 0.0);
    assert!(adjustment < 0.0);
    assert!(red_minus_blue(&balanced).abs() < red_minus_blue(&frame.pixels).abs());
}
