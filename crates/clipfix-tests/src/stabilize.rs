//! Integration tests for stabilization.

use clipfix_core::{FrameData, MotionVector, StabilizationTransform};
use clipfix_stabilize::{
    apply_stabilization, calculate_smooth_path, calculate_stabilization_transform,
    should_apply_stabilization, StabilizationParams, Stabilizer,
};
use proptest::prelude::*;

fn mv(x: f32, y: f32) -> MotionVector {
    MotionVector::new(x, y)
}

proptest! {
    #[test]
    fn crop_never_exceeds_limit(
        cx in -500.0f32..500.0,
        cy in -500.0f32..500.0,
        sx in -500.0f32..500.0,
        sy in -500.0f32..500.0,
        max_crop in 0.0f32..0.5,
    ) {
        let result = calculate_stabilization_transform(mv(cx, cy), mv(sx, sy), max_crop);
        prop_assert!(result.crop_fraction <= max_crop + 1e-6);
        prop_assert!(result.transform.translate_x.abs() <= max_crop * 100.0 + 1e-3);
        prop_assert!(result.transform.translate_y.abs() <= max_crop * 100.0 + 1e-3);
        prop_assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn warp_preserves_dimensions(
        width in 1u32..24,
        height in 1u32..24,
        tx in -30.0f32..30.0,
        ty in -30.0f32..30.0,
        scale in 1.0f32..1.5,
    ) {
        let frame = FrameData::test_pattern(width, height);
        let transform = StabilizationTransform {
            translate_x: tx,
            translate_y: ty,
            scale,
            rotation: 0.0,
        };
        let out = apply_stabilization(&frame, &transform).unwrap();
        prop_assert_eq!((out.width, out.height), (width, height));
        prop_assert_eq!(out.pixels.len(), frame.pixels.len());
    }
}

#[test]
fn small_motion_is_left_alone() {
    let history = [mv(0.1, 0.1), mv(0.15, 0.1), mv(0.12, 0.12)];
    assert!(!should_apply_stabilization(&history, 1.0));
}

#[test]
fn strong_motion_is_stabilized() {
    let history = [mv(5.0, 5.0), mv(5.0, 5.1), mv(5.1, 5.0)];
    assert!(should_apply_stabilization(&history, 1.0));
}

#[test]
fn short_history_is_never_stabilized() {
    assert!(!should_apply_stabilization(&[mv(50.0, 50.0), mv(-50.0, 50.0)], 1.0));
}

#[test]
fn smooth_path_midpoint_averages_neighbors() {
    let history: Vec<_> = [5.0, 10.0, 5.0, 10.0, 5.0].iter().map(|&x| mv(x, 0.0)).collect();
    let smooth = calculate_smooth_path(&history, 3);
    assert_eq!(smooth.len(), history.len());
    assert!((smooth[2].x - 25.0 / 3.0).abs() < 1e-4);
    assert!(smooth[2].magnitude > 5.0 && smooth[2].magnitude < 10.0);
}

#[test]
fn jittery_clip_gets_corrected() {
    let mut stabilizer = Stabilizer::new(StabilizationParams::default());
    let mut corrected = 0;
    for i in 0..20 {
        let jitter = if i % 2 == 0 { 4.0 } else { -4.0 };
        let (result, _) = stabilizer.push(mv(jitter, -jitter));
        if result.stabilized {
            corrected += 1;
            assert!(result.crop_fraction <= StabilizationParams::default().max_crop_fraction);
        }
    }
    assert!(corrected > 0);
}
