//! Camera-shake stabilization from precomputed motion vectors.

use clipfix_core::{MotionVector, StabilizationTransform};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub const DEFAULT_WINDOW_SIZE: usize = 5;
pub const DEFAULT_MAX_CROP_FRACTION: f32 = 0.05;
pub const DEFAULT_MIN_MOTION_THRESHOLD: f32 = 1.0;
/// Fewest samples that can say anything about shake.
pub const MIN_HISTORY: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StabilizationParams {
    pub window_size: usize,
    pub max_crop_fraction: f32,
    pub min_motion_threshold: f32,
    /// Share of the correction applied, 0-100.
    pub strength: f32,
}

impl Default for StabilizationParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            max_crop_fraction: DEFAULT_MAX_CROP_FRACTION,
            min_motion_threshold: DEFAULT_MIN_MOTION_THRESHOLD,
            strength: 100.0,
        }
    }
}

/// Outcome of stabilizing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilizationResult {
    pub transform: StabilizationTransform,
    pub crop_fraction: f32,
    pub confidence: f32,
    pub stabilized: bool,
}

impl StabilizationResult {
    pub const NOT_STABILIZED: Self = Self {
        transform: StabilizationTransform::IDENTITY,
        crop_fraction: 0.0,
        confidence: 0.0,
        stabilized: false,
    };
}

/// Centered moving average over `window_size` samples, truncated at the
/// edges. Histories shorter than the window come back unchanged.
pub fn calculate_smooth_path(history: &[MotionVector], window_size: usize) -> Vec<MotionVector> {
    if window_size == 0 || history.len() < window_size {
        return history.to_vec();
    }
    let half = window_size / 2;
    let last = history.len() - 1;
    (0..history.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(last);
            let sum: Vec2 = history[lo..=hi].iter().map(|m| m.as_vec2()).sum();
            MotionVector::from(sum / (hi - lo + 1) as f32)
        })
        .collect()
}

/// Transform that moves `current` onto the `smoothed` path.
///
/// The correction per axis is clamped to `max_crop_fraction * 100` units,
/// so the reported crop fraction never exceeds `max_crop_fraction`.
pub fn calculate_stabilization_transform(
    current: MotionVector,
    smoothed: MotionVector,
    max_crop_fraction: f32,
) -> StabilizationResult {
    let limit = max_crop_fraction.max(0.0) * 100.0;
    let correction = (smoothed.as_vec2() - current.as_vec2())
        .clamp(Vec2::splat(-limit), Vec2::splat(limit));

    let crop_fraction =
        (correction.x.abs().max(correction.y.abs()) / 100.0).min(max_crop_fraction.max(0.0));
    let transform = StabilizationTransform {
        translate_x: correction.x,
        translate_y: correction.y,
        scale: 1.0 + crop_fraction,
        rotation: 0.0,
    };

    StabilizationResult {
        transform,
        crop_fraction,
        confidence: (correction.length() / 10.0).min(1.0),
        stabilized: !transform.is_identity(),
    }
}

/// Gate for the whole stage: enough samples, and enough average motion.
pub fn should_apply_stabilization(history: &[MotionVector], min_motion_threshold: f32) -> bool {
    if history.len() < MIN_HISTORY {
        return false;
    }
    let average = history.iter().map(|m| m.magnitude).sum::<f32>() / history.len() as f32;
    average >= min_motion_threshold
}

/// Percentage of the frame's motion removed by following the smoothed path.
pub fn shake_reduction_percent(current: MotionVector, smoothed: MotionVector) -> f32 {
    if current.magnitude <= f32::EPSILON {
        return 0.0;
    }
    ((1.0 - smoothed.magnitude / current.magnitude) * 100.0).clamp(0.0, 100.0)
}

/// Rolling stabilizer fed one motion vector per frame.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    params: StabilizationParams,
    history: Vec<MotionVector>,
    capacity: usize,
    active: bool,
}

impl Stabilizer {
    pub fn new(params: StabilizationParams) -> Self {
        let capacity = (params.window_size * 4).max(MIN_HISTORY * 4);
        Self {
            params,
            history: Vec::with_capacity(capacity),
            capacity,
            active: false,
        }
    }

    pub fn params(&self) -> &StabilizationParams {
        &self.params
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.params.strength = strength.clamp(0.0, 100.0);
    }

    pub fn history(&self) -> &[MotionVector] {
        &self.history
    }

    /// Whether the last pushed frame passed the motion gate.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.active = false;
    }

    /// Record the motion of the next frame and compute its correction.
    pub fn push(&mut self, motion: MotionVector) -> (StabilizationResult, f32) {
        if self.history.len() == self.capacity {
            self.history.remove(0);
        }
        self.history.push(motion);

        let gate = should_apply_stabilization(&self.history, self.params.min_motion_threshold);
        if gate != self.active {
            debug!(
                active = gate,
                history = self.history.len(),
                threshold = self.params.min_motion_threshold,
                "stabilization gate changed"
            );
            self.active = gate;
        }
        if !gate {
            return (StabilizationResult::NOT_STABILIZED, 0.0);
        }

        let smooth = calculate_smooth_path(&self.history, self.params.window_size);
        let Some(&target) = smooth.last() else {
            return (StabilizationResult::NOT_STABILIZED, 0.0);
        };

        // Strength blends between the raw and smoothed positions
        let factor = (self.params.strength / 100.0).clamp(0.0, 1.0);
        let blended = MotionVector::from(motion.as_vec2().lerp(target.as_vec2(), factor));

        let result =
            calculate_stabilization_transform(motion, blended, self.params.max_crop_fraction);
        let reduction = shake_reduction_percent(motion, blended);
        trace!(
            dx = result.transform.translate_x,
            dy = result.transform.translate_y,
            crop = result.crop_fraction,
            reduction,
            "frame stabilized"
        );
        (result, reduction)
    }
}
