//! White balance: shift the red/blue axis with a slight green nudge.

use crate::analysis::{channel_averages, temperature_from_averages};
use crate::correction::to_u8;
use clipfix_core::{FrameData, Result};

/// Channel units per adjustment point.
const CHANNEL_UNITS: f32 = 2.55;
const RED_BLUE_WEIGHT: f32 = 0.5;
const GREEN_WEIGHT: f32 = 0.1;
/// Fraction of the measured error corrected by [`calculate_optimal`].
const CORRECTION_GAIN: f32 = 0.8;

/// Per-channel offsets for an adjustment in [-100, 100]. Positive is warm.
pub fn channel_offsets(adjustment: f32) -> [f32; 3] {
    let adj = adjustment.clamp(-100.0, 100.0);
    [
        adj * RED_BLUE_WEIGHT * CHANNEL_UNITS,
        adj * GREEN_WEIGHT * CHANNEL_UNITS,
        -adj * RED_BLUE_WEIGHT * CHANNEL_UNITS,
    ]
}

/// Apply a white balance adjustment to an RGBA8 buffer.
pub fn apply(pixels: &[u8], adjustment: f32) -> Vec<u8> {
    if adjustment == 0.0 {
        return pixels.to_vec();
    }
    let [dr, dg, db] = channel_offsets(adjustment);
    let mut out = Vec::with_capacity(pixels.len());
    for px in pixels.chunks_exact(4) {
        out.push(to_u8(px[0] as f32 + dr));
        out.push(to_u8(px[1] as f32 + dg));
        out.push(to_u8(px[2] as f32 + db));
        out.push(px[3]);
    }
    out
}

pub fn apply_frame(frame: &FrameData, adjustment: f32) -> Result<FrameData> {
    frame.with_pixels(apply(&frame.pixels, adjustment))
}

/// Measured red/blue temperature of a buffer on the [-100, 100] scale.
pub fn measure_temperature(pixels: &[u8]) -> f32 {
    temperature_from_averages(channel_averages(pixels))
}

/// Adjustment that moves the measured temperature toward `target`.
pub fn calculate_optimal(pixels: &[u8], target_temperature: f32) -> f32 {
    optimal_for_temperature(measure_temperature(pixels), target_temperature)
}

/// Same as [`calculate_optimal`] for an already measured temperature.
pub fn optimal_for_temperature(current: f32, target_temperature: f32) -> f32 {
    ((target_temperature - current) * CORRECTION_GAIN).clamp(-100.0, 100.0)
}

/// Measure, then apply the optimal adjustment. Returns the new buffer and
/// the adjustment used.
pub fn auto_adjust(pixels: &[u8], target_temperature: f32) -> (Vec<u8>, f32) {
    let adjustment = calculate_optimal(pixels, target_temperature);
    tracing::debug!(adjustment, "auto white balance");
    (apply(pixels, adjustment), adjustment)
}
