//! CPU color correction: brightness, contrast, saturation, temperature.
//!
//! Per channel, in order:
//! 1. knobs normalized from [-100, 100] to [-1, 1]
//! 2. brightness: `c += b * 255`
//! 3. contrast around mid-gray: `c = (c - 128) * (1 + k) + 128`
//! 4. saturation: blend away from luma `L` by `1 + s`
//! 5. temperature: `R += t * 25.5`, `B -= t * 25.5`
//! 6. clamp to [0, 255]; alpha copied unchanged
//!
//! The GPU renderer in `clipfix-gpu` implements the same contract
//! independently; the two must agree within a few intensity levels.

use crate::analysis::{luminance, luminance_stats};
use crate::white_balance;
use clipfix_core::{EnhancementSettings, FrameData, Result};
use serde::{Deserialize, Serialize};

/// Channel shift for a fully normalized brightness of 1.0.
pub const BRIGHTNESS_SCALE: f32 = 255.0;
/// Red/blue shift for a fully normalized temperature of 1.0.
pub const TEMPERATURE_SCALE: f32 = 25.5;
pub const MID_GRAY: f32 = 128.0;

/// The four color knobs, each in [-100, 100].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorAdjustment {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub temperature: f32,
}

impl ColorAdjustment {
    pub fn from_settings(settings: &EnhancementSettings) -> Self {
        Self {
            brightness: settings.brightness,
            contrast: settings.contrast,
            saturation: settings.saturation,
            temperature: settings.temperature,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 0.0
            && self.saturation == 0.0
            && self.temperature == 0.0
    }

    /// Knobs mapped to [-1, 1], in `[brightness, contrast, saturation, temperature]` order.
    pub fn normalized(&self) -> [f32; 4] {
        [
            self.brightness,
            self.contrast,
            self.saturation,
            self.temperature,
        ]
        .map(|v| (v / 100.0).clamp(-1.0, 1.0))
    }
}

/// Correct one RGB triple given normalized knobs. Result is not clamped.
#[inline]
pub fn correct_rgb(rgb: [f32; 3], knobs: [f32; 4]) -> [f32; 3] {
    let [brightness, contrast, saturation, temperature] = knobs;

    let shift = brightness * BRIGHTNESS_SCALE;
    let [mut r, mut g, mut b] = rgb.map(|c| c + shift);

    let gain = 1.0 + contrast;
    r = (r - MID_GRAY) * gain + MID_GRAY;
    g = (g - MID_GRAY) * gain + MID_GRAY;
    b = (b - MID_GRAY) * gain + MID_GRAY;

    let l = luminance(r, g, b);
    let sat = 1.0 + saturation;
    r = l + (r - l) * sat;
    g = l + (g - l) * sat;
    b = l + (b - l) * sat;

    r += temperature * TEMPERATURE_SCALE;
    b -= temperature * TEMPERATURE_SCALE;

    [r, g, b]
}

/// Apply color correction to an RGBA8 buffer, returning a new buffer.
pub fn apply_color_correction(pixels: &[u8], adjustment: &ColorAdjustment) -> Vec<u8> {
    if adjustment.is_neutral() {
        return pixels.to_vec();
    }
    let knobs = adjustment.normalized();
    let mut out = Vec::with_capacity(pixels.len());
    for px in pixels.chunks_exact(4) {
        let [r, g, b] = correct_rgb([px[0] as f32, px[1] as f32, px[2] as f32], knobs);
        out.push(to_u8(r));
        out.push(to_u8(g));
        out.push(to_u8(b));
        out.push(px[3]);
    }
    out
}

/// Frame-level wrapper around [`apply_color_correction`].
pub fn correct_frame(frame: &FrameData, adjustment: &ColorAdjustment) -> Result<FrameData> {
    frame.with_pixels(apply_color_correction(&frame.pixels, adjustment))
}

#[inline]
pub(crate) fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Targets and safety limits for automatic correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorrectionTargets {
    /// Target mean luminance, 0-255.
    pub brightness: f32,
    /// Target luminance standard deviation.
    pub contrast: f32,
    /// Target temperature on the [-100, 100] scale.
    pub temperature: f32,
    pub max_brightness: f32,
    pub max_contrast: f32,
}

impl Default for CorrectionTargets {
    fn default() -> Self {
        Self {
            brightness: 128.0,
            contrast: 50.0,
            temperature: 0.0,
            max_brightness: 50.0,
            max_contrast: 30.0,
        }
    }
}

/// Brightness knob that moves `current` mean luminance toward the target.
pub fn optimal_brightness(current: f32, targets: &CorrectionTargets) -> f32 {
    ((targets.brightness - current) / BRIGHTNESS_SCALE * 100.0)
        .clamp(-targets.max_brightness, targets.max_brightness)
}

/// Contrast knob that moves `current` luminance deviation toward the target.
pub fn optimal_contrast(current: f32, targets: &CorrectionTargets) -> f32 {
    (targets.contrast - current).clamp(-targets.max_contrast, targets.max_contrast)
}

/// Derive brightness, contrast, and temperature from measured averages.
///
/// Each knob is clamped to a narrower safety range than the accepted
/// settings range so automatic correction never overshoots.
pub fn calculate_optimal_color_correction(
    pixels: &[u8],
    targets: &CorrectionTargets,
) -> ColorAdjustment {
    let (brightness, contrast) = luminance_stats(pixels);
    ColorAdjustment {
        brightness: optimal_brightness(brightness, targets),
        contrast: optimal_contrast(contrast, targets),
        saturation: 0.0,
        temperature: white_balance::calculate_optimal(pixels, targets.temperature),
    }
}
