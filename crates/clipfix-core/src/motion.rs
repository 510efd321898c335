//! Motion vectors and stabilization transforms.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Estimated global motion of one frame relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionVector {
    pub x: f32,
    pub y: f32,
    pub magnitude: f32,
}

impl MotionVector {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            magnitude: Vec2::new(x, y).length(),
        }
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for MotionVector {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Per-frame correction applied by the stabilizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizationTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
    /// Always 0; rotation is not modeled.
    pub rotation: f32,
}

impl Default for StabilizationTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl StabilizationTransform {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
        rotation: 0.0,
    };

    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.translate_x, self.translate_y)
    }

    pub fn is_identity(&self) -> bool {
        self.translate_x == 0.0 && self.translate_y == 0.0 && self.scale == 1.0
    }
}
