//! ClipFix Stabilize - Motion smoothing and stabilization warp.

pub mod stabilize;
pub mod warp;

pub use stabilize::{
    calculate_smooth_path, calculate_stabilization_transform, shake_reduction_percent,
    should_apply_stabilization, StabilizationParams, StabilizationResult, Stabilizer,
};
pub use warp::{apply_stabilization, warp_pixels};
