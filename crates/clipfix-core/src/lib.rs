//! ClipFix Core - Foundation types for the enhancement pipeline
//!
//! This crate provides the types shared by every stage:
//! - Frame and audio buffers (FrameData, AudioChunk)
//! - Enhancement toggles and numeric settings
//! - Motion vectors and stabilization transforms
//! - Session metrics
//! - The error taxonomy and recovery strategies

pub mod error;
pub mod frame;
pub mod metrics;
pub mod motion;
pub mod settings;

pub use error::{EnhancementError, ErrorCategory, ErrorCode, ErrorText, RecoveryStrategy, Result};
pub use frame::{AudioChunk, FrameData, BYTES_PER_PIXEL};
pub use metrics::{EnhancementMetrics, ProcessingBackend};
pub use motion::{MotionVector, StabilizationTransform};
pub use settings::{
    Enhancement, EnhancementConfig, EnhancementSettings, NormalizationMethod, COLOR_RANGE,
    STRENGTH_RANGE,
};

/// Memory budget constants.
pub mod memory_budget {
    /// Default budget for frames held in RAM during one run.
    pub const DEFAULT_MEMORY_BUDGET: usize = 512 * 1024 * 1024; // 512 MB

    /// Fraction of the budget a single chunk may occupy.
    pub const CHUNK_BUDGET_FRACTION: f64 = 0.5;

    /// Largest texture dimension requested from the GPU.
    pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

    /// Bytes per second of decoded audio (48kHz stereo f32).
    pub const AUDIO_BYTES_PER_SECOND: usize = 48_000 * 2 * 4;
}
