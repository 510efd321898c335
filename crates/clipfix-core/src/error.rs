//! Error taxonomy for the enhancement pipeline.
//!
//! Errors are plain data: a code, a recovery strategy chosen at the point of
//! failure, and a context map. Default user-facing text comes from a lookup
//! on the code, never from the error value itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Broad grouping of error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Gpu,
    Memory,
    Processing,
    Validation,
    AudioContext,
    Timeout,
    FileData,
    Compatibility,
    Generic,
}

/// Every failure the pipeline knows how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ── GPU / hardware ──────────────────────────
    GpuNotAvailable,
    GpuContextLost,
    ShaderCompilationFailed,
    TextureCreationFailed,
    GpuMemoryExceeded,

    // ── Memory / resources ──────────────────────
    OutOfMemory,
    VideoTooLarge,
    BufferAllocationFailed,

    // ── Processing ──────────────────────────────
    ProcessingFailed,
    FrameProcessingFailed,
    AudioProcessingFailed,
    StabilizationFailed,

    // ── Input validation ────────────────────────
    InvalidInput,
    InvalidSettings,
    InvalidDimensions,

    // ── Audio context ───────────────────────────
    AudioContextFailed,
    AudioContextSuspended,
    AudioDecodeFailed,

    // ── Timeout / performance ───────────────────
    ProcessingTimeout,
    SeekTimeout,
    PerformanceDegraded,

    // ── File / data ─────────────────────────────
    FileReadFailed,
    UnsupportedCodec,
    DataCorruption,

    // ── Browser / platform compatibility ────────
    BrowserUnsupported,
    SecurityRestriction,
    FeatureUnavailable,

    // ── Generic ─────────────────────────────────
    NotInitialized,
    Unknown,
}

/// Action the orchestrator should take in response to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStrategy {
    Retry,
    FallbackToCpu,
    SkipEnhancement,
    ReduceQuality,
    ChunkProcessing,
    UserIntervention,
    None,
}

/// Default user-facing text for an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorText {
    pub message: &'static str,
    pub suggestion: &'static str,
}

impl ErrorCode {
    /// All codes, in declaration order.
    pub const ALL: [ErrorCode; 29] = [
        Self::GpuNotAvailable,
        Self::GpuContextLost,
        Self::ShaderCompilationFailed,
        Self::TextureCreationFailed,
        Self::GpuMemoryExceeded,
        Self::OutOfMemory,
        Self::VideoTooLarge,
        Self::BufferAllocationFailed,
        Self::ProcessingFailed,
        Self::FrameProcessingFailed,
        Self::AudioProcessingFailed,
        Self::StabilizationFailed,
        Self::InvalidInput,
        Self::InvalidSettings,
        Self::InvalidDimensions,
        Self::AudioContextFailed,
        Self::AudioContextSuspended,
        Self::AudioDecodeFailed,
        Self::ProcessingTimeout,
        Self::SeekTimeout,
        Self::PerformanceDegraded,
        Self::FileReadFailed,
        Self::UnsupportedCodec,
        Self::DataCorruption,
        Self::BrowserUnsupported,
        Self::SecurityRestriction,
        Self::FeatureUnavailable,
        Self::NotInitialized,
        Self::Unknown,
    ];

    /// Stable identifier used in logs and serialized errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GpuNotAvailable => "GPU_NOT_AVAILABLE",
            Self::GpuContextLost => "GPU_CONTEXT_LOST",
            Self::ShaderCompilationFailed => "SHADER_COMPILATION_FAILED",
            Self::TextureCreationFailed => "TEXTURE_CREATION_FAILED",
            Self::GpuMemoryExceeded => "GPU_MEMORY_EXCEEDED",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::VideoTooLarge => "VIDEO_TOO_LARGE",
            Self::BufferAllocationFailed => "BUFFER_ALLOCATION_FAILED",
            Self::ProcessingFailed => "PROCESSING_FAILED",
            Self::FrameProcessingFailed => "FRAME_PROCESSING_FAILED",
            Self::AudioProcessingFailed => "AUDIO_PROCESSING_FAILED",
            Self::StabilizationFailed => "STABILIZATION_FAILED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidSettings => "INVALID_SETTINGS",
            Self::InvalidDimensions => "INVALID_DIMENSIONS",
            Self::AudioContextFailed => "AUDIO_CONTEXT_FAILED",
            Self::AudioContextSuspended => "AUDIO_CONTEXT_SUSPENDED",
            Self::AudioDecodeFailed => "AUDIO_DECODE_FAILED",
            Self::ProcessingTimeout => "PROCESSING_TIMEOUT",
            Self::SeekTimeout => "SEEK_TIMEOUT",
            Self::PerformanceDegraded => "PERFORMANCE_DEGRADED",
            Self::FileReadFailed => "FILE_READ_FAILED",
            Self::UnsupportedCodec => "UNSUPPORTED_CODEC",
            Self::DataCorruption => "DATA_CORRUPTION",
            Self::BrowserUnsupported => "BROWSER_UNSUPPORTED",
            Self::SecurityRestriction => "SECURITY_RESTRICTION",
            Self::FeatureUnavailable => "FEATURE_UNAVAILABLE",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Category this code belongs to.
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::GpuNotAvailable
            | Self::GpuContextLost
            | Self::ShaderCompilationFailed
            | Self::TextureCreationFailed
            | Self::GpuMemoryExceeded => ErrorCategory::Gpu,
            Self::OutOfMemory | Self::VideoTooLarge | Self::BufferAllocationFailed => {
                ErrorCategory::Memory
            }
            Self::ProcessingFailed
            | Self::FrameProcessingFailed
            | Self::AudioProcessingFailed
            | Self::StabilizationFailed => ErrorCategory::Processing,
            Self::InvalidInput | Self::InvalidSettings | Self::InvalidDimensions => {
                ErrorCategory::Validation
            }
            Self::AudioContextFailed | Self::AudioContextSuspended | Self::AudioDecodeFailed => {
                ErrorCategory::AudioContext
            }
            Self::ProcessingTimeout | Self::SeekTimeout | Self::PerformanceDegraded => {
                ErrorCategory::Timeout
            }
            Self::FileReadFailed | Self::UnsupportedCodec | Self::DataCorruption => {
                ErrorCategory::FileData
            }
            Self::BrowserUnsupported | Self::SecurityRestriction | Self::FeatureUnavailable => {
                ErrorCategory::Compatibility
            }
            Self::NotInitialized | Self::Unknown => ErrorCategory::Generic,
        }
    }

    /// Default message and remediation for this code.
    pub fn text(self) -> ErrorText {
        let (message, suggestion) = match self {
            Self::GpuNotAvailable => (
                "GPU acceleration is not available on this device.",
                "Processing will continue on the CPU, which may be slower.",
            ),
            Self::GpuContextLost => (
                "The graphics context was lost during processing.",
                "Processing has switched to the CPU for the rest of this session.",
            ),
            Self::ShaderCompilationFailed => (
                "A graphics shader failed to compile.",
                "Processing will continue on the CPU.",
            ),
            Self::TextureCreationFailed => (
                "Could not allocate a graphics texture for this frame.",
                "Try a smaller video or let processing continue on the CPU.",
            ),
            Self::GpuMemoryExceeded => (
                "The video is too large for available graphics memory.",
                "Processing will continue on the CPU.",
            ),
            Self::OutOfMemory => (
                "The device ran out of memory while processing.",
                "Close other applications or process a shorter clip.",
            ),
            Self::VideoTooLarge => (
                "This video is too large to process in one pass.",
                "The video will be processed in smaller chunks.",
            ),
            Self::BufferAllocationFailed => (
                "Could not allocate a processing buffer.",
                "Try again with lower quality settings.",
            ),
            Self::ProcessingFailed => (
                "Enhancement processing failed.",
                "Try again, or lower the enhancement strength.",
            ),
            Self::FrameProcessingFailed => (
                "A video frame could not be enhanced.",
                "Try again with reduced settings.",
            ),
            Self::AudioProcessingFailed => (
                "The audio track could not be enhanced.",
                "The video will be enhanced without audio changes.",
            ),
            Self::StabilizationFailed => (
                "Stabilization could not be applied.",
                "The video will be enhanced without stabilization.",
            ),
            Self::InvalidInput => (
                "The provided media is not valid for enhancement.",
                "Check that the file is a supported video or audio clip.",
            ),
            Self::InvalidSettings => (
                "One or more enhancement settings are out of range.",
                "Reset the settings to their defaults and try again.",
            ),
            Self::InvalidDimensions => (
                "The frame dimensions do not match the pixel data.",
                "Re-export the clip and try again.",
            ),
            Self::AudioContextFailed => (
                "Audio processing is not available.",
                "The video will be enhanced without audio changes.",
            ),
            Self::AudioContextSuspended => (
                "Audio processing was suspended.",
                "Resume playback or interact with the page, then retry.",
            ),
            Self::AudioDecodeFailed => (
                "The audio track could not be decoded.",
                "The video will be enhanced without audio changes.",
            ),
            Self::ProcessingTimeout => (
                "Processing took too long and was stopped.",
                "Try a shorter clip or lower quality settings.",
            ),
            Self::SeekTimeout => (
                "Seeking within the video timed out.",
                "Analysis continued with the frames that were available.",
            ),
            Self::PerformanceDegraded => (
                "Processing is running slower than expected.",
                "Lower the enhancement quality to speed things up.",
            ),
            Self::FileReadFailed => (
                "The media file could not be read.",
                "Check that the file exists and is not in use.",
            ),
            Self::UnsupportedCodec => (
                "This media format is not supported.",
                "Convert the clip to a supported format and try again.",
            ),
            Self::DataCorruption => (
                "The media data appears to be corrupted.",
                "Re-record or re-export the clip.",
            ),
            Self::BrowserUnsupported => (
                "This platform does not support media enhancement.",
                "Use a supported platform.",
            ),
            Self::SecurityRestriction => (
                "A security restriction blocked access to the media.",
                "Check permissions for the media source.",
            ),
            Self::FeatureUnavailable => (
                "A required feature is unavailable on this platform.",
                "Some enhancements will be skipped.",
            ),
            Self::NotInitialized => (
                "The enhancement pipeline has not been initialized.",
                "Initialize the pipeline before processing.",
            ),
            Self::Unknown => (
                "An unexpected error occurred.",
                "Try again. If the problem persists, report it.",
            ),
        };
        ErrorText {
            message,
            suggestion,
        }
    }

    /// Strategy used when the throw site does not choose one.
    pub fn default_strategy(self) -> RecoveryStrategy {
        match self.category() {
            ErrorCategory::Gpu => RecoveryStrategy::FallbackToCpu,
            ErrorCategory::Memory => match self {
                Self::VideoTooLarge => RecoveryStrategy::ChunkProcessing,
                _ => RecoveryStrategy::ReduceQuality,
            },
            ErrorCategory::Processing => match self {
                Self::AudioProcessingFailed | Self::StabilizationFailed => {
                    RecoveryStrategy::SkipEnhancement
                }
                _ => RecoveryStrategy::Retry,
            },
            ErrorCategory::Validation => RecoveryStrategy::UserIntervention,
            ErrorCategory::AudioContext => match self {
                Self::AudioContextSuspended => RecoveryStrategy::Retry,
                _ => RecoveryStrategy::SkipEnhancement,
            },
            ErrorCategory::Timeout => match self {
                Self::PerformanceDegraded => RecoveryStrategy::ReduceQuality,
                _ => RecoveryStrategy::Retry,
            },
            ErrorCategory::FileData => RecoveryStrategy::UserIntervention,
            ErrorCategory::Compatibility => match self {
                Self::FeatureUnavailable => RecoveryStrategy::SkipEnhancement,
                _ => RecoveryStrategy::None,
            },
            ErrorCategory::Generic => match self {
                Self::NotInitialized => RecoveryStrategy::UserIntervention,
                _ => RecoveryStrategy::Retry,
            },
        }
    }

    /// Whether an error with this code is recoverable by default.
    pub fn default_recoverable(self) -> bool {
        !matches!(
            self.default_strategy(),
            RecoveryStrategy::UserIntervention | RecoveryStrategy::None
        ) && !self.is_permanently_unrecoverable()
    }

    /// Codes that can never be recovered from, whatever the throw site says.
    pub fn is_permanently_unrecoverable(self) -> bool {
        matches!(
            self,
            Self::BrowserUnsupported
                | Self::SecurityRestriction
                | Self::UnsupportedCodec
                | Self::DataCorruption
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified pipeline failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{code}] {user_message}")]
pub struct EnhancementError {
    pub code: ErrorCode,
    pub recoverable: bool,
    pub recovery_strategy: RecoveryStrategy,
    pub context: BTreeMap<String, String>,
    pub user_message: String,
    pub suggestion: String,
}

impl EnhancementError {
    /// Create an error with the code's default text and strategy.
    pub fn new(code: ErrorCode) -> Self {
        let text = code.text();
        Self {
            code,
            recoverable: code.default_recoverable(),
            recovery_strategy: code.default_strategy(),
            context: BTreeMap::new(),
            user_message: text.message.to_string(),
            suggestion: text.suggestion.to_string(),
        }
    }

    pub fn with_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.recovery_strategy = strategy;
        self
    }

    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Recoverable flag, overridden for permanently fatal codes.
    pub fn is_recoverable(&self) -> bool {
        self.recoverable && !self.code.is_permanently_unrecoverable()
    }

    /// Shorthand for a rejected setting.
    pub fn invalid_setting(field: &str, value: f32, min: f32, max: f32) -> Self {
        Self::new(ErrorCode::InvalidSettings)
            .with_context("field", field)
            .with_context("value", value)
            .with_context("range", format!("[{min}, {max}]"))
    }

    /// Shorthand for a buffer whose length does not match its dimensions.
    pub fn invalid_dimensions(width: u32, height: u32, len: usize) -> Self {
        Self::new(ErrorCode::InvalidDimensions)
            .with_context("width", width)
            .with_context("height", height)
            .with_context("len", len)
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EnhancementError>;
