//! GPU error type and its mapping onto the pipeline taxonomy.

use clipfix_core::{EnhancementError, ErrorCode, RecoveryStrategy};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(String),

    #[error("GPU device lost: {0}")]
    ContextLost(String),

    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("Texture creation failed: {0}")]
    TextureCreation(String),

    #[error("GPU out of memory")]
    OutOfMemory,

    #[error("Frame {width}x{height} exceeds max texture size {max}")]
    FrameTooLarge { width: u32, height: u32, max: u32 },

    #[error("Readback failed: {0}")]
    Readback(String),

    #[error("Renderer has been released")]
    Released,
}

impl GpuError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoAdapter | Self::DeviceRequest(_) | Self::Released => ErrorCode::GpuNotAvailable,
            Self::ContextLost(_) => ErrorCode::GpuContextLost,
            Self::ShaderCompilation(_) => ErrorCode::ShaderCompilationFailed,
            Self::TextureCreation(_) | Self::FrameTooLarge { .. } | Self::Readback(_) => {
                ErrorCode::TextureCreationFailed
            }
            Self::OutOfMemory => ErrorCode::GpuMemoryExceeded,
        }
    }
}

impl From<GpuError> for EnhancementError {
    fn from(err: GpuError) -> Self {
        EnhancementError::new(err.code())
            .with_strategy(RecoveryStrategy::FallbackToCpu)
            .with_context("gpu", err.to_string())
    }
}

impl From<wgpu::Error> for GpuError {
    fn from(err: wgpu::Error) -> Self {
        match err {
            wgpu::Error::OutOfMemory { .. } => Self::OutOfMemory,
            other => Self::TextureCreation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_errors_fall_back_to_cpu() {
        let err: EnhancementError = GpuError::ShaderCompilation("bad".into()).into();
        assert_eq!(err.code, ErrorCode::ShaderCompilationFailed);
        assert_eq!(err.recovery_strategy, RecoveryStrategy::FallbackToCpu);
        assert!(err.context["gpu"].contains("bad"));

        let err: EnhancementError = GpuError::OutOfMemory.into();
        assert_eq!(err.code, ErrorCode::GpuMemoryExceeded);
        assert_eq!(err.recovery_strategy, RecoveryStrategy::FallbackToCpu);
    }
}
