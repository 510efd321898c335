//! ClipFix Pipeline - Orchestration and resilience
//!
//! Architecture:
//! - `ProcessingContext`: surface, GPU renderer, and audio context owned by one session
//! - `FrameProcessor` / `VideoProcessor`: per-frame enhancement and GPU/CPU routing
//! - `EnhancementPipeline`: lifecycle, analysis, preview, full-clip enhancement
//! - `ErrorHandler`, `MemoryManager`, `GpuFallbackManager`: failure handling
//! - Presets and the `FrameSource` / `Encoder` collaborator traits

pub mod context;
pub mod error_handler;
pub mod fallback;
pub mod frame;
pub mod memory;
pub mod options;
pub mod pipeline;
pub mod presets;
pub mod source;
pub mod video;

pub use context::{ProcessingContext, SharedContext, Surface2d};
pub use error_handler::{classify, to_enhancement_error, ErrorHandler, ErrorRecord};
pub use fallback::{GpuFallbackManager, GpuState};
pub use frame::{FrameOutcome, FrameProcessor};
pub use memory::MemoryManager;
pub use options::{AnalyzeOptions, PipelineOptions};
pub use pipeline::{EnhancementPipeline, ErrorState, PipelineState, Preview, VideoAnalysis};
pub use presets::{EnhancementPreset, JsonPresetStore, PresetStore};
pub use source::{Encoder, FrameSource};
pub use video::{FrameAnalysis, ProcessedFrame, VideoProcessor};
