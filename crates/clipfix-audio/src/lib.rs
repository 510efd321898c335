//! ClipFix Audio - Audio enhancement chain
//!
//! Architecture:
//! - `Biquad`: RBJ filter sections shared by every stage
//! - Stages: `NoiseReduction`, `EchoCancellation`, `VoiceEnhancement`,
//!   `VolumeNormalization`, each an `AudioStage`
//! - `AudioRenderContext`: offline render state for a session
//! - `AudioProcessor`: runs enabled stages in a fixed order

pub mod analysis;
pub mod biquad;
pub mod context;
pub mod echo;
pub mod noise;
pub mod processor;
pub mod stage;
pub mod voice;
pub mod volume;

pub use analysis::{analyze, noise_reduction_db, AudioAnalysis};
pub use biquad::Biquad;
pub use context::{AudioContextState, AudioRenderContext};
pub use echo::{estimate_echo_reduction, EchoCancellation};
pub use noise::NoiseReduction;
pub use processor::{AudioOutcome, AudioProcessor, AudioStageMetrics, STAGE_ORDER};
pub use stage::AudioStage;
pub use voice::VoiceEnhancement;
pub use volume::VolumeNormalization;
