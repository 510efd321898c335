//! ClipFix GPU - wgpu-based color correction
//!
//! Mirrors the CPU engine in `clipfix-color` with a single fragment pass.
//! Every failure surfaces as [`GpuError`], which converts into a
//! pipeline error carrying the CPU fallback strategy.

pub mod color;
pub mod context;
pub mod error;
pub mod frame_textures;
pub mod program;
pub mod texture;

pub use color::{ColorParams, GpuColorRenderer};
pub use context::{GpuCapabilities, GpuContext};
pub use error::GpuError;
pub use texture::GpuTexture;
