//! Collaborators the pipeline drives but does not implement.

use clipfix_core::{AudioChunk, FrameData, MotionVector, Result};
use std::future::Future;

/// A seekable video that can hand back its current frame.
pub trait FrameSource {
    /// Clip length in seconds.
    fn duration(&self) -> f64;

    fn frame_rate(&self) -> f64;

    fn dimensions(&self) -> (u32, u32);

    /// Move to `timestamp` seconds. Resolves once the frame at that time is
    /// current. Callers bound this with a timeout.
    fn seek(&mut self, timestamp: f64) -> impl Future<Output = Result<()>> + Send;

    fn current_frame(&self) -> Result<FrameData>;

    /// Precomputed global motion of frame `index`, if the source has it.
    fn motion_at(&self, _index: u64) -> Option<MotionVector> {
        None
    }
}

/// Accepts processed media and produces the final container.
pub trait Encoder {
    fn push_frame(&mut self, frame: &FrameData) -> Result<()>;

    fn push_audio(&mut self, chunk: &AudioChunk) -> Result<()>;

    fn finish(&mut self) -> Result<Vec<u8>>;
}
