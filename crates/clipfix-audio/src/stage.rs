use clipfix_core::{AudioChunk, Enhancement, Result};

/// One step of the audio chain.
///
/// Stages read the input and return a new chunk with the same channel
/// count, length, and sample rate.
pub trait AudioStage {
    fn enhancement(&self) -> Enhancement;

    fn process(&self, chunk: &AudioChunk) -> Result<AudioChunk>;

    fn name(&self) -> &'static str {
        self.enhancement().display_name()
    }
}
