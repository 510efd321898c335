//! Offline audio rendering context.

use clipfix_core::{AudioChunk, EnhancementError, ErrorCode, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioContextState {
    Running,
    Suspended,
    Closed,
}

/// Owns the audio side of a processing session. Rendering through a
/// suspended or closed context fails instead of silently passing audio.
#[derive(Debug)]
pub struct AudioRenderContext {
    sample_rate: u32,
    state: AudioContextState,
}

impl AudioRenderContext {
    pub fn try_new(sample_rate: u32) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(EnhancementError::new(ErrorCode::AudioContextFailed)
                .with_context("sample_rate", sample_rate));
        }
        info!(sample_rate, "Audio context created");
        Ok(Self {
            sample_rate,
            state: AudioContextState::Running,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> AudioContextState {
        self.state
    }

    pub fn suspend(&mut self) {
        if self.state == AudioContextState::Running {
            self.state = AudioContextState::Suspended;
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            AudioContextState::Closed => Err(EnhancementError::new(ErrorCode::AudioContextFailed)
                .with_context("state", "closed")),
            _ => {
                self.state = AudioContextState::Running;
                Ok(())
            }
        }
    }

    pub fn close(&mut self) {
        if self.state != AudioContextState::Closed {
            info!("Audio context closed");
            self.state = AudioContextState::Closed;
        }
    }

    pub fn ensure_running(&self) -> Result<()> {
        match self.state {
            AudioContextState::Running => Ok(()),
            AudioContextState::Suspended => Err(EnhancementError::new(ErrorCode::AudioContextSuspended)),
            AudioContextState::Closed => Err(EnhancementError::new(ErrorCode::AudioContextFailed)
                .with_context("state", "closed")),
        }
    }

    /// Reject input this context cannot render: a rate outside the supported
    /// range, a rate other than the context's own, or non-finite samples.
    pub fn check_input(&self, chunk: &AudioChunk) -> Result<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&chunk.sample_rate)
            || chunk.sample_rate != self.sample_rate
        {
            return Err(EnhancementError::new(ErrorCode::AudioDecodeFailed)
                .with_context("sample_rate", chunk.sample_rate)
                .with_context("expected", self.sample_rate));
        }
        if chunk.samples().any(|s| !s.is_finite()) {
            return Err(EnhancementError::new(ErrorCode::AudioDecodeFailed)
                .with_context("reason", "non-finite samples"));
        }
        Ok(())
    }

    /// Run one offline render over `chunk`. The whole render completes or fails.
    pub fn render(
        &self,
        chunk: &AudioChunk,
        f: impl FnOnce(&AudioChunk) -> Result<AudioChunk>,
    ) -> Result<AudioChunk> {
        self.ensure_running()?;
        self.check_input(chunk)?;
        debug!(
            frames = chunk.frame_length(),
            channels = chunk.channel_count(),
            "offline render"
        );
        let out = f(chunk)?;
        if out.channel_count() != chunk.channel_count()
            || out.frame_length() != chunk.frame_length()
            || out.sample_rate != chunk.sample_rate
        {
            return Err(EnhancementError::new(ErrorCode::AudioProcessingFailed)
                .with_context("reason", "render changed buffer shape"));
        }
        Ok(out)
    }
}

impl Drop for AudioRenderContext {
    fn drop(&mut self) {
        self.close();
    }
}
