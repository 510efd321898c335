//! Resources owned by one pipeline session.

use crate::fallback::{GpuFallbackManager, GpuState};
use clipfix_audio::{AudioProcessor, AudioRenderContext};
use clipfix_color::{correct_frame, ColorAdjustment};
use clipfix_core::{EnhancementError, FrameData, ProcessingBackend, Result};
use clipfix_gpu::GpuColorRenderer;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Owned RGBA drawing surface frames are staged on before analysis.
#[derive(Debug, Clone)]
pub struct Surface2d {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; FrameData::byte_len(width, height)],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Draw a frame, resizing the surface to match it.
    pub fn draw(&mut self, frame: &FrameData) {
        self.width = frame.width;
        self.height = frame.height;
        self.pixels.clear();
        self.pixels.extend_from_slice(&frame.pixels);
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn snapshot(&self) -> Result<FrameData> {
        FrameData::new(self.pixels.clone(), self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// Surface, optional GPU renderer, and optional audio context for a session.
pub struct ProcessingContext {
    surface: Surface2d,
    gpu: Option<GpuColorRenderer>,
    audio: Option<AudioProcessor>,
    fallback: GpuFallbackManager,
    disposed: bool,
}

/// The single handle shared by a session's frame and video processors.
pub type SharedContext = Arc<Mutex<ProcessingContext>>;

impl ProcessingContext {
    pub fn new(
        gpu: Option<GpuColorRenderer>,
        audio: Option<AudioRenderContext>,
        fallback: GpuFallbackManager,
    ) -> Self {
        let mut fallback = fallback;
        if gpu.is_none() {
            fallback.fall_back("no GPU renderer");
        }
        Self {
            surface: Surface2d::new(0, 0),
            gpu,
            audio: audio.map(AudioProcessor::new),
            fallback,
            disposed: false,
        }
    }

    /// CPU-only context without audio.
    pub fn cpu_only() -> Self {
        Self::new(None, None, GpuFallbackManager::cpu_only())
    }

    pub fn into_shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }

    pub fn surface(&self) -> &Surface2d {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface2d {
        &mut self.surface
    }

    pub fn use_gpu(&self) -> bool {
        self.gpu.is_some() && self.fallback.is_gpu_active()
    }

    pub fn gpu_state(&self) -> GpuState {
        self.fallback.state()
    }

    pub fn fallback(&self) -> &GpuFallbackManager {
        &self.fallback
    }

    pub fn audio(&self) -> Option<&AudioProcessor> {
        self.audio.as_ref()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Switch to CPU for the rest of the session and free GPU resources.
    pub fn disable_gpu(&mut self, reason: &str) {
        self.fallback.fall_back(reason);
        if let Some(mut renderer) = self.gpu.take() {
            renderer.release();
        }
    }

    /// Color-correct a frame on the GPU when active, otherwise on the CPU.
    ///
    /// A GPU failure closes the GPU path and the frame is redone on the
    /// CPU; the failure is returned alongside so it can be recorded.
    pub fn color_correct(
        &mut self,
        frame: &FrameData,
        adjustment: &ColorAdjustment,
    ) -> Result<(FrameData, ProcessingBackend, Option<EnhancementError>)> {
        let mut gpu_error = None;
        if self.fallback.is_gpu_active() {
            if let Some(renderer) = self.gpu.as_mut() {
                let fits = renderer.context().capabilities().supports(frame.width, frame.height);
                if fits {
                    match renderer.render(frame, adjustment) {
                        Ok(out) => {
                            self.fallback.record(ProcessingBackend::Gpu);
                            return Ok((out, ProcessingBackend::Gpu, None));
                        }
                        Err(e) => {
                            let reason = e.to_string();
                            gpu_error = Some(EnhancementError::from(e));
                            self.disable_gpu(&reason);
                        }
                    }
                } else {
                    debug!(width = frame.width, height = frame.height, "frame too large for GPU");
                }
            }
        }
        let out = correct_frame(frame, adjustment)?;
        self.fallback.record(ProcessingBackend::Cpu);
        Ok((out, ProcessingBackend::Cpu, gpu_error))
    }

    /// Release GPU resources and close the audio context.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(mut renderer) = self.gpu.take() {
            renderer.release();
        }
        if let Some(mut audio) = self.audio.take() {
            audio.context_mut().close();
        }
        self.surface = Surface2d::new(0, 0);
        self.disposed = true;
        info!("Processing context disposed");
    }
}

impl Drop for ProcessingContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
