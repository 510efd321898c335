//! One-way GPU to CPU fallback for a session.

use clipfix_core::ProcessingBackend;
use clipfix_gpu::GpuCapabilities;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuState {
    GpuActive,
    CpuFallback,
}

/// Tracks which backend renders frames. The only transition is
/// `GpuActive -> CpuFallback`; a session never returns to the GPU.
#[derive(Debug, Clone)]
pub struct GpuFallbackManager {
    state: GpuState,
    capabilities: Option<GpuCapabilities>,
    reason: Option<String>,
    gpu_frames: u64,
    cpu_frames: u64,
}

impl GpuFallbackManager {
    /// Start on the GPU only when it is both allowed and detected.
    pub fn new(capabilities: Option<GpuCapabilities>, allowed: bool) -> Self {
        let (state, reason) = match (&capabilities, allowed) {
            (_, false) => (GpuState::CpuFallback, Some("GPU disabled by options".to_string())),
            (None, true) => (GpuState::CpuFallback, Some("no GPU adapter".to_string())),
            (Some(_), true) => (GpuState::GpuActive, None),
        };
        Self {
            state,
            capabilities,
            reason,
            gpu_frames: 0,
            cpu_frames: 0,
        }
    }

    /// CPU-only manager.
    pub fn cpu_only() -> Self {
        Self::new(None, false)
    }

    pub fn state(&self) -> GpuState {
        self.state
    }

    pub fn is_gpu_active(&self) -> bool {
        self.state == GpuState::GpuActive
    }

    pub fn capabilities(&self) -> Option<&GpuCapabilities> {
        self.capabilities.as_ref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Move to CPU for the rest of the session. Returns `true` if this call
    /// made the transition.
    pub fn fall_back(&mut self, reason: impl Into<String>) -> bool {
        if self.state == GpuState::CpuFallback {
            return false;
        }
        let reason = reason.into();
        warn!(%reason, "Falling back to CPU rendering");
        self.state = GpuState::CpuFallback;
        self.reason = Some(reason);
        info!(gpu_frames = self.gpu_frames, "GPU path closed for this session");
        true
    }

    pub fn record(&mut self, backend: ProcessingBackend) {
        match backend {
            ProcessingBackend::Gpu => self.gpu_frames += 1,
            ProcessingBackend::Cpu => self.cpu_frames += 1,
        }
    }

    pub fn frames_rendered(&self, backend: ProcessingBackend) -> u64 {
        match backend {
            ProcessingBackend::Gpu => self.gpu_frames,
            ProcessingBackend::Cpu => self.cpu_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> GpuCapabilities {
        GpuCapabilities {
            adapter_name: "test".into(),
            backend: "vulkan".into(),
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn starts_on_gpu_only_when_allowed_and_present() {
        assert!(GpuFallbackManager::new(Some(caps()), true).is_gpu_active());
        assert!(!GpuFallbackManager::new(Some(caps()), false).is_gpu_active());
        let none = GpuFallbackManager::new(None, true);
        assert_eq!(none.state(), GpuState::CpuFallback);
        assert_eq!(none.reason(), Some("no GPU adapter"));
    }

    #[test]
    fn fallback_is_one_way() {
        let mut fb = GpuFallbackManager::new(Some(caps()), true);
        fb.record(ProcessingBackend::Gpu);
        assert!(fb.fall_back("shader failed"));
        assert!(!fb.fall_back("again"));
        assert_eq!(fb.state(), GpuState::CpuFallback);
        assert_eq!(fb.reason(), Some("shader failed"));
        fb.record(ProcessingBackend::Cpu);
        assert_eq!(fb.frames_rendered(ProcessingBackend::Gpu), 1);
        assert_eq!(fb.frames_rendered(ProcessingBackend::Cpu), 1);
    }
}
