//! GPU context management.

use crate::error::GpuError;
use crate::program::ProgramCache;
use clipfix_core::memory_budget::MAX_TEXTURE_DIMENSION;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// What the adapter can do, as far as the pipeline cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuCapabilities {
    pub adapter_name: String,
    pub backend: String,
    pub max_texture_dimension: u32,
}

impl GpuCapabilities {
    /// Probe for an adapter without creating a device.
    pub fn probe() -> Option<Self> {
        let instance = create_instance();
        let adapter = pollster::block_on(request_adapter(&instance))?;
        Some(Self::from_adapter(&adapter, adapter.limits().max_texture_dimension_2d))
    }

    fn from_adapter(adapter: &wgpu::Adapter, max_dim: u32) -> Self {
        let info = adapter.get_info();
        Self {
            adapter_name: info.name,
            backend: format!("{:?}", info.backend),
            max_texture_dimension: max_dim.min(MAX_TEXTURE_DIMENSION),
        }
    }

    /// Whether a frame of this size fits in a single texture.
    pub fn supports(&self, width: u32, height: u32) -> bool {
        width > 0
            && height > 0
            && width <= self.max_texture_dimension
            && height <= self.max_texture_dimension
    }
}

fn create_instance() -> wgpu::Instance {
    #[cfg(target_os = "macos")]
    let backends = wgpu::Backends::METAL;
    #[cfg(not(target_os = "macos"))]
    let backends = wgpu::Backends::PRIMARY | wgpu::Backends::GL;

    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

async fn request_adapter(instance: &wgpu::Instance) -> Option<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
}

/// GPU context holding device, queue, and compiled programs.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    capabilities: GpuCapabilities,
    programs: Mutex<ProgramCache>,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    pub async fn new() -> Result<Self, GpuError> {
        let instance = create_instance();
        let adapter = request_adapter(&instance)
            .await
            .ok_or(GpuError::NoAdapter)?;

        info!(adapter = ?adapter.get_info().name, "Using GPU adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("ClipFix Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            flag.store(true, Ordering::SeqCst);
            warn!(?reason, %message, "GPU device lost");
        });

        let capabilities =
            GpuCapabilities::from_adapter(&adapter, device.limits().max_texture_dimension_2d);

        Ok(Self {
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            capabilities,
            programs: Mutex::new(ProgramCache::default()),
            lost,
        })
    }

    /// Create a new GPU context (blocking version).
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    /// Check if an adapter exists without creating a device.
    pub fn is_available() -> bool {
        GpuCapabilities::probe().is_some()
    }

    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Flag the context as unusable.
    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    pub(crate) fn programs(&self) -> &Mutex<ProgramCache> {
        &self.programs
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    pub(crate) fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, wgpu::Error> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        match oom.or(validation) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}
