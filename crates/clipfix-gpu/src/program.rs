//! Compiled shader programs, keyed by name and built once per context.

use crate::error::GpuError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Render target format used by every program.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A full-screen render program: one sampled texture plus one uniform block.
pub struct Program {
    pub name: &'static str,
    pub pipeline: wgpu::RenderPipeline,
    pub layout: wgpu::BindGroupLayout,
}

/// Source for a [`Program`].
pub struct ProgramSource {
    pub name: &'static str,
    pub wgsl: &'static str,
    pub uniform_size: u64,
}

#[derive(Default)]
pub struct ProgramCache {
    programs: HashMap<&'static str, Arc<Program>>,
}

impl ProgramCache {
    pub fn get(&self, name: &str) -> Option<Arc<Program>> {
        self.programs.get(name).cloned()
    }

    pub fn insert(&mut self, program: Program) -> Arc<Program> {
        let program = Arc::new(program);
        self.programs.insert(program.name, Arc::clone(&program));
        program
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }
}

/// Compile a program. Errors from the device are reported by the caller's
/// error scope, so this only builds the objects.
pub fn build_program(device: &wgpu::Device, source: &ProgramSource) -> Program {
    debug!(program = source.name, "Compiling shader program");

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(source.name),
        source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(source.name),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(source.uniform_size),
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(source.name),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(source.name),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Program {
        name: source.name,
        pipeline,
        layout,
    }
}

/// Map a device error raised while compiling.
pub(crate) fn compile_error(err: wgpu::Error) -> GpuError {
    match err {
        wgpu::Error::OutOfMemory { .. } => GpuError::OutOfMemory,
        other => GpuError::ShaderCompilation(other.to_string()),
    }
}
