//! GPU color-correction renderer.

use crate::context::GpuContext;
use crate::error::GpuError;
use crate::frame_textures::FrameTextures;
use crate::program::{build_program, compile_error, Program, ProgramSource};
use bytemuck::{Pod, Zeroable};
use clipfix_color::ColorAdjustment;
use clipfix_core::FrameData;
use std::sync::Arc;
use tracing::{debug, trace};

pub const COLOR_PROGRAM: ProgramSource = ProgramSource {
    name: "color_correct",
    wgsl: include_str!("shaders/color_correct.wgsl"),
    uniform_size: std::mem::size_of::<ColorParams>() as u64,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ColorParams {
    pub knobs: [f32; 4],
}

impl From<&ColorAdjustment> for ColorParams {
    fn from(adj: &ColorAdjustment) -> Self {
        Self {
            knobs: adj.normalized(),
        }
    }
}

/// Renders color correction for one session. Owns its textures; the
/// compiled program lives in the shared context.
pub struct GpuColorRenderer {
    ctx: Arc<GpuContext>,
    textures: FrameTextures,
    uniforms: wgpu::Buffer,
    released: bool,
}

impl GpuColorRenderer {
    /// Create a renderer and compile the color program if the context
    /// does not have it yet.
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self, GpuError> {
        ensure_program(&ctx)?;
        let uniforms = ctx
            .scoped(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("color_params"),
                    size: COLOR_PROGRAM.uniform_size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .map_err(GpuError::from)?;
        Ok(Self {
            ctx,
            textures: FrameTextures::new(),
            uniforms,
            released: false,
        })
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Whether this renderer can take a frame of the given size.
    pub fn supports(&self, width: u32, height: u32) -> bool {
        !self.released && !self.ctx.is_lost() && self.ctx.capabilities().supports(width, height)
    }

    /// Color-correct a frame on the GPU. The input is not modified.
    pub fn render(
        &mut self,
        frame: &FrameData,
        adjustment: &ColorAdjustment,
    ) -> Result<FrameData, GpuError> {
        if self.released {
            return Err(GpuError::Released);
        }
        if self.ctx.is_lost() {
            return Err(GpuError::ContextLost("context marked lost".into()));
        }
        let (width, height) = (frame.width, frame.height);
        let max = self.ctx.capabilities().max_texture_dimension;
        if !self.ctx.capabilities().supports(width, height) {
            return Err(GpuError::FrameTooLarge { width, height, max });
        }

        let program = ensure_program(&self.ctx)?;
        trace!(width, height, "GPU color pass");

        let ctx = Arc::clone(&self.ctx);
        let textures = &mut self.textures;
        ctx.scoped(|device| textures.prepare(device, width, height))?;
        let Some((source, target)) = self.textures.pair() else {
            return Err(GpuError::TextureCreation("frame textures missing".into()));
        };

        source.upload_frame(&ctx.queue, frame)?;
        ctx.queue.write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&ColorParams::from(adjustment)),
        );

        ctx.scoped(|device| {
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("color_bind_group"),
                layout: &program.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.uniforms.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("color_encoder"),
            });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("color_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(&program.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
            ctx.queue.submit(std::iter::once(encoder.finish()));
        })?;

        let pixels = target.read_back(&ctx.device, &ctx.queue)?;

        if self.ctx.is_lost() {
            return Err(GpuError::ContextLost("lost during render".into()));
        }

        frame
            .with_pixels(pixels)
            .map_err(|e| GpuError::Readback(e.to_string()))
    }

    /// Destroy the frame textures. Further renders fail with [`GpuError::Released`].
    pub fn release(&mut self) {
        if !self.released {
            debug!(
                texture_bytes = self.textures.memory_usage(),
                rebuilds = self.textures.rebuilds(),
                "Releasing GPU color renderer"
            );
            self.textures.clear();
            self.uniforms.destroy();
            self.released = true;
        }
    }
}

impl Drop for GpuColorRenderer {
    fn drop(&mut self) {
        self.release();
    }
}

fn ensure_program(ctx: &GpuContext) -> Result<Arc<Program>, GpuError> {
    let mut programs = ctx.programs().lock();
    if let Some(program) = programs.get(COLOR_PROGRAM.name) {
        return Ok(program);
    }
    let program = ctx
        .scoped(|device| build_program(device, &COLOR_PROGRAM))
        .map_err(compile_error)?;
    Ok(programs.insert(program))
}
