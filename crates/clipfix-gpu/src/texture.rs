//! GPU texture management.

use crate::error::GpuError;
use crate::program::TARGET_FORMAT;
use clipfix_core::{FrameData, BYTES_PER_PIXEL};

/// A GPU texture that can hold one RGBA8 frame.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Texture the source frame is uploaded into.
    pub fn for_frame(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::new(
            device,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            Some("Frame Texture"),
        )
    }

    /// Texture a program renders into and is read back from.
    pub fn render_target(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::new(
            device,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            Some("Render Target"),
        )
    }

    pub fn upload_frame(&self, queue: &wgpu::Queue, frame: &FrameData) -> Result<(), GpuError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(GpuError::TextureCreation(format!(
                "Frame size {}x{} doesn't match texture size {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width * BYTES_PER_PIXEL as u32),
                rows_per_image: Some(self.height),
            },
            extent(self.width, self.height),
        );

        Ok(())
    }

    /// Copy the texture back into a tightly packed RGBA8 buffer.
    pub fn read_back(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>, GpuError> {
        let row_bytes = self.width * BYTES_PER_PIXEL as u32;
        let padded_row = padded_bytes_per_row(row_bytes);

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_readback"),
            size: padded_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            extent(self.width, self.height),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((row_bytes * self.height) as usize);
        for row in mapped.chunks(padded_row as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(mapped);
        staging.unmap();

        Ok(pixels)
    }

    /// Memory usage estimate in bytes.
    pub fn memory_size(&self) -> usize {
        FrameData::byte_len(self.width, self.height)
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Row pitch rounded up to the copy alignment.
pub fn padded_bytes_per_row(row_bytes: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    row_bytes.div_ceil(align) * align
}
