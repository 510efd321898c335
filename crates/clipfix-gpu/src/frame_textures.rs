//! Source and target textures sized to the clip being rendered.
//!
//! Frames of one clip share dimensions, so one pair is kept and rebuilt
//! only when a frame of a different size arrives.

use crate::texture::GpuTexture;

struct TexturePair {
    source: GpuTexture,
    target: GpuTexture,
}

#[derive(Default)]
pub struct FrameTextures {
    pair: Option<TexturePair>,
    rebuilds: u64,
}

impl FrameTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the pair matches `width` x `height`.
    pub fn prepare(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.matches(width, height) {
            return;
        }
        if let Some(old) = &self.pair {
            tracing::debug!(
                from_width = old.source.width,
                from_height = old.source.height,
                width,
                height,
                "frame size changed, rebuilding textures"
            );
        }
        self.pair = Some(TexturePair {
            source: GpuTexture::for_frame(device, width, height),
            target: GpuTexture::render_target(device, width, height),
        });
        self.rebuilds += 1;
    }

    fn matches(&self, width: u32, height: u32) -> bool {
        self.pair
            .as_ref()
            .is_some_and(|p| p.source.width == width && p.source.height == height)
    }

    /// The prepared (source, target) pair.
    pub fn pair(&self) -> Option<(&GpuTexture, &GpuTexture)> {
        self.pair.as_ref().map(|p| (&p.source, &p.target))
    }

    /// Times a pair had to be (re)built.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn memory_usage(&self) -> usize {
        self.pair
            .as_ref()
            .map_or(0, |p| p.source.memory_size() + p.target.memory_size())
    }

    pub fn clear(&mut self) {
        if let Some(pair) = self.pair.take() {
            pair.source.texture.destroy();
            pair.target.texture.destroy();
        }
    }
}
