//! Frame and audio buffers handed between pipeline stages.
//!
//! Both types follow copy-on-write discipline: stages read the input and
//! return a new buffer, never mutating what they were given.

use crate::error::{EnhancementError, ErrorCode, Result};
use serde::{Deserialize, Serialize};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// One video frame as tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    /// Pixel data, `width * height * 4` bytes, row-major, no padding.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Presentation time in seconds.
    pub timestamp: f64,
    /// Index of the frame within its source.
    pub index: u64,
}

impl FrameData {
    /// Wrap an RGBA8 buffer, checking that it matches the dimensions.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != Self::byte_len(width, height) {
            return Err(EnhancementError::invalid_dimensions(
                width,
                height,
                pixels.len(),
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            timestamp: 0.0,
            index: 0,
        })
    }

    /// Attach timing information.
    pub fn at(mut self, timestamp: f64, index: u64) -> Self {
        self.timestamp = timestamp;
        self.index = index;
        self
    }

    /// Expected byte length for the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self {
            pixels,
            width,
            height,
            timestamp: 0.0,
            index: 0,
        }
    }

    /// Create a test pattern frame (color bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255], // White
            [255, 255, 0, 255],   // Yellow
            [0, 255, 255, 255],   // Cyan
            [0, 255, 0, 255],     // Green
            [255, 0, 255, 255],   // Magenta
            [255, 0, 0, 255],     // Red
            [0, 0, 255, 255],     // Blue
            [0, 0, 0, 255],       // Black
        ];
        let mut frame = Self::solid(width, height, [0, 0, 0, 255]);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let bar = x * 8 / width as usize;
                let i = (y * width as usize + x) * BYTES_PER_PIXEL;
                frame.pixels[i..i + 4].copy_from_slice(&BARS[bar]);
            }
        }
        frame
    }

    /// A new frame with the same metadata and different pixels.
    ///
    /// The replacement buffer must have the same length.
    pub fn with_pixels(&self, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != self.pixels.len() {
            return Err(EnhancementError::invalid_dimensions(
                self.width,
                self.height,
                pixels.len(),
            ));
        }
        Ok(Self {
            pixels,
            width: self.width,
            height: self.height,
            timestamp: self.timestamp,
            index: self.index,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Memory used by the pixel buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }

    /// RGBA value at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// A block of multi-channel audio as planar f32 samples in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChunk {
    /// One buffer per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Wrap planar channel data, checking that the layout is consistent.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() || sample_rate == 0 {
            return Err(EnhancementError::new(ErrorCode::InvalidInput)
                .with_context("channels", channels.len())
                .with_context("sample_rate", sample_rate));
        }
        let frame_length = channels[0].len();
        if channels.iter().any(|c| c.len() != frame_length) {
            return Err(EnhancementError::new(ErrorCode::InvalidInput)
                .with_context("reason", "channel lengths differ"));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Zero-filled audio.
    pub fn silent(channel_count: usize, sample_rate: u32, frame_length: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frame_length]; channel_count.max(1)],
            sample_rate,
        }
    }

    /// De-interleave a packed buffer.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 || samples.len() % channel_count != 0 {
            return Err(EnhancementError::new(ErrorCode::InvalidInput)
                .with_context("samples", samples.len())
                .with_context("channels", channel_count));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Re-interleave into a packed buffer.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let n = self.frame_length();
        let mut out = Vec::with_capacity(n * self.channel_count());
        for i in 0..n {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frame_length(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_length() as f64 / self.sample_rate as f64
    }

    /// A new chunk with the same sample rate, produced by mapping every channel.
    pub fn map_channels(&self, mut f: impl FnMut(&[f32]) -> Vec<f32>) -> Self {
        Self {
            channels: self.channels.iter().map(|c| f(c.as_slice())).collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Iterate over every sample of every channel.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.channels.iter().flat_map(|c| c.iter().copied())
    }
}
