//! Frame color analysis: brightness, contrast, temperature, dominant colors.

use clipfix_core::FrameData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rec. 601 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// A dominant color bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Fraction of sampled pixels in this bucket.
    pub weight: f32,
}

/// Measurements taken from one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorAnalysis {
    /// Mean luminance, 0-255.
    pub brightness: f32,
    /// Standard deviation of luminance, 0-127.5.
    pub contrast: f32,
    /// Red/blue balance on a [-100, 100] scale, positive is warm.
    pub temperature: f32,
    /// Mean of each RGB channel, 0-255.
    pub average_rgb: [f32; 3],
    pub dominant_colors: Vec<DominantColor>,
}

/// Analyze an RGBA8 frame.
pub fn analyze(frame: &FrameData) -> ColorAnalysis {
    analyze_pixels(&frame.pixels)
}

/// Analyze a raw RGBA8 buffer.
pub fn analyze_pixels(pixels: &[u8]) -> ColorAnalysis {
    let (brightness, contrast) = luminance_stats(pixels);
    let average_rgb = channel_averages(pixels);
    ColorAnalysis {
        brightness,
        contrast,
        temperature: temperature_from_averages(average_rgb),
        average_rgb,
        dominant_colors: dominant_colors(pixels, 5),
    }
}

#[inline]
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Mean luminance of an RGBA8 buffer, 0-255.
pub fn average_luminance(pixels: &[u8]) -> f32 {
    luminance_stats(pixels).0
}

/// Mean and standard deviation of luminance.
pub fn luminance_stats(pixels: &[u8]) -> (f32, f32) {
    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    let mut count = 0u64;
    for px in pixels.chunks_exact(4) {
        let l = luminance(px[0] as f32, px[1] as f32, px[2] as f32) as f64;
        sum += l;
        sum_sq += l * l;
        count += 1;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (mean as f32, variance.sqrt() as f32)
}

/// Mean of each RGB channel, 0-255.
pub fn channel_averages(pixels: &[u8]) -> [f32; 3] {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for px in pixels.chunks_exact(4) {
        sums[0] += px[0] as u64;
        sums[1] += px[1] as u64;
        sums[2] += px[2] as u64;
        count += 1;
    }
    if count == 0 {
        return [0.0; 3];
    }
    sums.map(|s| (s as f64 / count as f64) as f32)
}

/// Map channel averages to the [-100, 100] temperature scale.
pub fn temperature_from_averages(avg: [f32; 3]) -> f32 {
    ((avg[0] - avg[2]) / 255.0 * 100.0).clamp(-100.0, 100.0)
}

/// Most frequent colors after quantizing to 4 levels per channel.
pub fn dominant_colors(pixels: &[u8], max_colors: usize) -> Vec<DominantColor> {
    let pixel_count = pixels.len() / 4;
    if pixel_count == 0 || max_colors == 0 {
        return Vec::new();
    }

    // Cap the sample at roughly 16k pixels
    let step = (pixel_count / 16_384).max(1);
    let mut buckets: HashMap<(u8, u8, u8), usize> = HashMap::new();
    let mut sampled = 0usize;
    for px in pixels.chunks_exact(4).step_by(step) {
        *buckets.entry((px[0] / 64, px[1] / 64, px[2] / 64)).or_insert(0) += 1;
        sampled += 1;
    }

    let mut sorted: Vec<_> = buckets.into_iter().collect();
    // Ties broken by bucket key so output is deterministic
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let total = sampled as f32;
    sorted
        .into_iter()
        .take(max_colors)
        .map(|((r, g, b), count)| DominantColor {
            r: r * 64 + 32,
            g: g * 64 + 32,
            b: b * 64 + 32,
            weight: count as f32 / total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_gray_stats() {
        let frame = FrameData::solid(8, 8, [128, 128, 128, 255]);
        let a = analyze(&frame);
        assert!((a.brightness - 128.0).abs() < 0.01);
        assert!(a.contrast < 0.01);
        assert!(a.temperature.abs() < 0.01);
        assert_eq!(a.dominant_colors.len(), 1);
        assert!((a.dominant_colors[0].weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn warm_frame_has_positive_temperature() {
        let frame = FrameData::solid(4, 4, [200, 120, 60, 255]);
        let a = analyze(&frame);
        assert!(a.temperature > 50.0);
    }

    #[test]
    fn contrast_of_black_and_white_split() {
        let mut frame = FrameData::solid(2, 1, [0, 0, 0, 255]);
        frame.pixels[4..8].copy_from_slice(&[255, 255, 255, 255]);
        let (mean, std) = luminance_stats(&frame.pixels);
        assert!((mean - 127.5).abs() < 0.01);
        assert!((std - 127.5).abs() < 0.01);
    }

    #[test]
    fn dominant_colors_sorted_by_weight() {
        let frame = FrameData::test_pattern(80, 4);
        let colors = dominant_colors(&frame.pixels, 3);
        assert_eq!(colors.len(), 3);
        assert!(colors.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn empty_buffer_is_neutral() {
        let a = analyze_pixels(&[]);
        assert_eq!(a.brightness, 0.0);
        assert!(a.dominant_colors.is_empty());
    }
}
