//! Inverse-mapped bilinear warp for stabilization transforms.

use clipfix_core::{
    EnhancementError, ErrorCode, FrameData, Result, StabilizationTransform, BYTES_PER_PIXEL,
};
use glam::Vec2;

const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

/// Warp an RGBA8 buffer. Each destination pixel is mapped back through the
/// transform around the frame center; out-of-bounds samples are opaque black.
///
/// Fails with `InvalidDimensions` when `pixels` is not `width * height * 4` bytes.
pub fn warp_pixels(
    pixels: &[u8],
    width: u32,
    height: u32,
    transform: &StabilizationTransform,
) -> Result<Vec<u8>> {
    if pixels.len() != FrameData::byte_len(width, height) {
        return Err(EnhancementError::invalid_dimensions(width, height, pixels.len()));
    }
    if transform.is_identity() || width == 0 || height == 0 {
        return Ok(pixels.to_vec());
    }

    let (w, h) = (width as usize, height as usize);
    let center = Vec2::new(width as f32 / 2.0, height as f32 / 2.0);
    let translation = transform.translation();
    let inv_scale = 1.0 / transform.scale;
    let (max_x, max_y) = ((w - 1) as f32, (h - 1) as f32);

    let mut out = vec![0u8; pixels.len()];
    for y in 0..h {
        for x in 0..w {
            let dest = Vec2::new(x as f32, y as f32);
            let src = (dest - center) * inv_scale + center - translation;
            let i = (y * w + x) * BYTES_PER_PIXEL;

            if src.x < 0.0 || src.y < 0.0 || src.x > max_x || src.y > max_y {
                out[i..i + 4].copy_from_slice(&OPAQUE_BLACK);
                continue;
            }
            out[i..i + 4].copy_from_slice(&bilinear(pixels, w, h, src));
        }
    }
    Ok(out)
}

fn bilinear(pixels: &[u8], w: usize, h: usize, p: Vec2) -> [u8; 4] {
    let x0 = p.x.floor() as usize;
    let y0 = p.y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = p.x - x0 as f32;
    let fy = p.y - y0 as f32;

    let at = |x: usize, y: usize, c: usize| pixels[(y * w + x) * BYTES_PER_PIXEL + c] as f32;

    let mut px = [0u8; 4];
    for (c, out) in px.iter_mut().enumerate() {
        let top = at(x0, y0, c) * (1.0 - fx) + at(x1, y0, c) * fx;
        let bottom = at(x0, y1, c) * (1.0 - fx) + at(x1, y1, c) * fx;
        *out = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    px
}

/// Apply a stabilization transform to a frame. Dimensions are preserved.
pub fn apply_stabilization(
    frame: &FrameData,
    transform: &StabilizationTransform,
) -> Result<FrameData> {
    let valid = [transform.translate_x, transform.translate_y, transform.scale]
        .iter()
        .all(|v| v.is_finite())
        && transform.scale > 0.0;
    if !valid {
        return Err(EnhancementError::new(ErrorCode::StabilizationFailed)
            .with_context("scale", transform.scale)
            .with_context("translate_x", transform.translate_x)
            .with_context("translate_y", transform.translate_y));
    }
    frame.with_pixels(warp_pixels(
        &frame.pixels,
        frame.width,
        frame.height,
        transform,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_copy() {
        let frame = FrameData::test_pattern(16, 8);
        let out = apply_stabilization(&frame, &StabilizationTransform::IDENTITY).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn integer_shift_moves_pixels_and_fills_black() {
        let mut frame = FrameData::solid(4, 1, [10, 10, 10, 255]);
        frame.pixels[0..4].copy_from_slice(&[200, 0, 0, 255]);
        let t = StabilizationTransform {
            translate_x: 1.0,
            ..StabilizationTransform::IDENTITY
        };
        let out = apply_stabilization(&frame, &t).unwrap();
        assert_eq!(&out.pixels[0..4], &OPAQUE_BLACK);
        assert_eq!(&out.pixels[4..8], &[200, 0, 0, 255]);
        assert_eq!(out.pixels.len(), frame.pixels.len());
    }

    #[test]
    fn scale_preserves_dimensions() {
        let frame = FrameData::test_pattern(33, 17);
        let t = StabilizationTransform {
            translate_x: 2.5,
            translate_y: -1.25,
            scale: 1.05,
            rotation: 0.0,
        };
        let out = apply_stabilization(&frame, &t).unwrap();
        assert_eq!((out.width, out.height), (frame.width, frame.height));
        assert_eq!(out.pixels.len(), frame.pixels.len());
        assert_eq!(out.timestamp, frame.timestamp);
    }

    #[test]
    fn half_pixel_shift_interpolates() {
        let mut frame = FrameData::solid(2, 1, [0, 0, 0, 255]);
        frame.pixels[4..8].copy_from_slice(&[100, 100, 100, 255]);
        let t = StabilizationTransform {
            translate_x: -0.5,
            ..StabilizationTransform::IDENTITY
        };
        let out = apply_stabilization(&frame, &t).unwrap();
        assert_eq!(out.pixels[0], 50);
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let frame = FrameData::solid(2, 2, [0, 0, 0, 255]);
        let t = StabilizationTransform {
            scale: 0.0,
            ..StabilizationTransform::IDENTITY
        };
        let err = apply_stabilization(&frame, &t).unwrap_err();
        assert_eq!(err.code, ErrorCode::StabilizationFailed);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let t = StabilizationTransform {
            translate_x: 1.0,
            ..StabilizationTransform::IDENTITY
        };
        let err = warp_pixels(&[0u8; 12], 2, 2, &t).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDimensions);
        assert!(warp_pixels(&[0u8; 20], 2, 2, &StabilizationTransform::IDENTITY).is_err());
        assert_eq!(warp_pixels(&[7u8; 16], 2, 2, &t).unwrap().len(), 16);
    }
}
