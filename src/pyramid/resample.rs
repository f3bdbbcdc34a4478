//! Bilinear resampling of interleaved 8-bit samples
//!
//! Used both to build pyramid levels and to sample a level at a requested
//! scale with a sub-pixel offset.

use image::RgbaImage;

use crate::mask::{sample_bilinear, to_u8};

/// Resize to exactly `dst_width` x `dst_height`, aligning pixel centres
pub fn resize_samples(
    src: &[u8],
    src_width: usize,
    src_height: usize,
    channels: usize,
    dst_width: usize,
    dst_height: usize,
) -> Vec<u8> {
    if src_width == dst_width && src_height == dst_height {
        return src.to_vec();
    }

    let x_ratio = src_width as f64 / dst_width.max(1) as f64;
    let y_ratio = src_height as f64 / dst_height.max(1) as f64;
    let mut dst = vec![0u8; dst_width * dst_height * channels];
    let mut sample = vec![0.0; channels];

    for dy in 0..dst_height {
        let sy = (dy as f64 + 0.5) * y_ratio - 0.5;
        for dx in 0..dst_width {
            let sx = (dx as f64 + 0.5) * x_ratio - 0.5;
            sample_bilinear(src, src_width, src_height, channels, sx, sy, &mut sample);
            let base = (dy * dst_width + dx) * channels;
            for (c, value) in sample.iter().enumerate() {
                dst[base + c] = to_u8(*value);
            }
        }
    }

    dst
}

/// Sampling parameters for one dab
#[derive(Debug, Clone, Copy)]
pub struct ScaleParams {
    /// Level size relative to the source brush
    pub level_x_scale: f64,
    pub level_y_scale: f64,
    /// Requested size relative to the source brush
    pub scale_x: f64,
    pub scale_y: f64,
    pub sub_pixel_x: f64,
    pub sub_pixel_y: f64,
}

/// Sample a level into a `dst_width` x `dst_height` dab
///
/// Destination pixel (x, y) reads the level at
/// `(x - sub_pixel_x + 0.5) * level_scale / scale - 0.5`; samples outside the
/// level are transparent.
pub fn scale_samples(
    src: &[u8],
    src_width: usize,
    src_height: usize,
    channels: usize,
    params: ScaleParams,
    dst_width: usize,
    dst_height: usize,
) -> Vec<u8> {
    let x_ratio = params.level_x_scale / params.scale_x;
    let y_ratio = params.level_y_scale / params.scale_y;
    let mut dst = vec![0u8; dst_width * dst_height * channels];
    let mut sample = vec![0.0; channels];

    for dy in 0..dst_height {
        let sy = (dy as f64 - params.sub_pixel_y + 0.5) * y_ratio - 0.5;
        for dx in 0..dst_width {
            let sx = (dx as f64 - params.sub_pixel_x + 0.5) * x_ratio - 0.5;
            sample_bilinear(src, src_width, src_height, channels, sx, sy, &mut sample);
            let base = (dy * dst_width + dx) * channels;
            for (c, value) in sample.iter().enumerate() {
                dst[base + c] = to_u8(*value);
            }
        }
    }

    dst
}

/// Render a single source pixel below its 1x1 size
///
/// The pixel is spread over a 2x2 dab according to the sub-pixel offset and its
/// coverage is scaled by `s * s`, so total energy follows the area.
pub fn single_pixel_samples(value: &[u8], s: f64, sub_pixel_x: f64, sub_pixel_y: f64) -> Vec<u8> {
    let channels = value.len();
    let a = sub_pixel_x;
    let b = sub_pixel_y;
    let mut dst = vec![0u8; 4 * channels];

    for y in 0..2usize {
        for x in 0..2usize {
            let top_left = x > 0 && y > 0;
            let bottom_left = x > 0 && y < 1;
            let top_right = x < 1 && y > 0;
            let bottom_right = x < 1 && y < 1;

            for (c, &v) in value.iter().enumerate() {
                let v = v as f64;
                let pick = |on: bool| if on { v } else { 0.0 };
                let d = a * b * pick(top_left)
                    + a * (1.0 - b) * pick(bottom_left)
                    + (1.0 - a) * b * pick(top_right)
                    + (1.0 - a) * (1.0 - b) * pick(bottom_right);
                let d = to_u8(d) as f64;
                dst[(y * 2 + x) * channels + c] = to_u8(d * s * s);
            }
        }
    }

    dst
}

/// Multiply colour channels by alpha
pub fn premultiply(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let a = pixel[3] as u32;
        for c in 0..3 {
            pixel[c] = ((pixel[c] as u32 * a + 127) / 255) as u8;
        }
    }
    out
}

/// Divide colour channels by alpha; fully transparent pixels are left untouched
#[inline]
pub fn unpremultiply_pixel(pixel: [u8; 4]) -> [u8; 4] {
    let a = pixel[3] as u32;
    if a == 0 {
        return pixel;
    }
    let channel = |c: u8| ((c as u32 * 255) / a).min(255) as u8;
    [channel(pixel[0]), channel(pixel[1]), channel(pixel[2]), pixel[3]]
}

pub fn unpremultiply(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0 = unpremultiply_pixel(pixel.0);
    }
    out
}
