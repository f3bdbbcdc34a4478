//! Dab pixel buffers
//!
//! A dab is a small buffer in a caller-chosen [`ColorSpace`] whose alpha channel
//! carries the brush mask. Colour comes from a [`ColoringSource`]: one plain
//! colour, or a device streamed pixel by pixel.

mod coloring;

pub use coloring::{ColoringSource, DeviceColoring, PlainColoring};

use serde::{Deserialize, Serialize};

use crate::mask::{mul_u8, PixelMask, OPACITY_OPAQUE};

/// Supported 8-bit pixel layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorSpace {
    Rgba8,
    Bgra8,
    Alpha8,
}

impl ColorSpace {
    pub fn pixel_size(&self) -> usize {
        match self {
            ColorSpace::Rgba8 | ColorSpace::Bgra8 => 4,
            ColorSpace::Alpha8 => 1,
        }
    }

    pub fn alpha_offset(&self) -> usize {
        match self {
            ColorSpace::Rgba8 | ColorSpace::Bgra8 => 3,
            ColorSpace::Alpha8 => 0,
        }
    }

    /// Encode a straight RGBA pixel into this layout
    pub fn encode_rgba(&self, rgba: [u8; 4], dst: &mut [u8]) {
        match self {
            ColorSpace::Rgba8 => dst[..4].copy_from_slice(&rgba),
            ColorSpace::Bgra8 => dst[..4].copy_from_slice(&[rgba[2], rgba[1], rgba[0], rgba[3]]),
            ColorSpace::Alpha8 => dst[0] = rgba[3],
        }
    }

    /// Decode a pixel of this layout into straight RGBA
    pub fn decode_rgba(&self, src: &[u8]) -> [u8; 4] {
        match self {
            ColorSpace::Rgba8 => [src[0], src[1], src[2], src[3]],
            ColorSpace::Bgra8 => [src[2], src[1], src[0], src[3]],
            ColorSpace::Alpha8 => [0, 0, 0, src[0]],
        }
    }
}

/// Row-major pixel buffer in a fixed colour space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    color_space: ColorSpace,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Zero-filled buffer (fully transparent)
    pub fn new(width: usize, height: usize, color_space: ColorSpace) -> Self {
        Self {
            width,
            height,
            color_space,
            data: vec![0; width * height * color_space.pixel_size()],
        }
    }

    pub fn from_raw(
        width: usize,
        height: usize,
        color_space: ColorSpace,
        data: Vec<u8>,
    ) -> Option<Self> {
        if data.len() != width * height * color_space.pixel_size() {
            return None;
        }
        Some(Self {
            width,
            height,
            color_space,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn row_stride(&self) -> usize {
        self.width * self.color_space.pixel_size()
    }

    /// Pixel bytes at (x, y), `None` outside the buffer
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let size = self.color_space.pixel_size();
        let start = (y * self.width + x) * size;
        Some(&self.data[start..start + size])
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let size = self.color_space.pixel_size();
        let start = (y * self.width + x) * size;
        Some(&mut self.data[start..start + size])
    }

    pub fn alpha_at(&self, x: usize, y: usize) -> u8 {
        self.pixel(x, y)
            .map(|p| p[self.color_space.alpha_offset()])
            .unwrap_or(0)
    }

    /// Extract the alpha channel
    pub fn to_mask(&self) -> PixelMask {
        let size = self.color_space.pixel_size();
        let offset = self.color_space.alpha_offset();
        let data = self.data.chunks_exact(size).map(|p| p[offset]).collect();
        PixelMask::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| PixelMask::new(self.width, self.height))
    }

    /// Make every pixel opaque and copy colour from `coloring` when given
    ///
    /// The coloring source advances one column per pixel and one row per line.
    pub fn fill_color(&mut self, mut coloring: Option<&mut dyn ColoringSource>) {
        let size = self.color_space.pixel_size();
        let alpha_offset = self.color_space.alpha_offset();
        let stride = self.row_stride();
        if stride == 0 {
            return;
        }

        for row in self.data.chunks_exact_mut(stride) {
            for pixel in row.chunks_exact_mut(size) {
                pixel[alpha_offset] = OPACITY_OPAQUE;
                if let Some(source) = coloring.as_deref_mut() {
                    let color = source.color();
                    let n = color.len().min(size);
                    pixel[..n].copy_from_slice(&color[..n]);
                    source.next_column();
                }
            }
            if let Some(source) = coloring.as_deref_mut() {
                source.next_row();
            }
        }
    }

    /// Multiply the alpha channel by `mask`
    ///
    /// The mask must match the buffer size; missing mask samples read as transparent.
    pub fn apply_alpha_mask(&mut self, mask: &PixelMask) {
        let size = self.color_space.pixel_size();
        let alpha_offset = self.color_space.alpha_offset();
        for (pixel, &m) in self.data.chunks_exact_mut(size).zip(mask.data().iter()) {
            pixel[alpha_offset] = mul_u8(pixel[alpha_offset], m);
        }
        let covered = mask.data().len();
        for pixel in self.data.chunks_exact_mut(size).skip(covered) {
            pixel[alpha_offset] = 0;
        }
    }

    /// Build a dab from a mask: opaque fill, optional colour, then alpha from the mask
    pub fn from_mask(
        mask: &PixelMask,
        color_space: ColorSpace,
        coloring: Option<&mut dyn ColoringSource>,
    ) -> Self {
        let mut buffer = Self::new(mask.width(), mask.height(), color_space);
        buffer.fill_color(coloring);
        buffer.apply_alpha_mask(mask);
        buffer
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pixel_sizes() {
        assert_eq!(ColorSpace::Rgba8.pixel_size(), 4);
        assert_eq!(ColorSpace::Bgra8.alpha_offset(), 3);
        assert_eq!(ColorSpace::Alpha8.pixel_size(), 1);
        assert_eq!(ColorSpace::Alpha8.alpha_offset(), 0);
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        let mut px = [0u8; 4];
        ColorSpace::Bgra8.encode_rgba([10, 20, 30, 40], &mut px);
        assert_eq!(px, [30, 20, 10, 40]);
        assert_eq!(ColorSpace::Bgra8.decode_rgba(&px), [10, 20, 30, 40]);
    }

    #[test]
    fn mask_without_color_leaves_color_bytes_zero() {
        let mask = PixelMask::from_raw(2, 1, vec![255, 100]).unwrap();
        let dab = PixelBuffer::from_mask(&mask, ColorSpace::Rgba8, None);
        assert_eq!(dab.pixel(0, 0).unwrap(), &[0, 0, 0, 255]);
        assert_eq!(dab.pixel(1, 0).unwrap(), &[0, 0, 0, 100]);
    }

    #[test]
    fn mask_with_plain_color() {
        let mask = PixelMask::from_raw(2, 2, vec![255, 128, 0, 64]).unwrap();
        let color = [200, 100, 50, 255];
        let mut source = PlainColoring::new(&color);
        let dab = PixelBuffer::from_mask(&mask, ColorSpace::Rgba8, Some(&mut source));
        assert_eq!(dab.pixel(0, 0).unwrap(), &[200, 100, 50, 255]);
        assert_eq!(dab.pixel(1, 0).unwrap(), &[200, 100, 50, 128]);
        assert_eq!(dab.alpha_at(0, 1), 0);
        assert_eq!(dab.to_mask(), mask);
    }

    #[test]
    fn alpha8_mask_matches_input() {
        let mask = PixelMask::from_raw(3, 1, vec![1, 2, 3]).unwrap();
        let dab = PixelBuffer::from_mask(&mask, ColorSpace::Alpha8, None);
        assert_eq!(dab.data(), &[1, 2, 3]);
    }
}
