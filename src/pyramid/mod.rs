//! Scaled brush pyramid
//!
//! A raster brush keeps a chain of pre-resampled copies of its source, from
//! `maximum_scale` times the source size down to a single pixel, halving at
//! each step. A dab at an arbitrary scale is produced by resampling the nearest
//! level (or blending the two levels that bracket the scale), which keeps the
//! bilinear kernel close to a 1:1 ratio and avoids aliasing on small dabs.

pub mod resample;

use image::RgbaImage;
use tracing::debug;

use crate::core::BrushError;
use crate::mask::{interpolate_samples, PixelMask};
use resample::{resize_samples, scale_samples, single_pixel_samples, ScaleParams};

/// Largest level relative to the source brush
pub const MAXIMUM_SCALE: u32 = 2;

const SCALE_EPSILON: f64 = f64::EPSILON;

/// One level of the pyramid
#[derive(Debug, Clone)]
pub struct ScaledBrush {
    scale: f64,
    x_scale: f64,
    y_scale: f64,
    mask: PixelMask,
    /// Premultiplied colour; present only for colour brushes
    image: Option<RgbaImage>,
}

impl ScaledBrush {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn x_scale(&self) -> f64 {
        self.x_scale
    }

    pub fn y_scale(&self) -> f64 {
        self.y_scale
    }

    pub fn mask(&self) -> &PixelMask {
        &self.mask
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }
}

/// Levels ordered from largest to smallest
#[derive(Debug, Clone)]
pub struct ScaledBrushPyramid {
    levels: Vec<ScaledBrush>,
    source_width: usize,
    source_height: usize,
}

/// Which levels serve a requested scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelChoice {
    /// Resample one level directly
    Single(usize),
    /// Blend `above` (larger) and `below` (smaller)
    Between { above: usize, below: usize },
    /// Smaller than the 1x1 level
    SubPixel(usize),
}

/// Level sizes from `maximum_scale` times the source down to 1x1
fn level_sizes(width: usize, height: usize, maximum_scale: u32) -> Vec<(usize, usize)> {
    let mut sizes = Vec::new();
    if width == 0 || height == 0 {
        return sizes;
    }
    let mut w = width * maximum_scale.max(1) as usize;
    let mut h = height * maximum_scale.max(1) as usize;
    loop {
        sizes.push((w, h));
        if w == 1 && h == 1 {
            break;
        }
        w = (w + 1) / 2;
        h = (h + 1) / 2;
    }
    sizes
}

/// Scale a level stands for: `maximum_scale / 2^level`
///
/// Actual level sizes round up and may stop shrinking along one axis, so the
/// per-axis `x_scale`/`y_scale` drive resampling while this value orders the
/// levels for lookup.
fn nominal_scale(maximum_scale: u32, level: usize) -> f64 {
    f64::from(maximum_scale.max(1)) * 0.5f64.powi(level.min(i32::MAX as usize) as i32)
}

/// Resample every level, going back to the source while a level is at least
/// source-sized and reusing the previous level below that
fn build_levels(
    source: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    maximum_scale: u32,
) -> Vec<(usize, usize, Vec<u8>)> {
    let mut levels: Vec<(usize, usize, Vec<u8>)> = Vec::new();
    for (w, h) in level_sizes(width, height, maximum_scale) {
        let data = match levels.last() {
            Some((pw, ph, prev)) if w < width && h < height => {
                resize_samples(prev, *pw, *ph, channels, w, h)
            }
            _ => resize_samples(source, width, height, channels, w, h),
        };
        levels.push((w, h, data));
    }
    levels
}

impl ScaledBrushPyramid {
    /// Build from a mask-only brush
    pub fn from_mask(source: &PixelMask, maximum_scale: u32) -> Self {
        let (width, height) = (source.width(), source.height());
        let levels = build_levels(source.data(), width, height, 1, maximum_scale)
            .into_iter()
            .enumerate()
            .map(|(k, (w, h, data))| {
                let mask = PixelMask::from_raw(w, h, data).unwrap_or_else(|| PixelMask::new(w, h));
                ScaledBrush {
                    scale: nominal_scale(maximum_scale, k),
                    x_scale: w as f64 / width as f64,
                    y_scale: h as f64 / height as f64,
                    mask,
                    image: None,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "[Pyramid] Built {} mask levels for {}x{} source",
            levels.len(),
            width,
            height
        );

        Self {
            levels,
            source_width: width,
            source_height: height,
        }
    }

    /// Build from a straight-alpha colour image; levels store premultiplied colour
    pub fn from_image(source: &RgbaImage, maximum_scale: u32) -> Self {
        let (width, height) = (source.width() as usize, source.height() as usize);
        let premultiplied = resample::premultiply(source);
        let levels = build_levels(premultiplied.as_raw(), width, height, 4, maximum_scale)
            .into_iter()
            .enumerate()
            .map(|(k, (w, h, data))| {
                let mask_data = data.chunks_exact(4).map(|p| p[3]).collect();
                let mask =
                    PixelMask::from_raw(w, h, mask_data).unwrap_or_else(|| PixelMask::new(w, h));
                let image = RgbaImage::from_raw(w as u32, h as u32, data);
                ScaledBrush {
                    scale: nominal_scale(maximum_scale, k),
                    x_scale: w as f64 / width as f64,
                    y_scale: h as f64 / height as f64,
                    mask,
                    image,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "[Pyramid] Built {} colour levels for {}x{} source",
            levels.len(),
            width,
            height
        );

        Self {
            levels,
            source_width: width,
            source_height: height,
        }
    }

    pub fn levels(&self) -> &[ScaledBrush] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Dab size for a request: the scaled source plus one pixel of sub-pixel slack
    pub fn dab_size(&self, scale_x: f64, scale_y: f64) -> (usize, usize) {
        (
            (scale_x * self.source_width as f64).ceil() as usize + 1,
            (scale_y * self.source_height as f64).ceil() as usize + 1,
        )
    }

    fn choose(&self, scale: f64) -> Result<LevelChoice, BrushError> {
        let top = self.levels.first().ok_or(BrushError::EmptyBrush)?;
        if scale > top.scale + SCALE_EPSILON {
            return Ok(LevelChoice::Single(0));
        }

        let last = self.levels.len() - 1;
        for (i, level) in self.levels.iter().enumerate() {
            if (scale - level.scale).abs() < SCALE_EPSILON {
                return Ok(LevelChoice::Single(i));
            }
            if i == last {
                return Ok(LevelChoice::SubPixel(i));
            }
            if scale > self.levels[i + 1].scale + SCALE_EPSILON {
                return Ok(LevelChoice::Between {
                    above: i,
                    below: i + 1,
                });
            }
        }
        Ok(LevelChoice::SubPixel(last))
    }

    /// Generic sampling over whichever plane `plane` picks from a level
    fn sample<'a, F>(
        &'a self,
        scale_x: f64,
        scale_y: f64,
        sub_pixel_x: f64,
        sub_pixel_y: f64,
        channels: usize,
        plane: F,
    ) -> Result<(Vec<u8>, usize, usize), BrushError>
    where
        F: Fn(&'a ScaledBrush) -> Option<&'a [u8]>,
    {
        let scale = 0.5 * (scale_x + scale_y);
        let choice = self.choose(scale)?;

        let scale_level = |index: usize| -> Result<(Vec<u8>, usize, usize), BrushError> {
            let level = &self.levels[index];
            let data = plane(level).ok_or(BrushError::EmptyBrush)?;
            let (dst_w, dst_h) = self.dab_size(scale_x, scale_y);
            let params = ScaleParams {
                level_x_scale: level.x_scale,
                level_y_scale: level.y_scale,
                scale_x,
                scale_y,
                sub_pixel_x,
                sub_pixel_y,
            };
            let out = scale_samples(
                data,
                level.mask.width(),
                level.mask.height(),
                channels,
                params,
                dst_w,
                dst_h,
            );
            Ok((out, dst_w, dst_h))
        };

        match choice {
            LevelChoice::Single(index) => scale_level(index),
            LevelChoice::Between { above, below } => {
                let (upper, w, h) = scale_level(above)?;
                let (lower, _, _) = scale_level(below)?;
                let t = (scale - self.levels[below].scale)
                    / (self.levels[above].scale - self.levels[below].scale);
                Ok((interpolate_samples(&lower, &upper, t), w, h))
            }
            LevelChoice::SubPixel(index) => {
                let level = &self.levels[index];
                let data = plane(level).ok_or(BrushError::EmptyBrush)?;
                let s = scale / level.scale;
                let value = &data[..channels.min(data.len())];
                Ok((single_pixel_samples(value, s, sub_pixel_x, sub_pixel_y), 2, 2))
            }
        }
    }

    /// Mask for a dab at `scale_x` x `scale_y` of the source size
    pub fn mask_at(
        &self,
        scale_x: f64,
        scale_y: f64,
        sub_pixel_x: f64,
        sub_pixel_y: f64,
    ) -> Result<PixelMask, BrushError> {
        let (data, w, h) = self.sample(scale_x, scale_y, sub_pixel_x, sub_pixel_y, 1, |level| {
            Some(level.mask.data())
        })?;
        PixelMask::from_raw(w, h, data).ok_or(BrushError::EmptyBrush)
    }

    /// Premultiplied colour for a dab; fails on mask-only pyramids
    pub fn image_at(
        &self,
        scale_x: f64,
        scale_y: f64,
        sub_pixel_x: f64,
        sub_pixel_y: f64,
    ) -> Result<RgbaImage, BrushError> {
        let (data, w, h) = self.sample(scale_x, scale_y, sub_pixel_x, sub_pixel_y, 4, |level| {
            level.image.as_ref().map(|img| img.as_raw().as_slice())
        })?;
        RgbaImage::from_raw(w as u32, h as u32, data).ok_or(BrushError::EmptyBrush)
    }
}
