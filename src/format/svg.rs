//! Vector (.svg) brushes
//!
//! The document is rasterized once at its intrinsic size into a colour brush.
//! Scaling after that goes through the pyramid like any other raster tip.

use image::RgbaImage;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use tracing::debug;

use super::FormatError;
use crate::brush::{RasterBrush, DEFAULT_SPACING};
use crate::pyramid::resample::unpremultiply;

/// Largest rasterized side, in pixels
pub const MAX_SVG_SIZE: u32 = 4096;

pub struct SvgParser;

impl SvgParser {
    pub fn parse(name: &str, data: &[u8]) -> Result<RasterBrush, FormatError> {
        let tree = Tree::from_data(data, &Options::default())
            .map_err(|e| FormatError::InvalidSvg(e.to_string()))?;

        let size = tree.size();
        let (width, height) = (size.width().ceil(), size.height().ceil());
        if !(width >= 1.0 && height >= 1.0) {
            return Err(FormatError::ZeroDimensions {
                width: width.max(0.0) as u32,
                height: height.max(0.0) as u32,
            });
        }
        if width > MAX_SVG_SIZE as f32 || height > MAX_SVG_SIZE as f32 {
            return Err(FormatError::InvalidSvg(format!(
                "document is {}x{}, limit is {}",
                width, height, MAX_SVG_SIZE
            )));
        }
        let (width, height) = (width as u32, height as u32);

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            FormatError::InvalidSvg(format!("cannot allocate {}x{} pixmap", width, height))
        })?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        debug!("[SvgParser] Rasterized '{}' at {}x{}", name, width, height);

        // tiny-skia stores premultiplied RGBA8
        let premultiplied = RgbaImage::from_raw(width, height, pixmap.take())
            .ok_or_else(|| FormatError::InvalidSvg("pixmap size mismatch".to_string()))?;

        RasterBrush::from_image(name, unpremultiply(&premultiplied), DEFAULT_SPACING)
            .map_err(|e| FormatError::InvalidSvg(e.to_string()))
    }
}
