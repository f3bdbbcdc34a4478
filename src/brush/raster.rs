//! Raster brushes: a stored mask or colour image sampled through the pyramid

use std::sync::OnceLock;

use image::RgbaImage;
use tracing::debug;

use super::BrushBase;
use crate::core::{BrushError, DabRequest};
use crate::dab::{ColorSpace, ColoringSource, PixelBuffer};
use crate::mask::{rotate_samples, PixelMask};
use crate::pyramid::resample::unpremultiply_pixel;
use crate::pyramid::{ScaledBrushPyramid, MAXIMUM_SCALE};

/// Pixel data behind a raster brush
#[derive(Debug, Clone, PartialEq)]
pub enum RasterSource {
    /// Coverage only
    Mask(PixelMask),
    /// Straight-alpha colour
    Image(RgbaImage),
}

impl RasterSource {
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            RasterSource::Mask(m) => (m.width(), m.height()),
            RasterSource::Image(img) => (img.width() as usize, img.height() as usize),
        }
    }
}

/// Luminance used when colour is read as coverage
#[inline]
fn gray(r: u8, g: u8, b: u8) -> u32 {
    (r as u32 * 11 + g as u32 * 16 + b as u32 * 5) / 32
}

/// Coverage of a colour image read as a mask: `gray * alpha / 255`
pub(crate) fn gray_alpha_mask(image: &RgbaImage) -> PixelMask {
    let data = image
        .pixels()
        .map(|p| ((gray(p[0], p[1], p[2]) * p[3] as u32) / 255) as u8)
        .collect();
    PixelMask::from_raw(image.width() as usize, image.height() as usize, data)
        .unwrap_or_else(|| PixelMask::new(image.width() as usize, image.height() as usize))
}

fn alpha_mask(image: &RgbaImage) -> PixelMask {
    let data = image.pixels().map(|p| p[3]).collect();
    PixelMask::from_raw(image.width() as usize, image.height() as usize, data)
        .unwrap_or_else(|| PixelMask::new(image.width() as usize, image.height() as usize))
}

fn check_dimensions(width: usize, height: usize) -> Result<(), BrushError> {
    if width == 0 || height == 0 {
        return Err(BrushError::InvalidInput(format!(
            "Brush size must be non-zero, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RasterBrush {
    base: BrushBase,
    source: RasterSource,
    use_color_as_mask: bool,
    maximum_scale: u32,
    pyramid: OnceLock<ScaledBrushPyramid>,
}

impl RasterBrush {
    /// Build without size checks; callers have validated the source
    pub(crate) fn from_parts(base: BrushBase, source: RasterSource) -> Self {
        Self {
            base,
            source,
            use_color_as_mask: false,
            maximum_scale: MAXIMUM_SCALE,
            pyramid: OnceLock::new(),
        }
    }

    pub fn from_mask(
        name: impl Into<String>,
        mask: PixelMask,
        spacing: f64,
    ) -> Result<Self, BrushError> {
        check_dimensions(mask.width(), mask.height())?;
        let base = BrushBase::new(name, mask.width(), mask.height(), spacing);
        Ok(Self::from_parts(base, RasterSource::Mask(mask)))
    }

    pub fn from_image(
        name: impl Into<String>,
        image: RgbaImage,
        spacing: f64,
    ) -> Result<Self, BrushError> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        check_dimensions(w, h)?;
        let base = BrushBase::new(name, w, h, spacing);
        Ok(Self::from_parts(base, RasterSource::Image(image)))
    }

    /// Colour brush cut from a rectangle of `image`, clipped to its bounds
    pub fn from_image_region(
        name: impl Into<String>,
        image: &RgbaImage,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        spacing: f64,
    ) -> Result<Self, BrushError> {
        let x0 = x.min(image.width());
        let y0 = y.min(image.height());
        let x1 = x.saturating_add(width).min(image.width());
        let y1 = y.saturating_add(height).min(image.height());
        let region = image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
        Self::from_image(name, region, spacing)
    }

    /// Largest pyramid level relative to the source
    pub fn with_maximum_scale(mut self, maximum_scale: u32) -> Self {
        self.maximum_scale = maximum_scale.max(1);
        self.pyramid = OnceLock::new();
        self
    }

    pub fn base(&self) -> &BrushBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BrushBase {
        &mut self.base
    }

    pub fn source(&self) -> &RasterSource {
        &self.source
    }

    pub fn has_color(&self) -> bool {
        matches!(self.source, RasterSource::Image(_)) && !self.use_color_as_mask
    }

    pub fn use_color_as_mask(&self) -> bool {
        self.use_color_as_mask
    }

    /// Read colour as coverage; only meaningful for colour brushes
    pub fn set_use_color_as_mask(&mut self, enabled: bool) {
        if self.use_color_as_mask != enabled {
            self.use_color_as_mask = enabled;
            self.pyramid = OnceLock::new();
        }
    }

    /// Permanently turn a colour brush into a mask brush
    pub fn make_mask_image(&mut self) {
        if let RasterSource::Image(image) = &self.source {
            let mask = gray_alpha_mask(image);
            self.source = RasterSource::Mask(mask);
            self.use_color_as_mask = false;
            self.pyramid = OnceLock::new();
        }
    }

    /// Replace the pixel data; the pyramid is rebuilt on the next dab
    pub fn set_source(&mut self, source: RasterSource) -> Result<(), BrushError> {
        let (w, h) = source.dimensions();
        check_dimensions(w, h)?;
        self.base.set_size(w, h);
        self.source = source;
        self.pyramid = OnceLock::new();
        Ok(())
    }

    pub fn set_image(&mut self, image: RgbaImage) -> Result<(), BrushError> {
        self.set_source(RasterSource::Image(image))
    }

    pub fn set_mask(&mut self, mask: PixelMask) -> Result<(), BrushError> {
        self.set_source(RasterSource::Mask(mask))
    }

    /// Scale-1 coverage as seen by mask dabs
    pub fn coverage(&self) -> PixelMask {
        match &self.source {
            RasterSource::Mask(mask) => mask.clone(),
            RasterSource::Image(image) if self.use_color_as_mask => gray_alpha_mask(image),
            RasterSource::Image(image) => alpha_mask(image),
        }
    }

    /// Pyramid for the current source, built on first use
    pub fn pyramid(&self) -> &ScaledBrushPyramid {
        self.pyramid.get_or_init(|| {
            debug!("[RasterBrush] Building pyramid for '{}'", self.base.name());
            match &self.source {
                RasterSource::Image(image) if !self.use_color_as_mask => {
                    ScaledBrushPyramid::from_image(image, self.maximum_scale)
                }
                _ => ScaledBrushPyramid::from_mask(&self.coverage(), self.maximum_scale),
            }
        })
    }

    pub(crate) fn generate_mask(
        &self,
        color_space: ColorSpace,
        coloring: Option<&mut dyn ColoringSource>,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        let request = self.base.apply(request);
        let (scale_x, scale_y) = request.scale_xy();
        let mut mask =
            self.pyramid()
                .mask_at(scale_x, scale_y, request.sub_pixel_x, request.sub_pixel_y)?;
        if request.angle != 0.0 {
            mask = mask.rotate(request.angle);
        }
        Ok(PixelBuffer::from_mask(&mask, color_space, coloring))
    }

    pub(crate) fn paint_device(
        &self,
        color_space: ColorSpace,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        if !self.has_color() {
            return self.generate_mask(color_space, None, request);
        }

        let request = self.base.apply(request);
        let (scale_x, scale_y) = request.scale_xy();
        let image =
            self.pyramid()
                .image_at(scale_x, scale_y, request.sub_pixel_x, request.sub_pixel_y)?;
        let (data, width, height) = rotate_samples(
            image.as_raw(),
            image.width() as usize,
            image.height() as usize,
            4,
            request.angle,
        );

        let mut buffer = PixelBuffer::new(width, height, color_space);
        let size = color_space.pixel_size();
        for (src, dst) in data
            .chunks_exact(4)
            .zip(buffer.data_mut().chunks_exact_mut(size))
        {
            let straight = unpremultiply_pixel([src[0], src[1], src[2], src[3]]);
            color_space.encode_rgba(straight, dst);
        }
        Ok(buffer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn red_image(w: u32, h: u32) -> RgbaImage {
        let mut image = RgbaImage::new(w, h);
        for p in image.pixels_mut() {
            p.0 = [255, 0, 0, 255];
        }
        image
    }

    #[test]
    fn zero_sized_sources_are_rejected() {
        assert!(RasterBrush::from_mask("m", PixelMask::new(0, 4), 0.25).is_err());
        assert!(RasterBrush::from_image("i", RgbaImage::new(3, 0), 0.25).is_err());
    }

    #[test]
    fn pyramid_is_cached_until_source_changes() {
        let mut brush = RasterBrush::from_mask("m", PixelMask::filled(4, 4, 255), 0.25).unwrap();
        let first = brush.pyramid() as *const ScaledBrushPyramid;
        let second = brush.pyramid() as *const ScaledBrushPyramid;
        assert_eq!(first, second);
        assert_eq!(brush.pyramid().levels()[0].mask().width(), 8);

        brush.set_mask(PixelMask::filled(6, 2, 255)).unwrap();
        assert_eq!(brush.base().width(), 6);
        assert_eq!(brush.pyramid().levels()[0].mask().width(), 12);
    }

    #[test]
    fn colour_brush_paints_its_colour() {
        let brush = RasterBrush::from_image("red", red_image(4, 4), 0.25).unwrap();
        assert!(brush.has_color());
        let dab = brush
            .paint_device(ColorSpace::Bgra8, &DabRequest::default())
            .unwrap();
        assert_eq!((dab.width(), dab.height()), (5, 5));
        assert_eq!(dab.pixel(1, 1).unwrap(), &[0, 0, 255, 255]);
        assert_eq!(dab.alpha_at(4, 4), 0);
    }

    #[test]
    fn color_as_mask_uses_luminance() {
        let mut brush = RasterBrush::from_image("red", red_image(2, 2), 0.25).unwrap();
        brush.set_use_color_as_mask(true);
        assert!(!brush.has_color());
        // gray(255, 0, 0) = 255 * 11 / 32
        assert_eq!(brush.coverage().alpha_at(0, 0), 87);

        brush.make_mask_image();
        assert!(matches!(brush.source(), RasterSource::Mask(_)));
        assert_eq!(brush.coverage().alpha_at(1, 1), 87);
    }

    #[test]
    fn image_region_is_clipped() {
        let brush =
            RasterBrush::from_image_region("cut", &red_image(10, 10), 8, 6, 5, 2, 0.25).unwrap();
        assert_eq!((brush.base().width(), brush.base().height()), (2, 2));
        assert!(RasterBrush::from_image_region("cut", &red_image(4, 4), 4, 0, 2, 2, 0.25).is_err());
    }

    #[test]
    fn rotated_mask_dab_grows() {
        let brush = RasterBrush::from_mask("bar", PixelMask::filled(8, 2, 255), 0.25).unwrap();
        let request = DabRequest {
            angle: std::f64::consts::FRAC_PI_2,
            ..DabRequest::default()
        };
        let dab = brush.generate_mask(ColorSpace::Alpha8, None, &request).unwrap();
        assert_eq!((dab.width(), dab.height()), (3, 9));
    }
}
