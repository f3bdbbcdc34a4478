//! Brush kinds and dab production
//!
//! [`Brush`] is a closed sum over the supported kinds. Every dab request goes
//! through the same path: validate, apply the brush's own transform, resolve a
//! pipe to its current cell, then render a mask into a fresh [`PixelBuffer`].

mod engine;
mod outline;
mod parasite;
mod pipe;
mod procedural;
mod raster;
mod text;

pub use engine::{DabEngine, Stroke, StrokeCursor};
pub use outline::BrushOutline;
pub use parasite::{PipeBrushParasite, PipeCursor, SelectionMode, MAX_DIMENSIONS};
pub use pipe::PipeBrush;
pub use procedural::ProceduralBrush;
pub use raster::{RasterBrush, RasterSource};
pub use text::TextBrush;

use serde::{Deserialize, Serialize};

use crate::core::{validate_dab_request, BrushError, DabRequest, EngineConfig, PaintInformation};
use crate::dab::{ColorSpace, ColoringSource, DeviceColoring, PixelBuffer, PlainColoring};
use crate::mask::rotated_extent;

/// Spacing used when a brush does not declare one (fraction of brush size)
pub const DEFAULT_SPACING: f64 = 0.25;

/// Coverage threshold used for outlines
const OUTLINE_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrushKind {
    Raster,
    Procedural,
    Pipe,
    Text,
}

impl BrushKind {
    /// Identifier used in brush reference records
    pub fn as_str(&self) -> &'static str {
        match self {
            BrushKind::Raster => "gbr_brush",
            BrushKind::Procedural => "auto_brush",
            BrushKind::Pipe => "gih_brush",
            BrushKind::Text => "text_brush",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "gbr_brush" => Some(BrushKind::Raster),
            "auto_brush" => Some(BrushKind::Procedural),
            "gih_brush" => Some(BrushKind::Pipe),
            "text_brush" => Some(BrushKind::Text),
            _ => None,
        }
    }
}

/// Properties shared by every brush kind
#[derive(Debug, Clone, PartialEq)]
pub struct BrushBase {
    name: String,
    filename: Option<String>,
    width: usize,
    height: usize,
    spacing: f64,
    hot_spot: Option<(f64, f64)>,
    angle: f64,
    scale: f64,
}

impl BrushBase {
    pub fn new(name: impl Into<String>, width: usize, height: usize, spacing: f64) -> Self {
        Self {
            name: name.into(),
            filename: None,
            width,
            height,
            spacing,
            hot_spot: None,
            angle: 0.0,
            scale: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = Some(filename.into());
    }

    /// Width at scale 1, angle 0
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: f64) {
        self.spacing = spacing.max(0.0);
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Non-positive or non-finite scales are ignored
    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
    }

    /// Anchor a dab at this point, clamped into the brush rectangle
    pub fn set_hot_spot(&mut self, x: f64, y: f64) {
        let max_x = self.width.saturating_sub(1) as f64;
        let max_y = self.height.saturating_sub(1) as f64;
        self.hot_spot = Some((x.clamp(0.0, max_x), y.clamp(0.0, max_y)));
    }

    /// Anchor of a dab at the given scale; the centre unless one was set
    pub fn hot_spot(&self, scale_x: f64, scale_y: f64) -> (f64, f64) {
        match self.hot_spot {
            Some((x, y)) => (x * scale_x, y * scale_y),
            None => {
                let w = (self.width as f64 * scale_x).max(1.0);
                let h = (self.height as f64 * scale_y).max(1.0);
                (w / 2.0, h / 2.0)
            }
        }
    }

    /// Horizontal distance between dabs at `scale`
    pub fn x_spacing(&self, scale: f64) -> f64 {
        self.width as f64 * scale * self.spacing
    }

    pub fn y_spacing(&self, scale: f64) -> f64 {
        self.height as f64 * scale * self.spacing
    }

    /// Dab width at `scale` and `angle`, including the sub-pixel column
    pub fn mask_width(&self, scale: f64, angle: f64) -> usize {
        let (w, _) = rotated_extent(
            self.width as f64 * scale,
            self.height as f64 * scale,
            angle,
        );
        (w - 1e-6).ceil().max(0.0) as usize + 1
    }

    pub fn mask_height(&self, scale: f64, angle: f64) -> usize {
        let (_, h) = rotated_extent(
            self.width as f64 * scale,
            self.height as f64 * scale,
            angle,
        );
        (h - 1e-6).ceil().max(0.0) as usize + 1
    }

    /// Fold this brush's persisted transform into a request
    pub(crate) fn apply(&self, request: &DabRequest) -> DabRequest {
        DabRequest {
            scale: request.scale * self.scale,
            angle: request.angle + self.angle,
            ..*request
        }
    }
}

#[derive(Debug, Clone)]
pub enum Brush {
    Raster(RasterBrush),
    Procedural(ProceduralBrush),
    Pipe(PipeBrush),
    Text(TextBrush),
}

impl From<RasterBrush> for Brush {
    fn from(brush: RasterBrush) -> Self {
        Brush::Raster(brush)
    }
}

impl From<ProceduralBrush> for Brush {
    fn from(brush: ProceduralBrush) -> Self {
        Brush::Procedural(brush)
    }
}

impl From<PipeBrush> for Brush {
    fn from(brush: PipeBrush) -> Self {
        Brush::Pipe(brush)
    }
}

impl From<TextBrush> for Brush {
    fn from(brush: TextBrush) -> Self {
        Brush::Text(brush)
    }
}

impl Brush {
    pub fn kind(&self) -> BrushKind {
        match self {
            Brush::Raster(_) => BrushKind::Raster,
            Brush::Procedural(_) => BrushKind::Procedural,
            Brush::Pipe(_) => BrushKind::Pipe,
            Brush::Text(_) => BrushKind::Text,
        }
    }

    pub fn base(&self) -> &BrushBase {
        match self {
            Brush::Raster(b) => b.base(),
            Brush::Procedural(b) => b.base(),
            Brush::Pipe(b) => b.base(),
            Brush::Text(b) => b.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut BrushBase {
        match self {
            Brush::Raster(b) => b.base_mut(),
            Brush::Procedural(b) => b.base_mut(),
            Brush::Pipe(b) => b.base_mut(),
            Brush::Text(b) => b.base_mut(),
        }
    }

    pub fn name(&self) -> &str {
        self.base().name()
    }

    pub fn width(&self) -> usize {
        self.base().width()
    }

    pub fn height(&self) -> usize {
        self.base().height()
    }

    pub fn spacing(&self) -> f64 {
        self.base().spacing()
    }

    /// Whether dabs carry the brush's own colour
    pub fn has_color(&self) -> bool {
        match self {
            Brush::Raster(b) => b.has_color(),
            Brush::Procedural(_) => false,
            Brush::Pipe(b) => b.has_color(),
            Brush::Text(_) => false,
        }
    }

    /// Whether a dab should be produced for this input at all
    pub fn can_paint_for(&self, info: &PaintInformation, config: &EngineConfig) -> bool {
        match self {
            Brush::Pipe(b) => b.can_paint_for(info, config.movement_threshold),
            _ => true,
        }
    }

    /// Mask-only dab: colour bytes zero, alpha from the brush
    pub fn mask(
        &self,
        cursor: &mut StrokeCursor,
        color_space: ColorSpace,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        validate_dab_request(request)?;
        self.generate_mask(cursor, color_space, None, request)
    }

    /// Dab filled with one colour, given in `color_space` bytes
    pub fn mask_with_color(
        &self,
        cursor: &mut StrokeCursor,
        color_space: ColorSpace,
        color: &[u8],
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        validate_dab_request(request)?;
        if color.len() < color_space.pixel_size() {
            return Err(BrushError::InvalidInput(format!(
                "Color has {} bytes, {:?} needs {}",
                color.len(),
                color_space,
                color_space.pixel_size()
            )));
        }
        let mut coloring = PlainColoring::new(color);
        self.generate_mask(cursor, color_space, Some(&mut coloring), request)
    }

    /// Dab coloured pixel by pixel from `source`, in the source's colour space
    pub fn mask_with_source(
        &self,
        cursor: &mut StrokeCursor,
        source: &PixelBuffer,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        validate_dab_request(request)?;
        let mut coloring = DeviceColoring::new(source);
        self.generate_mask(cursor, source.color_space(), Some(&mut coloring), request)
    }

    /// The brush rendered in its own colours; mask brushes render as their mask
    pub fn paint_device(
        &self,
        cursor: &mut StrokeCursor,
        color_space: ColorSpace,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        validate_dab_request(request)?;
        match self {
            Brush::Raster(b) => b.paint_device(color_space, request),
            Brush::Pipe(b) => {
                let (cell, request) = b.select(cursor, request);
                cell.paint_device(color_space, &request)
            }
            _ => self.generate_mask(cursor, color_space, None, request),
        }
    }

    fn generate_mask(
        &self,
        cursor: &mut StrokeCursor,
        color_space: ColorSpace,
        coloring: Option<&mut dyn ColoringSource>,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        match self {
            Brush::Raster(b) => b.generate_mask(color_space, coloring, request),
            Brush::Procedural(b) => b.generate_mask(cursor, color_space, coloring, request),
            Brush::Pipe(b) => {
                let (cell, request) = b.select(cursor, request);
                cell.generate_mask(color_space, coloring, &request)
            }
            Brush::Text(b) => b.raster().generate_mask(color_space, coloring, request),
        }
    }

    /// Contours of the brush at scale 1, for cursor display
    pub fn outline(&self) -> BrushOutline {
        let mask = match self {
            Brush::Raster(b) => b.coverage(),
            Brush::Procedural(b) => b.coverage(),
            Brush::Pipe(b) => b.coverage(),
            Brush::Text(b) => b.raster().coverage(),
        };
        BrushOutline::from_mask(&mask, OUTLINE_THRESHOLD)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::generator::{CircleMaskGenerator, MaskGeneratorKind};
    use crate::mask::PixelMask;

    fn cursor() -> StrokeCursor {
        StrokeCursor::new(EngineConfig {
            random_seed: Some(7),
            ..EngineConfig::default()
        })
    }

    fn square_brush() -> Brush {
        RasterBrush::from_mask("square", PixelMask::filled(8, 8, 255), 0.1)
            .unwrap()
            .into()
    }

    #[test]
    fn base_spacing_and_extent() {
        let brush = square_brush();
        let base = brush.base();
        assert!((base.x_spacing(2.0) - 1.6).abs() < 1e-9);
        assert_eq!(base.mask_width(1.0, 0.0), 9);
        assert_eq!(base.mask_width(0.5, std::f64::consts::FRAC_PI_2), 5);
    }

    #[test]
    fn hot_spot_defaults_to_centre_and_clamps() {
        let mut base = BrushBase::new("b", 10, 6, 0.25);
        assert_eq!(base.hot_spot(1.0, 1.0), (5.0, 3.0));
        assert_eq!(base.hot_spot(0.01, 0.01), (0.5, 0.5));
        base.set_hot_spot(20.0, -3.0);
        assert_eq!(base.hot_spot(1.0, 1.0), (9.0, 0.0));
    }

    #[test]
    fn mask_dab_has_expected_size_and_alpha() {
        let brush = square_brush();
        let dab = brush
            .mask(&mut cursor(), ColorSpace::Rgba8, &DabRequest::default())
            .unwrap();
        assert_eq!((dab.width(), dab.height()), (9, 9));
        assert_eq!(dab.pixel(3, 3).unwrap(), &[0, 0, 0, 255]);
        assert_eq!(dab.alpha_at(8, 8), 0);
    }

    #[test]
    fn mask_with_color_copies_color() {
        let brush = square_brush();
        let dab = brush
            .mask_with_color(
                &mut cursor(),
                ColorSpace::Bgra8,
                &[1, 2, 3, 255],
                &DabRequest::default(),
            )
            .unwrap();
        assert_eq!(dab.pixel(0, 0).unwrap(), &[1, 2, 3, 255]);
    }

    #[test]
    fn short_color_is_rejected() {
        let brush = square_brush();
        let result = brush.mask_with_color(
            &mut cursor(),
            ColorSpace::Rgba8,
            &[1, 2],
            &DabRequest::default(),
        );
        assert!(matches!(result, Err(BrushError::InvalidInput(_))));
    }

    #[test]
    fn invalid_request_is_rejected() {
        let brush = square_brush();
        let request = DabRequest {
            scale: 0.0,
            ..DabRequest::default()
        };
        assert!(brush.mask(&mut cursor(), ColorSpace::Alpha8, &request).is_err());
    }

    #[test]
    fn persisted_scale_is_applied() {
        let mut brush = square_brush();
        brush.base_mut().set_scale(0.5);
        let dab = brush
            .mask(&mut cursor(), ColorSpace::Alpha8, &DabRequest::default())
            .unwrap();
        assert_eq!((dab.width(), dab.height()), (5, 5));
    }

    #[test]
    fn procedural_paint_device_is_mask() {
        let brush: Brush = ProceduralBrush::new(MaskGeneratorKind::Circle(
            CircleMaskGenerator::new(10.0, 1.0, 0.0, 0.0),
        ))
        .unwrap()
        .into();
        assert!(!brush.has_color());
        let dab = brush
            .paint_device(&mut cursor(), ColorSpace::Rgba8, &DabRequest::default())
            .unwrap();
        assert_eq!(dab.alpha_at(5, 5), 255);
        assert_eq!(dab.pixel(5, 5).unwrap()[0], 0);
    }

    #[test]
    fn outline_of_square_is_one_contour() {
        let outline = square_brush().outline();
        assert_eq!(outline.contours().len(), 1);
    }

    #[test]
    fn kind_ids_round_trip() {
        for kind in [
            BrushKind::Raster,
            BrushKind::Procedural,
            BrushKind::Pipe,
            BrushKind::Text,
        ] {
            assert_eq!(BrushKind::parse(kind.as_str()), Some(kind));
        }
    }
}
