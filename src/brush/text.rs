//! Text brushes: a string rasterized once into a mask

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use tracing::debug;

use super::{BrushBase, RasterBrush, DEFAULT_SPACING};
use crate::core::BrushError;
use crate::mask::{to_u8, PixelMask};

#[derive(Debug, Clone)]
pub struct TextBrush {
    text: String,
    font_size: f32,
    font_path: Option<String>,
    raster: RasterBrush,
}

impl TextBrush {
    pub fn new(text: &str, font_data: Vec<u8>, font_size: f32) -> Result<Self, BrushError> {
        if font_size.is_nan() || font_size <= 0.0 {
            return Err(BrushError::InvalidInput(format!(
                "Font size must be positive, got {}",
                font_size
            )));
        }
        let font = FontArc::try_from_vec(font_data).map_err(|e| BrushError::Font(e.to_string()))?;
        let mask = rasterize(&font, text, font_size)?;
        debug!(
            "[TextBrush] Rasterized '{}' at {}px into {}x{}",
            text,
            font_size,
            mask.width(),
            mask.height()
        );
        let raster = RasterBrush::from_mask(text, mask, DEFAULT_SPACING)?;
        Ok(Self {
            text: text.to_string(),
            font_size,
            font_path: None,
            raster,
        })
    }

    /// Remember where the font came from so the brush can be persisted
    pub fn with_font_path(mut self, path: impl Into<String>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn font_path(&self) -> Option<&str> {
        self.font_path.as_deref()
    }

    pub fn raster(&self) -> &RasterBrush {
        &self.raster
    }

    pub fn base(&self) -> &BrushBase {
        self.raster.base()
    }

    pub fn base_mut(&mut self) -> &mut BrushBase {
        self.raster.base_mut()
    }
}

/// Lay out one line on the baseline and accumulate glyph coverage
fn rasterize(font: &FontArc, text: &str, font_size: f32) -> Result<PixelMask, BrushError> {
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();
    let descent = scaled.descent();

    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    let width = cursor_x.ceil().max(0.0) as usize;
    let height = (ascent - descent).ceil().max(0.0) as usize;
    if width == 0 || height == 0 {
        return Err(BrushError::InvalidInput(format!(
            "Text '{}' renders no pixels",
            text
        )));
    }

    let mut mask = PixelMask::new(width, height);
    for (glyph_id, x) in glyphs {
        let glyph = glyph_id.with_scale_and_position(font_size, point(x, ascent));
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i32 + gx as i32;
            let py = bounds.min.y as i32 + gy as i32;
            let value = to_u8(coverage as f64 * 255.0);
            if value > mask.alpha_at(px, py) {
                mask.set_alpha_at(px, py, value);
            }
        });
    }

    Ok(mask)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn invalid_font_data_is_an_error() {
        let result = TextBrush::new("A", vec![0, 1, 2, 3], 24.0);
        assert!(matches!(result, Err(BrushError::Font(_))));
    }

    const TEST_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

    #[test]
    fn renders_text_into_a_mask() {
        let brush = TextBrush::new("Hi", TEST_FONT.to_vec(), 32.0).unwrap();
        let coverage = brush.raster().coverage();
        assert!(coverage.width() > 30 && coverage.width() < 45);
        assert!(coverage.height() >= 32 && coverage.height() <= 33);
        assert!(coverage.total() > 0);
        assert_eq!(brush.base().name(), "Hi");
        assert!((brush.base().spacing() - DEFAULT_SPACING).abs() < 1e-12);
        // Stems are solid, the gaps between glyphs are empty
        assert!(coverage.data().iter().copied().max().unwrap() >= 250);
        assert!(coverage.data().iter().any(|&a| a == 0));
    }

    #[test]
    fn longer_text_is_wider() {
        let short = TextBrush::new("ab", TEST_FONT.to_vec(), 20.0).unwrap();
        let long = TextBrush::new("abcd", TEST_FONT.to_vec(), 20.0).unwrap();
        assert!(long.base().width() > short.base().width());
        assert_eq!(long.base().height(), short.base().height());
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(TextBrush::new("", TEST_FONT.to_vec(), 20.0).is_err());
    }

    #[test]
    fn non_positive_size_is_rejected() {
        let result = TextBrush::new("A", Vec::new(), 0.0);
        assert!(matches!(result, Err(BrushError::InvalidInput(_))));
    }
}
