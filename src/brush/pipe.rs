//! Pipe brushes: an ordered set of raster cells picked per dab

use tracing::warn;

use super::parasite::PipeBrushParasite;
use super::{BrushBase, RasterBrush, StrokeCursor};
use crate::core::{BrushError, DabRequest, PaintInformation};
use crate::mask::PixelMask;

#[derive(Debug, Clone)]
pub struct PipeBrush {
    base: BrushBase,
    parasite: PipeBrushParasite,
    brushes: Vec<RasterBrush>,
}

impl PipeBrush {
    /// Cells must match the parasite's declared cell count and ranks
    pub fn new(
        name: impl Into<String>,
        brushes: Vec<RasterBrush>,
        parasite: PipeBrushParasite,
    ) -> Result<Self, BrushError> {
        if brushes.is_empty() {
            return Err(BrushError::EmptyBrush);
        }
        parasite.validate_cell_count(brushes.len())?;
        Ok(Self::from_parts(name, brushes, parasite))
    }

    /// Assemble already validated cells; `brushes` is non-empty
    pub(crate) fn from_parts(
        name: impl Into<String>,
        brushes: Vec<RasterBrush>,
        parasite: PipeBrushParasite,
    ) -> Self {
        // Nominal size is the largest cell
        let width = brushes.iter().map(|b| b.base().width()).max().unwrap_or(0);
        let height = brushes.iter().map(|b| b.base().height()).max().unwrap_or(0);
        let spacing = brushes
            .first()
            .map(|b| b.base().spacing())
            .unwrap_or(super::DEFAULT_SPACING);
        let base = BrushBase::new(name, width, height, spacing);

        Self {
            base,
            parasite,
            brushes,
        }
    }

    /// Apply a pyramid size limit to every cell
    pub fn with_maximum_scale(mut self, maximum_scale: u32) -> Self {
        self.brushes = self
            .brushes
            .into_iter()
            .map(|cell| cell.with_maximum_scale(maximum_scale))
            .collect();
        self
    }

    pub fn base(&self) -> &BrushBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BrushBase {
        &mut self.base
    }

    pub fn parasite(&self) -> &PipeBrushParasite {
        &self.parasite
    }

    pub fn brushes(&self) -> &[RasterBrush] {
        &self.brushes
    }

    pub fn has_color(&self) -> bool {
        self.brushes.iter().any(RasterBrush::has_color)
    }

    /// Direction-dependent pipes skip dabs while the pointer is (almost) still
    pub fn can_paint_for(&self, info: &PaintInformation, movement_threshold: f64) -> bool {
        !(self.parasite.needs_movement() && info.drawing_distance() < movement_threshold)
    }

    /// Advance the stroke's selection and return the cell with the request
    /// adjusted by this pipe's own transform
    pub(crate) fn select(
        &self,
        cursor: &mut StrokeCursor,
        request: &DabRequest,
    ) -> (&RasterBrush, DabRequest) {
        let (pipe_cursor, rng) = cursor.pipe_state(&self.parasite);
        let index = self.parasite.select(pipe_cursor, &request.info, rng);
        let cell = match self.brushes.get(index) {
            Some(cell) => cell,
            None => {
                warn!(
                    "[PipeBrush] '{}' selected cell {} of {}, using cell 0",
                    self.base.name(),
                    index,
                    self.brushes.len()
                );
                &self.brushes[0]
            }
        };
        (cell, self.base.apply(request))
    }

    /// Scale-1 coverage of the first cell
    pub fn coverage(&self) -> PixelMask {
        self.brushes[0].coverage()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::{Brush, SelectionMode};
    use crate::core::EngineConfig;
    use crate::dab::ColorSpace;

    fn cells(n: usize) -> Vec<RasterBrush> {
        (0..n)
            .map(|i| {
                RasterBrush::from_mask(format!("cell{}", i), PixelMask::filled(i + 1, 1, 255), 0.5)
                    .unwrap()
            })
            .collect()
    }

    fn cursor() -> StrokeCursor {
        StrokeCursor::new(EngineConfig {
            random_seed: Some(3),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn mismatched_cell_count_is_rejected() {
        let parasite = PipeBrushParasite::new(3, &[3], &[SelectionMode::Incremental]).unwrap();
        assert!(PipeBrush::new("pipe", cells(2), parasite.clone()).is_err());
        assert!(PipeBrush::new("pipe", Vec::new(), parasite).is_err());
    }

    #[test]
    fn incremental_pipe_walks_cells() {
        let parasite = PipeBrushParasite::new(3, &[3], &[SelectionMode::Incremental]).unwrap();
        let brush = Brush::from(PipeBrush::new("pipe", cells(3), parasite).unwrap());
        assert_eq!(brush.width(), 3);

        let mut cursor = cursor();
        let widths: Vec<usize> = (0..4)
            .map(|_| {
                brush
                    .mask(&mut cursor, ColorSpace::Alpha8, &DabRequest::default())
                    .unwrap()
                    .width()
            })
            .collect();
        // Each dab is its cell's width plus the sub-pixel column
        assert_eq!(widths, vec![2, 3, 4, 2]);
    }

    #[test]
    fn separate_strokes_do_not_share_state() {
        let parasite = PipeBrushParasite::new(3, &[3], &[SelectionMode::Incremental]).unwrap();
        let brush = Brush::from(PipeBrush::new("pipe", cells(3), parasite).unwrap());
        let mut first = cursor();
        let mut second = cursor();
        let request = DabRequest::default();
        brush.mask(&mut first, ColorSpace::Alpha8, &request).unwrap();
        brush.mask(&mut first, ColorSpace::Alpha8, &request).unwrap();
        let dab = brush.mask(&mut second, ColorSpace::Alpha8, &request).unwrap();
        assert_eq!(dab.width(), 2);
    }

    #[test]
    fn angular_pipe_needs_movement() {
        let parasite = PipeBrushParasite::new(2, &[2], &[SelectionMode::Angular]).unwrap();
        let pipe = PipeBrush::new("dir", cells(2), parasite).unwrap();
        let still = PaintInformation::default();
        let moving = PaintInformation {
            movement: (3.0, 4.0),
            ..PaintInformation::default()
        };
        assert!(!pipe.can_paint_for(&still, 0.5));
        assert!(pipe.can_paint_for(&moving, 0.5));
    }
}
