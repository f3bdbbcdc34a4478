//! Dab engine - turns dab requests along a stroke into pixel buffers

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::parasite::{PipeBrushParasite, PipeCursor};
use super::Brush;
use crate::core::{BrushError, DabRequest, EngineConfig, PaintInformation};
use crate::dab::{ColorSpace, PixelBuffer};

/// Mutable state of one stroke: randomness and pipe selection indices
///
/// Brushes are shared read-only between strokes; everything that changes from
/// dab to dab lives here.
#[derive(Debug, Clone)]
pub struct StrokeCursor {
    config: EngineConfig,
    rng: StdRng,
    /// Selection state and the parasite it belongs to
    pipe: Option<(PipeBrushParasite, PipeCursor)>,
}

impl StrokeCursor {
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            pipe: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Selection state for `parasite`; starts fresh when the pipe changes
    pub(crate) fn pipe_state(
        &mut self,
        parasite: &PipeBrushParasite,
    ) -> (&mut PipeCursor, &mut StdRng) {
        if self
            .pipe
            .as_ref()
            .is_some_and(|(owner, _)| owner != parasite)
        {
            debug!("[StrokeCursor] Pipe changed, resetting selection state");
            self.pipe = None;
        }
        let (_, cursor) = self
            .pipe
            .get_or_insert_with(|| (parasite.clone(), PipeCursor::new(parasite)));
        (cursor, &mut self.rng)
    }

    pub fn pipe_cursor(&self) -> Option<&PipeCursor> {
        self.pipe.as_ref().map(|(_, cursor)| cursor)
    }
}

/// Entry point: holds configuration and starts strokes
#[derive(Debug, Clone, Default)]
pub struct DabEngine {
    config: EngineConfig,
}

impl DabEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a stroke with `brush`, producing dabs in `color_space`
    pub fn begin_stroke(&self, brush: Arc<Brush>, color_space: ColorSpace) -> Stroke {
        debug!(
            "[DabEngine] Stroke with '{}' ({:?}) in {:?}",
            brush.name(),
            brush.kind(),
            color_space
        );
        Stroke {
            brush,
            color_space,
            cursor: StrokeCursor::new(self.config),
        }
    }
}

/// One stroke in progress
#[derive(Debug)]
pub struct Stroke {
    brush: Arc<Brush>,
    color_space: ColorSpace,
    cursor: StrokeCursor,
}

impl Stroke {
    pub fn brush(&self) -> &Arc<Brush> {
        &self.brush
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn cursor(&self) -> &StrokeCursor {
        &self.cursor
    }

    /// Whether the brush wants a dab for this input
    pub fn can_paint(&self, info: &PaintInformation) -> bool {
        self.brush.can_paint_for(info, self.cursor.config())
    }

    /// Distance between dabs along x and y at `scale`
    pub fn spacing(&self, scale: f64) -> (f64, f64) {
        let base = self.brush.base();
        (base.x_spacing(scale), base.y_spacing(scale))
    }

    pub fn mask(&mut self, request: &DabRequest) -> Result<PixelBuffer, BrushError> {
        self.brush.mask(&mut self.cursor, self.color_space, request)
    }

    pub fn mask_with_color(
        &mut self,
        color: &[u8],
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        self.brush
            .mask_with_color(&mut self.cursor, self.color_space, color, request)
    }

    /// `source` must be in the stroke's colour space
    pub fn mask_with_source(
        &mut self,
        source: &PixelBuffer,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        if source.color_space() != self.color_space {
            return Err(BrushError::InvalidInput(format!(
                "Source is {:?}, stroke paints {:?}",
                source.color_space(),
                self.color_space
            )));
        }
        self.brush.mask_with_source(&mut self.cursor, source, request)
    }

    pub fn paint_device(&mut self, request: &DabRequest) -> Result<PixelBuffer, BrushError> {
        self.brush
            .paint_device(&mut self.cursor, self.color_space, request)
    }
}
