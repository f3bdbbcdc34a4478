//! Procedural brushes driven by a mask generator

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use super::{BrushBase, StrokeCursor, DEFAULT_SPACING};
use crate::core::{BrushError, DabRequest};
use crate::dab::{ColorSpace, ColoringSource, PixelBuffer};
use crate::generator::{MaskGenerator, MaskGeneratorKind};
use crate::mask::{mul_u8, rotated_extent, to_u8, PixelMask};

/// Spreads band seeds apart so neighbouring bands do not share a stream
const BAND_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct ProceduralBrush {
    base: BrushBase,
    generator: MaskGeneratorKind,
    softness: f64,
    randomness: f64,
    density: f64,
}

impl ProceduralBrush {
    pub fn new(generator: MaskGeneratorKind) -> Result<Self, BrushError> {
        let (w, h) = (generator.width(), generator.height());
        if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
            return Err(BrushError::InvalidInput(format!(
                "Generator size must be finite and positive, got {}x{}",
                w, h
            )));
        }
        let base = BrushBase::new(
            generator.id(),
            w.ceil() as usize,
            h.ceil() as usize,
            DEFAULT_SPACING,
        );
        Ok(Self {
            base,
            generator,
            softness: 1.0,
            randomness: 0.0,
            density: 1.0,
        })
    }

    pub fn base(&self) -> &BrushBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BrushBase {
        &mut self.base
    }

    pub fn generator(&self) -> &MaskGeneratorKind {
        &self.generator
    }

    pub fn softness(&self) -> f64 {
        self.softness
    }

    pub fn set_softness(&mut self, softness: f64) {
        self.softness = softness.clamp(0.0, 1.0);
    }

    pub fn randomness(&self) -> f64 {
        self.randomness
    }

    /// Amount of per-pixel opacity noise, 0..=1
    pub fn set_randomness(&mut self, randomness: f64) {
        self.randomness = randomness.clamp(0.0, 1.0);
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    /// Fraction of pixels kept, 0..=1
    pub fn set_density(&mut self, density: f64) {
        self.density = density.clamp(0.0, 1.0);
    }

    fn has_jitter(&self) -> bool {
        self.randomness > 0.0 || self.density < 1.0
    }

    /// Scale-1 coverage without jitter
    pub fn coverage(&self) -> PixelMask {
        self.generator
            .generate(self.base.width(), self.base.height(), self.softness)
    }

    pub(crate) fn generate_mask(
        &self,
        cursor: &mut StrokeCursor,
        color_space: ColorSpace,
        coloring: Option<&mut dyn ColoringSource>,
        request: &DabRequest,
    ) -> Result<PixelBuffer, BrushError> {
        let request = self.base.apply(request);
        let (scale_x, scale_y) = request.scale_xy();
        let (extent_w, extent_h) = rotated_extent(
            self.generator.width() * scale_x,
            self.generator.height() * scale_y,
            request.angle,
        );
        let width = (extent_w - 1e-6).ceil().max(0.0) as usize + 1;
        let height = (extent_h - 1e-6).ceil().max(0.0) as usize + 1;

        let mut buffer = PixelBuffer::new(width, height, color_space);
        buffer.fill_color(coloring);

        let seed = if self.has_jitter() {
            cursor.rng().gen::<u64>()
        } else {
            0
        };

        let (sin, cos) = request.angle.sin_cos();
        let fill = BandFill {
            generator: &self.generator,
            softness: self.softness,
            randomness: self.randomness,
            density: self.density,
            jitter: self.has_jitter(),
            pixel_size: color_space.pixel_size(),
            alpha_offset: color_space.alpha_offset(),
            row_stride: buffer.row_stride(),
            centre_x: (width - 1) as f64 / 2.0 + request.sub_pixel_x,
            centre_y: (height - 1) as f64 / 2.0 + request.sub_pixel_y,
            sin,
            cos,
            scale_x,
            scale_y,
        };

        let config = cursor.config();
        let workers = rayon::current_num_threads();
        let bands = if height > config.parallel_min_height && workers >= config.parallel_min_workers
        {
            workers.min(height)
        } else {
            1
        };

        if bands == 1 || fill.row_stride == 0 {
            fill.run(buffer.data_mut(), 0, seed);
        } else {
            let rows_per_band = height.div_ceil(bands);
            debug!(
                "[ProceduralBrush] {}x{} dab split into {} bands of {} rows",
                width, height, bands, rows_per_band
            );
            buffer
                .data_mut()
                .par_chunks_mut(rows_per_band * fill.row_stride)
                .enumerate()
                .for_each(|(band, chunk)| {
                    let band_seed = seed ^ (band as u64).wrapping_mul(BAND_SEED_MIX);
                    fill.run(chunk, band * rows_per_band, band_seed);
                });
        }

        Ok(buffer)
    }
}

/// Read-only state shared by all bands of one dab
struct BandFill<'a> {
    generator: &'a MaskGeneratorKind,
    softness: f64,
    randomness: f64,
    density: f64,
    jitter: bool,
    pixel_size: usize,
    alpha_offset: usize,
    row_stride: usize,
    centre_x: f64,
    centre_y: f64,
    sin: f64,
    cos: f64,
    scale_x: f64,
    scale_y: f64,
}

impl BandFill<'_> {
    /// Multiply the alpha of rows `first_row..` held in `rows` by the shape
    fn run(&self, rows: &mut [u8], first_row: usize, seed: u64) {
        if self.row_stride == 0 {
            return;
        }
        let mut rng = StdRng::seed_from_u64(seed);

        for (r, row) in rows.chunks_exact_mut(self.row_stride).enumerate() {
            let dy = (first_row + r) as f64 + 0.5 - self.centre_y;
            for (px, pixel) in row.chunks_exact_mut(self.pixel_size).enumerate() {
                let dx = px as f64 + 0.5 - self.centre_x;
                // Back into unrotated, unscaled shape space
                let x = (dx * self.cos + dy * self.sin) / self.scale_x;
                let y = (-dx * self.sin + dy * self.cos) / self.scale_y;

                let mut value = self.generator.value_at(x, y, self.softness);
                if self.jitter {
                    if self.density < 1.0 && rng.gen::<f64>() > self.density {
                        value = 0;
                    } else if self.randomness > 0.0 {
                        let factor = (1.0 - self.randomness) + self.randomness * rng.gen::<f64>();
                        value = to_u8(value as f64 * factor);
                    }
                }

                let alpha = &mut pixel[self.alpha_offset];
                *alpha = mul_u8(*alpha, value);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::generator::{CircleMaskGenerator, RectangleMaskGenerator};

    fn circle(diameter: f64, fade: f64) -> ProceduralBrush {
        ProceduralBrush::new(MaskGeneratorKind::Circle(CircleMaskGenerator::new(
            diameter, 1.0, fade, fade,
        )))
        .unwrap()
    }

    fn cursor(config: EngineConfig) -> StrokeCursor {
        StrokeCursor::new(EngineConfig {
            random_seed: Some(42),
            ..config
        })
    }

    #[test]
    fn empty_generator_is_rejected() {
        let generator = MaskGeneratorKind::Circle(CircleMaskGenerator::new(0.0, 1.0, 0.0, 0.0));
        assert!(ProceduralBrush::new(generator).is_err());
        let generator =
            MaskGeneratorKind::Circle(CircleMaskGenerator::new(f64::INFINITY, 1.0, 0.0, 0.0));
        assert!(matches!(
            ProceduralBrush::new(generator),
            Err(BrushError::InvalidInput(_))
        ));
    }

    #[test]
    fn dab_is_centred() {
        let brush = circle(10.0, 0.0);
        let dab = brush
            .generate_mask(
                &mut cursor(EngineConfig::default()),
                ColorSpace::Alpha8,
                None,
                &DabRequest::default(),
            )
            .unwrap();
        assert_eq!((dab.width(), dab.height()), (11, 11));
        assert_eq!(dab.alpha_at(5, 5), 255);
        assert_eq!(dab.alpha_at(0, 0), 0);
        assert_eq!(dab.alpha_at(5, 0), 255);
        assert_eq!(dab.alpha_at(10, 5), 0);
    }

    #[test]
    fn aspect_and_rotation_change_extent() {
        let brush = ProceduralBrush::new(MaskGeneratorKind::Rectangle(
            RectangleMaskGenerator::new(20.0, 0.25, 0.0, 0.0),
        ))
        .unwrap();
        let request = DabRequest {
            angle: std::f64::consts::FRAC_PI_2,
            ..DabRequest::default()
        };
        let dab = brush
            .generate_mask(
                &mut cursor(EngineConfig::default()),
                ColorSpace::Alpha8,
                None,
                &request,
            )
            .unwrap();
        assert_eq!((dab.width(), dab.height()), (6, 21));
    }

    #[test]
    fn parallel_bands_match_single_band_without_jitter() {
        let brush = circle(300.0, 0.6);
        let serial_config = EngineConfig {
            parallel_min_height: usize::MAX,
            ..EngineConfig::default()
        };
        let parallel_config = EngineConfig {
            parallel_min_height: 0,
            parallel_min_workers: 1,
            ..EngineConfig::default()
        };
        let request = DabRequest::default();
        let serial = brush
            .generate_mask(&mut cursor(serial_config), ColorSpace::Rgba8, None, &request)
            .unwrap();
        let parallel = brush
            .generate_mask(&mut cursor(parallel_config), ColorSpace::Rgba8, None, &request)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn jitter_is_repeatable_for_a_seed() {
        let mut brush = circle(40.0, 0.3);
        brush.set_density(0.5);
        brush.set_randomness(0.5);
        let request = DabRequest::default();
        let a = brush
            .generate_mask(&mut cursor(EngineConfig::default()), ColorSpace::Alpha8, None, &request)
            .unwrap();
        let b = brush
            .generate_mask(&mut cursor(EngineConfig::default()), ColorSpace::Alpha8, None, &request)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn density_thins_coverage() {
        let solid = circle(60.0, 0.0);
        let mut sparse = solid.clone();
        sparse.set_density(0.3);
        let request = DabRequest::default();
        let full = solid
            .generate_mask(&mut cursor(EngineConfig::default()), ColorSpace::Alpha8, None, &request)
            .unwrap()
            .to_mask()
            .total() as f64;
        let thinned = sparse
            .generate_mask(&mut cursor(EngineConfig::default()), ColorSpace::Alpha8, None, &request)
            .unwrap()
            .to_mask()
            .total() as f64;
        let ratio = thinned / full;
        assert!(ratio > 0.2 && ratio < 0.4, "ratio {}", ratio);
    }

    #[test]
    fn color_fill_precedes_mask() {
        let brush = circle(6.0, 0.0);
        let color = [9u8, 8, 7, 255];
        let mut coloring = crate::dab::PlainColoring::new(&color);
        let dab = brush
            .generate_mask(
                &mut cursor(EngineConfig::default()),
                ColorSpace::Rgba8,
                Some(&mut coloring),
                &DabRequest::default(),
            )
            .unwrap();
        assert_eq!(dab.pixel(3, 3).unwrap(), &[9, 8, 7, 255]);
        assert_eq!(dab.pixel(0, 0).unwrap(), &[9, 8, 7, 0]);
    }
}
