use serde::{Deserialize, Serialize};

use super::{effective_fades, MaskGenerator};
use crate::mask::{to_u8, OPACITY_OPAQUE, OPACITY_TRANSPARENT};

/// Ellipse with independent horizontal and vertical fade bands
///
/// `ratio` is height / width. Fades are fractions of the radius over which
/// coverage falls from opaque to transparent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMaskGenerator {
    pub diameter: f64,
    pub ratio: f64,
    pub h_fade: f64,
    pub v_fade: f64,
}

impl CircleMaskGenerator {
    pub fn new(diameter: f64, ratio: f64, h_fade: f64, v_fade: f64) -> Self {
        Self {
            diameter: diameter.max(0.0),
            ratio: ratio.clamp(0.0, 1.0),
            h_fade: h_fade.clamp(0.0, 1.0),
            v_fade: v_fade.clamp(0.0, 1.0),
        }
    }
}

impl MaskGenerator for CircleMaskGenerator {
    fn width(&self) -> f64 {
        self.diameter
    }

    fn height(&self) -> f64 {
        self.diameter * self.ratio
    }

    fn value_at(&self, x: f64, y: f64, softness: f64) -> u8 {
        let rx = self.width() / 2.0;
        let ry = self.height() / 2.0;
        if rx <= 0.0 || ry <= 0.0 {
            return OPACITY_TRANSPARENT;
        }

        let nx = x / rx;
        let ny = y / ry;
        let n = nx.hypot(ny);
        if n > 1.0 {
            return OPACITY_TRANSPARENT;
        }

        let (fh, fv) = effective_fades(self.h_fade, self.v_fade, softness);
        if fh <= 0.0 && fv <= 0.0 {
            return OPACITY_OPAQUE;
        }

        let inner_x = 1.0 - fh;
        let inner_y = 1.0 - fv;
        if inner_x <= f64::EPSILON || inner_y <= f64::EPSILON {
            // Fade reaches the centre: linear falloff along the radius
            return to_u8(255.0 * (1.0 - n));
        }

        let inner = (nx / inner_x).hypot(ny / inner_y);
        if inner <= 1.0 || n <= 0.0 {
            return OPACITY_OPAQUE;
        }

        // Position of the point between the inner and outer ellipse along its ray
        let fraction = (1.0 - 1.0 / inner) / (1.0 / n - 1.0 / inner);
        to_u8(255.0 * (1.0 - fraction.clamp(0.0, 1.0)))
    }
}
