use serde::{Deserialize, Serialize};

use super::{effective_fades, MaskGenerator};
use crate::mask::{to_u8, OPACITY_TRANSPARENT};

/// Axis-aligned rectangle with fades measured inwards from each edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectangleMaskGenerator {
    pub diameter: f64,
    pub ratio: f64,
    pub h_fade: f64,
    pub v_fade: f64,
}

impl RectangleMaskGenerator {
    pub fn new(diameter: f64, ratio: f64, h_fade: f64, v_fade: f64) -> Self {
        Self {
            diameter: diameter.max(0.0),
            ratio: ratio.clamp(0.0, 1.0),
            h_fade: h_fade.clamp(0.0, 1.0),
            v_fade: v_fade.clamp(0.0, 1.0),
        }
    }
}

#[inline]
fn edge_falloff(n: f64, fade: f64) -> f64 {
    if fade <= 0.0 {
        return 0.0;
    }
    ((n - (1.0 - fade)) / fade).clamp(0.0, 1.0)
}

impl MaskGenerator for RectangleMaskGenerator {
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

        let nx = x.abs() / rx;
        let ny = y.abs() / ry;
        if nx > 1.0 || ny > 1.0 {
            return OPACITY_TRANSPARENT;
        }

        let (fh, fv) = effective_fades(self.h_fade, self.v_fade, softness);
        let coverage = (1.0 - edge_falloff(nx, fh)) * (1.0 - edge_falloff(ny, fv));
        to_u8(255.0 * coverage)
    }
}
