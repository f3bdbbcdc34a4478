//! Request types exchanged with the stroke planner.

use serde::{Deserialize, Serialize};

use crate::core::errors::BrushError;

/// Continuous paint-input values sampled at one point of a stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintInformation {
    /// Pen pressure (0.0 - 1.0)
    pub pressure: f64,
    /// Horizontal tilt, normalized to [-1, 1]
    pub tilt_x: f64,
    /// Vertical tilt, normalized to [-1, 1]
    pub tilt_y: f64,
    /// Drawing speed, normalized to [0, 1]
    pub velocity: f64,
    /// Stroke direction in radians
    pub drawing_angle: f64,
    /// Movement since the previous sample, in pixels
    pub movement: (f64, f64),
}

impl Default for PaintInformation {
    fn default() -> Self {
        Self {
            pressure: 1.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            velocity: 0.0,
            drawing_angle: 0.0,
            movement: (0.0, 0.0),
        }
    }
}

impl PaintInformation {
    pub fn with_pressure(pressure: f64) -> Self {
        Self {
            pressure,
            ..Self::default()
        }
    }

    /// Length of the movement vector
    pub fn drawing_distance(&self) -> f64 {
        self.movement.0.hypot(self.movement.1)
    }
}

/// One dab request: shape, sub-pixel phase and paint inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DabRequest {
    pub scale: f64,
    /// Height / width of the dab
    pub aspect_ratio: f64,
    /// Rotation in radians
    pub angle: f64,
    pub sub_pixel_x: f64,
    pub sub_pixel_y: f64,
    pub info: PaintInformation,
}

impl Default for DabRequest {
    fn default() -> Self {
        Self {
            scale: 1.0,
            aspect_ratio: 1.0,
            angle: 0.0,
            sub_pixel_x: 0.0,
            sub_pixel_y: 0.0,
            info: PaintInformation::default(),
        }
    }
}

impl DabRequest {
    pub fn at_scale(scale: f64) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Horizontal and vertical scale after applying the aspect ratio
    pub fn scale_xy(&self) -> (f64, f64) {
        (self.scale, self.scale * self.aspect_ratio)
    }
}

pub fn validate_dab_request(request: &DabRequest) -> Result<(), BrushError> {
    if !request.scale.is_finite() || request.scale <= 0.0 {
        return Err(BrushError::InvalidInput(
            "Dab scale must be a positive finite number".to_string(),
        ));
    }
    if !request.aspect_ratio.is_finite() || request.aspect_ratio <= 0.0 {
        return Err(BrushError::InvalidInput(
            "Dab aspect ratio must be a positive finite number".to_string(),
        ));
    }
    if !request.angle.is_finite() {
        return Err(BrushError::InvalidInput(
            "Dab angle must be finite".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&request.sub_pixel_x) || !(0.0..1.0).contains(&request.sub_pixel_y) {
        return Err(BrushError::InvalidInput(
            "Sub-pixel offsets must be in [0, 1)".to_string(),
        ));
    }
    if !request.info.pressure.is_finite() || !(0.0..=1.0).contains(&request.info.pressure) {
        return Err(BrushError::InvalidInput(
            "Pressure must be in [0, 1]".to_string(),
        ));
    }
    Ok(())
}
