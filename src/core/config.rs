//! Engine configuration
//!
//! All tunables are carried in one value that is handed to
//! [`DabEngine::new`](crate::brush::DabEngine::new); nothing is read from globals.

use serde::{Deserialize, Serialize};

use super::errors::BrushError;

/// Tunable engine constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Procedural dabs taller than this are split into row bands
    pub parallel_min_height: usize,
    /// Minimum worker count before row bands are used
    pub parallel_min_workers: usize,
    /// Pointer movement (pixels) below which direction-dependent pipes skip the dab
    pub movement_threshold: f64,
    /// Spacing applied to brushes whose source carries none
    pub default_spacing: f64,
    /// Largest pyramid level, as a multiple of the source size
    pub maximum_scale: u32,
    /// Fixed seed for stroke randomness (`None` draws from entropy)
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_min_height: 100,
            parallel_min_workers: 4,
            movement_threshold: 0.5,
            default_spacing: 0.25,
            maximum_scale: 2,
            random_seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, BrushError> {
        let config: Self = serde_json::from_str(json)?;
        if config.maximum_scale == 0 {
            return Err(BrushError::InvalidInput(
                "maximumScale must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"parallelMinHeight": 64, "randomSeed": 7}"#).unwrap();
        assert_eq!(config.parallel_min_height, 64);
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.parallel_min_workers, 4);
        assert_eq!(config.maximum_scale, 2);
    }

    #[test]
    fn rejects_zero_maximum_scale() {
        assert!(EngineConfig::from_json(r#"{"maximumScale": 0}"#).is_err());
    }
}
