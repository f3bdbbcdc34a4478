//! Brush file formats
//!
//! Supports:
//! - .gbr single raster brushes (gray mask or RGBA)
//! - .gih image pipes (a selection descriptor plus .gbr cells)
//! - .svg vector tips, rasterized once at their intrinsic size

mod error;
pub mod gbr;
pub mod gih;
pub mod svg;

#[cfg(test)]
mod tests;

use std::path::Path;

pub use error::FormatError;
pub use gbr::{GbrHeader, GbrParser, GbrWriter};
pub use gih::{GihParser, GihWriter};
pub use svg::SvgParser;

/// Brush file kinds recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushFileType {
    Gbr,
    Gih,
    Svg,
}

impl BrushFileType {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gbr" => Some(BrushFileType::Gbr),
            "gih" => Some(BrushFileType::Gih),
            "svg" => Some(BrushFileType::Svg),
            _ => None,
        }
    }
}
