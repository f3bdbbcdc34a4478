//! Brush file error types

use std::io;
use thiserror::Error;

/// Errors that can occur while reading or writing brush files
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Truncated data: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Header size is zero")]
    ZeroHeaderSize,

    #[error("Header size {0} is smaller than the fixed header")]
    HeaderTooSmall(u32),

    #[error("Brush has zero size ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("Spacing {0}% is out of range (0-1000)")]
    SpacingOutOfRange(u32),

    #[error("Unsupported pixel depth: {0} bytes per pixel")]
    UnsupportedDepth(u32),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid pipe header: {0}")]
    InvalidPipeHeader(String),

    #[error("Invalid parasite: {0}")]
    InvalidParasite(String),

    #[error("Invalid SVG: {0}")]
    InvalidSvg(String),

    #[error("Cell count mismatch: declared {declared}, ranks give {expected}, file has {available}")]
    CellCountMismatch {
        declared: usize,
        expected: usize,
        available: usize,
    },
}

impl From<FormatError> for String {
    fn from(err: FormatError) -> Self {
        err.to_string()
    }
}
