use thiserror::Error;

use crate::format::FormatError;

#[derive(Debug, Error)]
pub enum BrushError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Brush format error: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Brush has no pixel data")]
    EmptyBrush,

    #[error("Font error: {0}")]
    Font(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Unknown brush: {0}")]
    UnknownBrush(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<BrushError> for String {
    fn from(err: BrushError) -> Self {
        err.to_string()
    }
}

impl From<quick_xml::Error> for BrushError {
    fn from(e: quick_xml::Error) -> Self {
        BrushError::Xml(e.to_string())
    }
}
