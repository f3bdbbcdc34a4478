//! Brush dab generation
//!
//! Turns a brush (raster, procedural, text or pipe) plus a dab request into a
//! small pixel buffer ready for compositing. Stroke planning and blitting live
//! in the caller.

pub mod brush;
pub mod core;
pub mod dab;
pub mod format;
pub mod generator;
pub mod mask;
pub mod pyramid;
pub mod resource;

pub use brush::{Brush, BrushKind, DabEngine, Stroke, StrokeCursor};
pub use crate::core::{BrushError, DabRequest, EngineConfig, PaintInformation};
pub use dab::{ColorSpace, PixelBuffer};
pub use resource::{BrushReference, BrushRegistry};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a `tracing` subscriber for applications embedding the engine.
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brush_dab=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::info!("brush-dab logging initialized");
}
