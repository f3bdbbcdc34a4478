//! Engine-wide contracts: errors, configuration and the dab request types
//! exchanged with the stroke planner.

pub mod config;
pub mod contracts;
pub mod errors;

pub use config::EngineConfig;
pub use contracts::{validate_dab_request, DabRequest, PaintInformation};
pub use errors::BrushError;
