use thiserror::Error;

use super::GenerationState;
use crate::geometry::GeometryError;

/// Errors raised while generating or querying a world.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("degenerate input: {0}")]
    DegenerateInput(GeometryError),
    #[error("world is not ready (state: {state})")]
    InvalidState { state: GenerationState },
    #[error("query outside domain: {0}")]
    OutsideDomain(GeometryError),
    #[error("stage '{stage}' failed: {reason}")]
    StageFailed { stage: GenerationState, reason: String },
}

/// Erosion stopped at its iteration cap before settling.
///
/// Not fatal: the generator records it and still completes.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("erosion did not converge after {iterations} iterations (max delta {max_delta:.4})")]
pub struct ConvergenceNotReached {
    pub iterations: u32,
    pub max_delta: f64,
}
