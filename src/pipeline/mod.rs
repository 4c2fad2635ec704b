//! Pipeline orchestration for world generation.
//!
//! A resumable state machine runs the stages in order and, once completed,
//! answers height, biome and debug queries at arbitrary positions.

mod config;
mod error;
mod events;
mod query;
mod stage;

pub use config::WorldConfig;
pub use error::{ConvergenceNotReached, GenerationError};
pub use events::GenerationEvent;
pub use query::CellDebug;
pub use stage::{GenerationHandle, GenerationState, Generator, Step, STEPS};
