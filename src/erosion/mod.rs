//! Hydrology and fluvial erosion.
//!
//! A hydrology pass builds the receiver forest and accumulated flow from the
//! current heights; the solver then lowers heights with an implicit
//! stream-power law. The orchestrator alternates the two until heights settle.

mod config;
pub mod hydrology;
mod solver;

pub use config::ErosionConfig;
pub use hydrology::{build_drainage_graph, mark_river_mouths, DrainageGraph, LakeMergeGraph};
pub use solver::{ErosionSolver, ErosionStep};
