//! Terrain state.
//!
//! Provides the [`Cell`] and [`World`] structures that every pipeline stage
//! reads and fills in place.

mod cell;
mod world;

pub use cell::Cell;
pub use world::World;

#[cfg(test)]
pub(crate) use world::test_support;
