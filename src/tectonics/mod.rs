//! Plate tectonics approximation.
//!
//! This module implements:
//! - Plate assignment as a pure function of position (warped cellular noise buckets)
//! - Uplift seeding from relative plate motion across boundary edges
//! - Uplift propagation inland with distance decay

mod config;
mod plate;
pub mod uplift;

pub use config::TectonicConfig;
pub use plate::{assign_plates, plate_at, Plate, PlateId, PlateType};
pub use uplift::{propagate_uplift, seed_uplift, BoundaryType};
