//! Configuration for tectonic simulation.

use serde::{Deserialize, Serialize};

/// Configuration parameters for plate assignment and uplift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TectonicConfig {
    /// Probability that a plate is continental (0.3-0.4 for Earth-like).
    pub continent_ratio: f64,
    /// Width of the noise buckets that become plates. Larger values merge
    /// neighbouring cellular regions into fewer, larger plates.
    pub plate_merge_ratio: f64,
    /// Displacement of the domain warp applied before plate lookup (world units).
    pub plate_warp_strength: f64,

    /// Maximum plate speed (world units per step).
    pub max_tectonic_movement: f64,
    /// Uplift produced by a head-on continental collision at full speed.
    pub max_uplift: f64,

    /// Multiplicative decay per `min_cell_distance` travelled during propagation (0-1].
    pub uplift_decay: f64,
    /// Random roughness of propagated uplift (0-1).
    pub uplift_sharpness: f64,

    /// Initial depth of oceanic cells below sea level.
    pub ocean_depth: f64,
}

impl Default for TectonicConfig {
    fn default() -> Self {
        Self {
            continent_ratio: 0.4,
            plate_merge_ratio: 0.12,
            plate_warp_strength: 60.0,
            max_tectonic_movement: 1.0,
            max_uplift: 1.0,
            uplift_decay: 0.8,
            uplift_sharpness: 0.3,
            ocean_depth: 20.0,
        }
    }
}

impl TectonicConfig {
    /// Creates a configuration suitable for Earth-like worlds.
    pub fn earth_like() -> Self {
        Self::default()
    }

    /// Many small, fast plates (more active tectonics).
    pub fn active() -> Self {
        Self {
            plate_merge_ratio: 0.06,
            max_tectonic_movement: 1.6,
            max_uplift: 1.4,
            uplift_decay: 0.85,
            ..Default::default()
        }
    }

    /// Few large, slow plates (more stable tectonics).
    pub fn stable() -> Self {
        Self {
            plate_merge_ratio: 0.25,
            max_tectonic_movement: 0.5,
            max_uplift: 0.7,
            uplift_decay: 0.7,
            ..Default::default()
        }
    }
}
