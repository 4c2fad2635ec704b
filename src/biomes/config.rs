//! Biome configuration.

use serde::{Deserialize, Serialize};

/// Configuration for biome classification and the biome lookup grid.
///
/// Notes:
/// - Heights are in world units, the same as cell heights.
/// - Temperatures are °C.
/// - Precipitation is mm/year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    /// Sea level. Cells at or below this are ocean.
    pub sea_level: f64,
    /// Land at or above this height is classified as mountain.
    pub mountain_height: f64,
    /// Spacing of the regular biome grid; `0` uses the minimum cell distance.
    pub grid_spacing: f64,

    // Whittaker thresholds
    pub ice_temperature: f64,
    pub tropical_temperature: f64,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            sea_level: 0.0,
            mountain_height: 150.0,
            grid_spacing: 0.0,

            ice_temperature: -10.0,
            tropical_temperature: 20.0,
        }
    }
}

impl BiomeConfig {
    /// Grid spacing to use, falling back to `min_cell_distance` when unset.
    pub fn effective_spacing(&self, min_cell_distance: f64) -> f64 {
        if self.grid_spacing > 0.0 {
            self.grid_spacing
        } else {
            min_cell_distance
        }
    }
}
