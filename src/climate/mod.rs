//! Climate: latitude-driven temperature and precipitation.
//!
//! Sea-level values are set when cells are created so that hydrology can
//! weight discharge by precipitation; the height lapse is applied once
//! erosion has settled the terrain.

mod config;
pub mod precipitation;
pub mod temperature;

pub use config::ClimateConfig;

use rayon::prelude::*;

use crate::noise::NoiseFields;
use crate::terrain::World;

/// Sets sea-level temperature and precipitation on every cell.
pub fn initialize_climate(world: &mut World, noise: &NoiseFields, cfg: &ClimateConfig) {
    let bounds = world.bounds();
    let values: Vec<(f64, f64)> = world
        .cells
        .par_iter()
        .map(|cell| {
            let p = cell.position;
            let lat = bounds.latitude(p.y);
            (
                temperature::temperature(lat, noise.temperature.evaluate(p.x, p.y), cfg),
                precipitation::precipitation(lat, noise.precipitation.evaluate(p.x, p.y), cfg),
            )
        })
        .collect();

    for (cell, (t, p)) in world.cells.iter_mut().zip(values) {
        cell.temperature = t;
        cell.precipitation = p;
    }
}

/// Cools cells above sea level by the temperature-height gradient.
pub fn apply_lapse_rate(world: &mut World, cfg: &ClimateConfig) {
    world.cells.par_iter_mut().for_each(|cell| {
        cell.temperature = temperature::lapse_corrected(cell.temperature, cell.height, cfg);
    });
}
