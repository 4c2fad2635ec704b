//! Biome classification.
//!
//! Cells are classified from their final temperature, precipitation and
//! height through an injected [`BiomeClassifier`]. A regular [`BiomeGrid`] of
//! nearest-cell biomes then backs smooth per-position biome blending.

mod config;
mod grid;

pub use config::BiomeConfig;
pub use grid::BiomeGrid;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::terrain::World;

/// Biome classification. `as_u8()` is stable and used for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    Ocean = 0,
    IceCap = 1,
    Tundra = 2,
    BorealForest = 3,
    TemperateGrassland = 4,
    TemperateDeciduousForest = 5,
    TemperateRainforest = 6,
    SubtropicalDesert = 7,
    Savanna = 8,
    TropicalSeasonalForest = 9,
    TropicalRainforest = 10,
    Mountain = 11,
}

impl Biome {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_land(self) -> bool {
        self != Biome::Ocean
    }

    /// RGB preview color for this biome.
    pub fn preview_rgb(self) -> [u8; 3] {
        match self {
            Biome::Ocean => [28, 60, 120],
            Biome::IceCap => [240, 248, 255],
            Biome::Tundra => [170, 190, 170],
            Biome::BorealForest => [30, 80, 40],
            Biome::TemperateGrassland => [130, 180, 90],
            Biome::TemperateDeciduousForest => [40, 120, 60],
            Biome::TemperateRainforest => [20, 100, 60],
            Biome::SubtropicalDesert => [220, 205, 140],
            Biome::Savanna => [190, 190, 95],
            Biome::TropicalSeasonalForest => [50, 150, 70],
            Biome::TropicalRainforest => [20, 140, 55],
            Biome::Mountain => [140, 140, 140],
        }
    }
}

/// Maps a cell's climate and height to a biome.
pub trait BiomeClassifier: Send + Sync {
    /// # Arguments
    /// * `temperature` - Mean temperature (°C)
    /// * `precipitation` - Annual precipitation (mm/year)
    /// * `height` - Surface height
    fn classify(&self, temperature: f64, precipitation: f64, height: f64) -> Biome;
}

/// Whittaker-like lookup on temperature and precipitation, with ocean below
/// sea level and mountain above a height threshold.
#[derive(Debug, Clone, Default)]
pub struct WhittakerClassifier {
    config: BiomeConfig,
}

impl WhittakerClassifier {
    pub fn new(config: BiomeConfig) -> Self {
        Self { config }
    }
}

impl BiomeClassifier for WhittakerClassifier {
    fn classify(&self, temperature: f64, precipitation: f64, height: f64) -> Biome {
        let cfg = &self.config;
        if height <= cfg.sea_level {
            return Biome::Ocean;
        }
        if height >= cfg.sea_level + cfg.mountain_height {
            return Biome::Mountain;
        }

        if temperature <= cfg.ice_temperature {
            return Biome::IceCap;
        }

        if temperature < 0.0 {
            if precipitation < 350.0 {
                return Biome::Tundra;
            }
            return Biome::BorealForest;
        }

        if temperature >= cfg.tropical_temperature {
            if precipitation >= 2500.0 {
                return Biome::TropicalRainforest;
            }
            if precipitation >= 1200.0 {
                return Biome::TropicalSeasonalForest;
            }
            if precipitation >= 450.0 {
                return Biome::Savanna;
            }
            return Biome::SubtropicalDesert;
        }

        if precipitation >= 1600.0 {
            return Biome::TemperateRainforest;
        }
        if precipitation >= 800.0 {
            return Biome::TemperateDeciduousForest;
        }
        if precipitation >= 350.0 {
            return Biome::TemperateGrassland;
        }
        Biome::SubtropicalDesert
    }
}

/// Classifies every cell. Returns the number of land cells.
pub fn classify_world(world: &mut World, classifier: &dyn BiomeClassifier) -> usize {
    let biomes: Vec<Biome> = world
        .cells
        .par_iter()
        .map(|c| classifier.classify(c.temperature, c.precipitation, c.height))
        .collect();

    let mut land = 0;
    for (cell, biome) in world.cells.iter_mut().zip(biomes) {
        if biome.is_land() {
            land += 1;
        }
        cell.biome = Some(biome);
    }
    land
}

pub(crate) fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::test_support::grid_world;

    #[test]
    fn classifier_covers_climate_bands() {
        let c = WhittakerClassifier::default();
        assert_eq!(c.classify(25.0, 3000.0, -5.0), Biome::Ocean);
        assert_eq!(c.classify(25.0, 3000.0, 500.0), Biome::Mountain);
        assert_eq!(c.classify(-15.0, 500.0, 10.0), Biome::IceCap);
        assert_eq!(c.classify(-5.0, 200.0, 10.0), Biome::Tundra);
        assert_eq!(c.classify(-5.0, 800.0, 10.0), Biome::BorealForest);
        assert_eq!(c.classify(25.0, 3000.0, 10.0), Biome::TropicalRainforest);
        assert_eq!(c.classify(25.0, 600.0, 10.0), Biome::Savanna);
        assert_eq!(c.classify(25.0, 100.0, 10.0), Biome::SubtropicalDesert);
        assert_eq!(c.classify(12.0, 1000.0, 10.0), Biome::TemperateDeciduousForest);
        assert_eq!(c.classify(12.0, 400.0, 10.0), Biome::TemperateGrassland);
    }

    #[test]
    fn classify_world_sets_every_cell() {
        let mut world = grid_world(6, 6, 10.0);
        for cell in &mut world.cells {
            cell.temperature = 15.0;
            cell.precipitation = 1000.0;
            cell.height = if cell.id < 18 { -10.0 } else { 20.0 };
        }
        let land = classify_world(&mut world, &WhittakerClassifier::default());
        assert_eq!(land, 18);
        assert_eq!(world.cells[0].biome, Some(Biome::Ocean));
        assert_eq!(world.cells[30].biome, Some(Biome::TemperateDeciduousForest));
    }

    #[test]
    fn custom_classifier_is_used() {
        struct AlwaysDesert;
        impl BiomeClassifier for AlwaysDesert {
            fn classify(&self, _: f64, _: f64, _: f64) -> Biome {
                Biome::SubtropicalDesert
            }
        }
        let mut world = grid_world(4, 4, 10.0);
        classify_world(&mut world, &AlwaysDesert);
        assert!(world.cells.iter().all(|c| c.biome == Some(Biome::SubtropicalDesert)));
    }

    #[test]
    fn smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-12);
    }
}
