//! Aggregated world configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::GenerationError;
use crate::biomes::BiomeConfig;
use crate::climate::ClimateConfig;
use crate::erosion::ErosionConfig;
use crate::geometry::Bounds;
use crate::noise::NoiseConfig;
use crate::tectonics::TectonicConfig;

/// Every tunable of a generation run.
///
/// Deserializable from TOML; missing tables and fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub bounds: Bounds,
    /// Minimum distance between sample points.
    pub min_cell_distance: f64,
    /// Candidate attempts before a Poisson sample retires.
    pub poisson_iterations: u32,

    pub noise: NoiseConfig,
    pub tectonics: TectonicConfig,
    pub erosion: ErosionConfig,
    pub climate: ClimateConfig,
    pub biomes: BiomeConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 1212,
            bounds: Bounds::default(),
            min_cell_distance: 25.0,
            poisson_iterations: 30,
            noise: NoiseConfig::default(),
            tectonics: TectonicConfig::default(),
            erosion: ErosionConfig::default(),
            climate: ClimateConfig::default(),
            biomes: BiomeConfig::default(),
        }
    }
}

fn check(ok: bool, what: &str) -> Result<(), GenerationError> {
    if ok {
        Ok(())
    } else {
        Err(GenerationError::Configuration(what.to_string()))
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl WorldConfig {
    pub fn new(seed: u64, bounds: Bounds) -> Self {
        Self {
            seed,
            bounds,
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, GenerationError> {
        toml::from_str(text).map_err(|e| GenerationError::Configuration(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenerationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::Configuration(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let d = self.min_cell_distance;
        check(positive(d), "min_cell_distance must be positive")?;
        check(positive(self.bounds.width), "bounds.width must be positive")?;
        check(positive(self.bounds.height), "bounds.height must be positive")?;
        check(
            self.bounds.width >= 8.0 * d && self.bounds.height >= 8.0 * d,
            "bounds must span at least 8 cell distances in each direction",
        )?;
        check(self.poisson_iterations >= 1, "poisson_iterations must be at least 1")?;

        let n = &self.noise;
        check(
            [
                n.plate_frequency,
                n.plate_warp_frequency,
                n.uplift_frequency,
                n.temperature_frequency,
                n.precipitation_frequency,
                n.height_overlay_frequency,
            ]
            .into_iter()
            .all(positive),
            "noise frequencies must be positive",
        )?;
        check(n.octaves >= 1, "noise.octaves must be at least 1")?;
        check(n.height_overlay_amplitude.is_finite(), "noise.height_overlay_amplitude must be finite")?;

        let t = &self.tectonics;
        check(
            (0.0..=1.0).contains(&t.continent_ratio),
            "tectonics.continent_ratio must be in [0, 1]",
        )?;
        check(positive(t.plate_merge_ratio), "tectonics.plate_merge_ratio must be positive")?;
        check(positive(t.max_tectonic_movement), "tectonics.max_tectonic_movement must be positive")?;
        check(t.max_uplift.is_finite() && t.max_uplift >= 0.0, "tectonics.max_uplift must be non-negative")?;
        check(
            t.uplift_decay > 0.0 && t.uplift_decay <= 1.0,
            "tectonics.uplift_decay must be in (0, 1]",
        )?;
        check(t.uplift_sharpness.is_finite() && t.uplift_sharpness >= 0.0, "tectonics.uplift_sharpness must be non-negative")?;
        check(t.ocean_depth.is_finite() && t.ocean_depth >= 0.0, "tectonics.ocean_depth must be non-negative")?;

        let e = &self.erosion;
        check(positive(e.erosion_rate), "erosion.erosion_rate must be positive")?;
        check(positive(e.timestep), "erosion.timestep must be positive")?;
        check(e.max_iterations >= 1, "erosion.max_iterations must be at least 1")?;
        check(positive(e.convergence_threshold), "erosion.convergence_threshold must be positive")?;
        check(
            e.max_slope_angle_rad > 0.0 && e.max_slope_angle_rad < std::f64::consts::FRAC_PI_2,
            "erosion.max_slope_angle_rad must be in (0, pi/2)",
        )?;

        let c = &self.climate;
        check(
            c.equatorial_temperature.is_finite() && c.polar_temperature.is_finite(),
            "climate temperatures must be finite",
        )?;
        check(
            c.max_precipitation.is_finite() && c.max_precipitation >= 0.0,
            "climate.max_precipitation must be non-negative",
        )?;
        check(
            c.temperature_height_gradient.is_finite(),
            "climate.temperature_height_gradient must be finite",
        )?;

        check(
            self.biomes.grid_spacing.is_finite() && self.biomes.grid_spacing >= 0.0,
            "biomes.grid_spacing must be non-negative",
        )?;
        Ok(())
    }

    /// Spacing of the biome lookup grid.
    pub fn biome_grid_spacing(&self) -> f64 {
        self.biomes.effective_spacing(self.min_cell_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = WorldConfig::from_toml_str(
            r#"
            seed = 7
            min_cell_distance = 40.0

            [bounds]
            width = 800.0
            height = 600.0

            [tectonics]
            continent_ratio = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.bounds, Bounds::new(800.0, 600.0));
        assert_eq!(cfg.tectonics.continent_ratio, 0.3);
        assert_eq!(cfg.erosion.max_iterations, ErosionConfig::default().max_iterations);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = WorldConfig::from_toml_str("seed = \"x\"").unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = WorldConfig::default();
        cfg.tectonics.continent_ratio = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = WorldConfig::default();
        cfg.bounds = Bounds::new(100.0, 100.0);
        assert!(cfg.validate().is_err());

        let mut cfg = WorldConfig::default();
        cfg.erosion.max_iterations = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn biome_spacing_falls_back_to_cell_distance() {
        let mut cfg = WorldConfig::default();
        assert_eq!(cfg.biome_grid_spacing(), cfg.min_cell_distance);
        cfg.biomes.grid_spacing = 12.0;
        assert_eq!(cfg.biome_grid_spacing(), 12.0);
    }
}
