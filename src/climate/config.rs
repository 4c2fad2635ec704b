//! Climate configuration parameters.

use serde::{Deserialize, Serialize};

/// Configuration for the latitude-driven climate model.
///
/// Units:
/// - temperatures: °C
/// - heights: world units (the same units as cell heights)
/// - precipitation: mm/year
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    // Temperature model
    pub equatorial_temperature: f64,
    pub polar_temperature: f64,
    /// Cooling per unit of height above sea level.
    pub temperature_height_gradient: f64,
    pub temperature_noise_amplitude: f64,

    // Precipitation model
    pub max_precipitation: f64,
    /// Relative perturbation; 0.3 means ±30%.
    pub precipitation_noise_amplitude: f64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            equatorial_temperature: 30.0,
            polar_temperature: -25.0,
            temperature_height_gradient: 0.04,
            temperature_noise_amplitude: 3.0,

            max_precipitation: 3000.0,
            precipitation_noise_amplitude: 0.3,
        }
    }
}

impl ClimateConfig {
    pub fn earth_like() -> Self {
        Self::default()
    }

    /// Hotter and drier.
    pub fn arid() -> Self {
        Self {
            equatorial_temperature: 36.0,
            polar_temperature: -10.0,
            max_precipitation: 1200.0,
            ..Default::default()
        }
    }

    /// Colder overall, with little precipitation at the poles.
    pub fn glacial() -> Self {
        Self {
            equatorial_temperature: 18.0,
            polar_temperature: -40.0,
            max_precipitation: 2000.0,
            ..Default::default()
        }
    }
}
