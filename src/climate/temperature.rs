//! Temperature model.

use super::ClimateConfig;

/// Sea-level temperature (°C) at `latitude_rad` before noise.
pub fn base_temperature(latitude_rad: f64, cfg: &ClimateConfig) -> f64 {
    cfg.polar_temperature + (cfg.equatorial_temperature - cfg.polar_temperature) * latitude_rad.cos()
}

/// Sea-level temperature (°C) with the local noise sample applied.
pub fn temperature(latitude_rad: f64, noise: f64, cfg: &ClimateConfig) -> f64 {
    base_temperature(latitude_rad, cfg) + cfg.temperature_noise_amplitude * noise
}

/// Applies the height lapse to a sea-level temperature. Only land above sea level cools.
pub fn lapse_corrected(temperature: f64, height: f64, cfg: &ClimateConfig) -> f64 {
    if height > 0.0 {
        temperature - height * cfg.temperature_height_gradient
    } else {
        temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn equator_is_warmer_than_pole() {
        let cfg = ClimateConfig::default();
        assert!((base_temperature(0.0, &cfg) - cfg.equatorial_temperature).abs() < 1e-12);
        assert!((base_temperature(FRAC_PI_2, &cfg) - cfg.polar_temperature).abs() < 1e-9);
        assert!((base_temperature(-FRAC_PI_2, &cfg) - cfg.polar_temperature).abs() < 1e-9);
    }

    #[test]
    fn noise_shifts_temperature() {
        let cfg = ClimateConfig::default();
        let t = temperature(0.3, 1.0, &cfg);
        assert!((t - base_temperature(0.3, &cfg) - cfg.temperature_noise_amplitude).abs() < 1e-12);
    }

    #[test]
    fn higher_ground_is_colder_by_gradient() {
        let cfg = ClimateConfig::default();
        let t = lapse_corrected(20.0, 100.0, &cfg);
        assert!((t - (20.0 - 100.0 * cfg.temperature_height_gradient)).abs() < 1e-12);
        // ocean floor is not warmed
        assert_eq!(lapse_corrected(20.0, -50.0, &cfg), 20.0);
    }
}
