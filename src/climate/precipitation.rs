//! Precipitation model: an equatorial rain belt plus two mid-latitude belts.

use super::ClimateConfig;

const EQUATORIAL_SIGMA_DEG: f64 = 12.0;
const MIDLATITUDE_CENTER_DEG: f64 = 45.0;
const MIDLATITUDE_SIGMA_DEG: f64 = 15.0;
const MIDLATITUDE_WEIGHT: f64 = 0.6;

fn gaussian(x: f64, center: f64, sigma: f64) -> f64 {
    let d = (x - center) / sigma;
    (-0.5 * d * d).exp()
}

/// Relative wetness in `[0, 1]` at `latitude_rad`.
pub fn rain_belts(latitude_rad: f64) -> f64 {
    let lat = latitude_rad.to_degrees();
    let equatorial = gaussian(lat, 0.0, EQUATORIAL_SIGMA_DEG);
    let north = gaussian(lat, MIDLATITUDE_CENTER_DEG, MIDLATITUDE_SIGMA_DEG);
    let south = gaussian(lat, -MIDLATITUDE_CENTER_DEG, MIDLATITUDE_SIGMA_DEG);
    (equatorial + MIDLATITUDE_WEIGHT * (north + south)).clamp(0.0, 1.0)
}

/// Annual precipitation (mm/year) with the local noise sample applied. Never negative.
pub fn precipitation(latitude_rad: f64, noise: f64, cfg: &ClimateConfig) -> f64 {
    let base = cfg.max_precipitation * rain_belts(latitude_rad);
    (base * (1.0 + cfg.precipitation_noise_amplitude * noise)).max(0.0)
}
