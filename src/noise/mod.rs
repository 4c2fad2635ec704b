//! Noise services for terrain synthesis.
//!
//! Every stochastic field the simulation reads is an injected [`NoiseField`].
//! [`NoiseFields::from_config`] builds the default set on top of simdnoise fBm
//! and a wrap-aware cellular field.

mod cellular;
mod fractal;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use cellular::CellularNoise;
pub use fractal::{sample_fractal_noise, FractalNoise, FractalNoiseConfig};

/// A scalar field over the world plane.
pub trait NoiseField: Send + Sync {
    /// Samples the field at world position `(x, y)`. Values are roughly in `[-1, 1]`.
    fn evaluate(&self, x: f64, y: f64) -> f64;
}

impl<F> NoiseField for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Frequencies and octave counts for the default noise fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Cellular feature density of the plate field (features per world unit).
    pub plate_frequency: f64,
    /// Frequency of the domain warp applied before plate lookup.
    pub plate_warp_frequency: f64,
    /// Frequency of the per-cell uplift perturbation.
    pub uplift_frequency: f64,
    /// Frequency of the temperature perturbation.
    pub temperature_frequency: f64,
    /// Frequency of the precipitation perturbation.
    pub precipitation_frequency: f64,
    /// Frequency of the detail noise added to queried heights.
    pub height_overlay_frequency: f64,
    /// Amplitude of the detail noise added to queried heights.
    pub height_overlay_amplitude: f64,
    /// Octaves for every fBm field.
    pub octaves: u8,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            plate_frequency: 0.004,
            plate_warp_frequency: 0.003,
            uplift_frequency: 0.01,
            temperature_frequency: 0.004,
            precipitation_frequency: 0.005,
            height_overlay_frequency: 0.05,
            height_overlay_amplitude: 2.0,
            octaves: 4,
        }
    }
}

/// The injected noise services, one per field.
#[derive(Clone)]
pub struct NoiseFields {
    /// Piecewise-constant field whose buckets become plates.
    pub plates: Arc<dyn NoiseField>,
    /// Warp displacement; sampled twice (offset in `y`) for the two warp axes.
    pub plate_warp: Arc<dyn NoiseField>,
    pub uplift: Arc<dyn NoiseField>,
    pub temperature: Arc<dyn NoiseField>,
    pub precipitation: Arc<dyn NoiseField>,
    pub height_overlay: Arc<dyn NoiseField>,
}

impl NoiseFields {
    /// Builds the default fields for a domain of the given `width`.
    ///
    /// Every field gets its own seed derived from `seed`.
    pub fn from_config(seed: u64, width: f64, config: &NoiseConfig) -> Self {
        let fbm = |salt: u64, frequency: f64| -> Arc<dyn NoiseField> {
            let field_seed = mix64(seed ^ salt) as i32;
            Arc::new(FractalNoise::new(
                FractalNoiseConfig::new(field_seed, frequency as f32, config.octaves),
                width,
            ))
        };

        Self {
            plates: Arc::new(CellularNoise::new(
                mix64(seed ^ 0x01),
                config.plate_frequency,
                width,
            )),
            plate_warp: fbm(0x02, config.plate_warp_frequency),
            uplift: fbm(0x03, config.uplift_frequency),
            temperature: fbm(0x04, config.temperature_frequency),
            precipitation: fbm(0x05, config.precipitation_frequency),
            height_overlay: fbm(0x06, config.height_overlay_frequency),
        }
    }

    /// Every field returns `value`. Useful for deterministic tests.
    pub fn constant(value: f64) -> Self {
        let field: Arc<dyn NoiseField> = Arc::new(move |_: f64, _: f64| value);
        Self {
            plates: field.clone(),
            plate_warp: field.clone(),
            uplift: field.clone(),
            temperature: field.clone(),
            precipitation: field.clone(),
            height_overlay: field,
        }
    }
}

impl std::fmt::Debug for NoiseFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoiseFields { .. }")
    }
}

/// SplitMix64 finalizer.
pub(crate) fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_noise_fields() {
        let field = |x: f64, y: f64| x + y;
        assert_eq!(field.evaluate(1.0, 2.0), 3.0);
    }

    #[test]
    fn default_fields_are_deterministic() {
        let a = NoiseFields::from_config(1212, 2000.0, &NoiseConfig::default());
        let b = NoiseFields::from_config(1212, 2000.0, &NoiseConfig::default());
        for (x, y) in [(10.0, 20.0), (1500.0, 800.0)] {
            assert_eq!(a.plates.evaluate(x, y), b.plates.evaluate(x, y));
            assert_eq!(a.uplift.evaluate(x, y), b.uplift.evaluate(x, y));
        }
    }

    #[test]
    fn constant_fields() {
        let fields = NoiseFields::constant(0.25);
        assert_eq!(fields.temperature.evaluate(3.0, 4.0), 0.25);
        assert_eq!(fields.plates.evaluate(-3.0, 9.0), 0.25);
    }

    #[test]
    fn mix64_spreads_bits() {
        assert_ne!(mix64(1), mix64(2));
        assert_ne!(mix64(0), 0);
    }
}
