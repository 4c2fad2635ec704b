//! Multi-octave fractal Brownian motion (fBm) noise generation.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;
use std::f64::consts::TAU;

use super::NoiseField;

/// Configuration for multi-octave fractal noise generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    /// Number of noise octaves (1-8 typical).
    pub octaves: u8,
    /// Base frequency in cycles per world unit.
    pub frequency: f32,
    /// Frequency multiplier per octave (typically 2.0).
    pub lacunarity: f32,
    /// Amplitude decay per octave (0.4-0.6 typical).
    pub persistence: f32,
    /// Random seed for reproducible generation.
    pub seed: i32,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            frequency: 0.005,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 42,
        }
    }
}

impl FractalNoiseConfig {
    /// Creates a configuration with the given seed and base frequency.
    pub fn new(seed: i32, frequency: f32, octaves: u8) -> Self {
        Self {
            octaves,
            frequency,
            seed,
            ..Default::default()
        }
    }
}

/// Samples fractal noise at a 3D position.
///
/// Uses 4D simplex noise with the w dimension set to 0.
///
/// # Returns
/// A noise value in approximately [-1, 1] range (normalized by amplitude sum)
pub fn sample_fractal_noise(pos: Vec3, config: &FractalNoiseConfig) -> f32 {
    let mut total = 0.0f32;
    let mut amplitude = 1.0f32;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for octave in 0..config.octaves.max(1) {
        // Each octave gets a different seed offset for variation
        let octave_seed = config.seed.wrapping_add(octave as i32 * 31337);

        let x = pos.x * frequency;
        let y = pos.y * frequency;
        let z = pos.z * frequency;

        let noise_value = NoiseBuilder::fbm_4d_offset(x, 1, y, 1, z, 1, 0.0, 1)
            .with_seed(octave_seed)
            .with_freq(1.0)
            .with_octaves(1)
            .generate()
            .0[0];

        total += noise_value * amplitude;
        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    total / max_amplitude
}

/// fBm over the wrapping domain.
///
/// The plane is rolled into a cylinder of circumference `width` before sampling,
/// so the field is periodic in `x` with no seam.
#[derive(Debug, Clone)]
pub struct FractalNoise {
    config: FractalNoiseConfig,
    width: f64,
}

impl FractalNoise {
    pub fn new(config: FractalNoiseConfig, width: f64) -> Self {
        Self { config, width }
    }

    fn embed(&self, x: f64, y: f64) -> Vec3 {
        let radius = self.width / TAU;
        let theta = TAU * x / self.width;
        Vec3::new(
            (theta.cos() * radius) as f32,
            (theta.sin() * radius) as f32,
            y as f32,
        )
    }
}

impl NoiseField for FractalNoise {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        sample_fractal_noise(self.embed(x, y), &self.config) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_reproducibility() {
        let noise = FractalNoise::new(FractalNoiseConfig::new(12345, 0.01, 4), 1000.0);
        assert_eq!(noise.evaluate(120.5, 33.0), noise.evaluate(120.5, 33.0));
    }

    #[test]
    fn test_noise_range() {
        let noise = FractalNoise::new(FractalNoiseConfig::default(), 2000.0);
        for i in 0..50 {
            let v = noise.evaluate(i as f64 * 37.0, i as f64 * 19.0);
            assert!((-1.5..=1.5).contains(&v), "noise value {} out of range", v);
        }
    }

    #[test]
    fn test_noise_wraps_horizontally() {
        let noise = FractalNoise::new(FractalNoiseConfig::new(7, 0.02, 3), 500.0);
        for y in [0.0, 40.0, 310.0] {
            let a = noise.evaluate(10.0, y);
            let b = noise.evaluate(510.0, y);
            assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_different_seeds_produce_different_results() {
        let a = FractalNoise::new(FractalNoiseConfig::new(1, 0.01, 4), 1000.0);
        let b = FractalNoise::new(FractalNoiseConfig::new(2, 0.01, 4), 1000.0);
        assert_ne!(a.evaluate(250.0, 125.0), b.evaluate(250.0, 125.0));
    }
}
