//! Erosion configuration.

use serde::{Deserialize, Serialize};

/// Parameters for the stream-power erosion solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    /// Stream-power erodibility (K).
    pub erosion_rate: f64,
    /// Implicit timestep (dt).
    pub timestep: f64,
    /// Maximum hydrology/solver iterations.
    pub max_iterations: u32,
    /// Iteration stops once the largest height change falls below this.
    pub convergence_threshold: f64,
    /// Steepest allowed slope towards the receiver (radians). Typical: 30-45 degrees.
    pub max_slope_angle_rad: f64,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            erosion_rate: 0.05,
            timestep: 10.0,
            max_iterations: 60,
            convergence_threshold: 0.05,
            max_slope_angle_rad: 30_f64.to_radians(),
        }
    }
}

impl ErosionConfig {
    /// Fewer iterations with a looser threshold, for previews.
    pub fn fast() -> Self {
        Self {
            max_iterations: 20,
            convergence_threshold: 0.2,
            ..Default::default()
        }
    }

    /// More iterations and a tighter threshold.
    pub fn detailed() -> Self {
        Self {
            max_iterations: 200,
            convergence_threshold: 0.01,
            ..Default::default()
        }
    }
}
