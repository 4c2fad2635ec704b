//! Implicit stream-power erosion.
//!
//! Each cell is updated against its already-updated receiver:
//!
//! ```text
//! H' = (H + dt·(U + K·√A·H_r / L)) / (1 + K·√A·dt / L)
//! ```
//!
//! then clamped to `H_r + L·tan(max_slope)`. Cells are processed in
//! breadth-first levels from the river mouths, so every receiver is final
//! before its children are touched.

use rayon::prelude::*;

use super::{DrainageGraph, ErosionConfig};

/// Outcome of one solver iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErosionStep {
    /// Largest absolute height change.
    pub max_delta: f64,
    /// Number of cells updated.
    pub updated: usize,
    /// True when `max_delta` fell below the convergence threshold.
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ErosionSolver {
    erosion_rate: f64,
    timestep: f64,
    max_slope: f64,
    threshold: f64,
}

impl ErosionSolver {
    pub fn new(config: &ErosionConfig) -> Self {
        Self {
            erosion_rate: config.erosion_rate,
            timestep: config.timestep,
            max_slope: config.max_slope_angle_rad.tan(),
            threshold: config.convergence_threshold,
        }
    }

    /// New height of a single cell.
    ///
    /// # Arguments
    /// * `height` - Current height
    /// * `receiver_height` - Updated height of the receiver
    /// * `uplift` - Uplift rate
    /// * `drainage_area` - Accumulated upstream area
    /// * `distance` - Distance to the receiver
    pub fn update_height(
        &self,
        height: f64,
        receiver_height: f64,
        uplift: f64,
        drainage_area: f64,
        distance: f64,
    ) -> f64 {
        let factor = self.erosion_rate * drainage_area.sqrt() * self.timestep / distance;
        let eroded = (height + self.timestep * uplift + factor * receiver_height) / (1.0 + factor);
        eroded.min(receiver_height + distance * self.max_slope)
    }

    /// Height at which erosion exactly balances uplift.
    pub fn steady_state_height(
        &self,
        receiver_height: f64,
        uplift: f64,
        drainage_area: f64,
        distance: f64,
    ) -> f64 {
        receiver_height + uplift * distance / (self.erosion_rate * drainage_area.sqrt())
    }

    /// Runs one iteration over every cell drained by a river mouth.
    ///
    /// Mouths and cells in undrained lakes keep their heights.
    pub fn step(&self, graph: &DrainageGraph, heights: &mut [f64], uplift: &[f64]) -> ErosionStep {
        let mut max_delta = 0.0f64;
        let mut updated = 0;
        let mut level: Vec<usize> = graph.mouths.clone();

        loop {
            let next: Vec<usize> = level
                .iter()
                .flat_map(|&cell| graph.children[cell].iter().copied())
                .collect();
            if next.is_empty() {
                break;
            }

            let current: &[f64] = heights;
            let results: Vec<(usize, f64)> = next
                .par_iter()
                .filter_map(|&cell| {
                    let receiver = graph.receivers[cell]?;
                    let h = self.update_height(
                        current[cell],
                        current[receiver],
                        uplift[cell],
                        graph.drainage_area[cell],
                        graph.receiver_distance[cell],
                    );
                    Some((cell, h))
                })
                .collect();

            for (cell, h) in results {
                max_delta = max_delta.max((h - heights[cell]).abs());
                heights[cell] = h;
                updated += 1;
            }
            level = next;
        }

        ErosionStep {
            max_delta,
            updated,
            converged: max_delta < self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cells 0..5 in a line, each draining into the previous one; cell 0 is the mouth.
    fn chain(n: usize) -> DrainageGraph {
        let receivers: Vec<Option<usize>> = (0..n).map(|i| i.checked_sub(1)).collect();
        DrainageGraph::from_receivers(
            receivers,
            vec![1.0; n],
            vec![0],
            &vec![true; n],
            &vec![1.0; n],
            &vec![1.0; n],
        )
    }

    #[test]
    fn chain_drainage_areas() {
        let graph = chain(5);
        assert_eq!(graph.drainage_area, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn five_cell_chain_reaches_analytic_steady_state() {
        let config = ErosionConfig {
            erosion_rate: 0.1,
            timestep: 10.0,
            max_iterations: 200,
            convergence_threshold: 1e-9,
            max_slope_angle_rad: 80_f64.to_radians(),
        };
        let solver = ErosionSolver::new(&config);
        let graph = chain(5);
        let uplift = vec![0.01; 5];
        let mut heights = vec![0.0; 5];

        let mut converged = false;
        for _ in 0..config.max_iterations {
            if solver.step(&graph, &mut heights, &uplift).converged {
                converged = true;
                break;
            }
        }
        assert!(converged);

        let mut expected = 0.0;
        assert_eq!(heights[0], 0.0);
        for i in 1..5 {
            expected = solver.steady_state_height(expected, 0.01, graph.drainage_area[i], 1.0);
            assert!(
                (heights[i] - expected).abs() < 1e-6,
                "cell {}: {} vs {}",
                i,
                heights[i],
                expected
            );
        }
        // H1 = U·L / (K·√4)
        assert!((heights[1] - 0.05).abs() < 1e-6);
    }

    #[test]
    fn steady_state_does_not_depend_on_timestep() {
        let graph = chain(5);
        let uplift = vec![0.02; 5];
        let mut finals = Vec::new();
        for dt in [1.0, 5.0, 50.0] {
            let config = ErosionConfig {
                erosion_rate: 0.1,
                timestep: dt,
                convergence_threshold: 1e-10,
                max_slope_angle_rad: 80_f64.to_radians(),
                ..Default::default()
            };
            let solver = ErosionSolver::new(&config);
            let mut heights = vec![0.0; 5];
            for _ in 0..5000 {
                if solver.step(&graph, &mut heights, &uplift).converged {
                    break;
                }
            }
            finals.push(heights[4]);
        }
        assert!((finals[0] - finals[1]).abs() < 1e-6);
        assert!((finals[1] - finals[2]).abs() < 1e-6);
    }

    #[test]
    fn slope_is_capped_after_one_pass() {
        let config = ErosionConfig {
            max_slope_angle_rad: 30_f64.to_radians(),
            ..Default::default()
        };
        let solver = ErosionSolver::new(&config);
        let graph = chain(5);
        let uplift = vec![100.0; 5];
        let mut heights = vec![0.0, 50.0, 100.0, 150.0, 200.0];

        let step = solver.step(&graph, &mut heights, &uplift);
        assert_eq!(step.updated, 4);
        let tan = 30_f64.to_radians().tan();
        for i in 1..5 {
            assert!(heights[i] <= heights[i - 1] + 1.0 * tan + 1e-9);
        }
    }

    #[test]
    fn mouths_and_undrained_lakes_keep_their_heights() {
        // 0 is a mouth with child 1; 2 is an undrained lake root with child 3
        let receivers = vec![None, Some(0), None, Some(2)];
        let graph = DrainageGraph::from_receivers(
            receivers,
            vec![0.0, 1.0, 0.0, 1.0],
            vec![0],
            &[true; 4],
            &[1.0; 4],
            &[1.0; 4],
        );
        assert_eq!(graph.undrained, vec![2]);

        let solver = ErosionSolver::new(&ErosionConfig::default());
        let mut heights = vec![3.0, 10.0, 7.0, 12.0];
        let step = solver.step(&graph, &mut heights, &[0.5; 4]);

        assert_eq!(step.updated, 1);
        assert_eq!(heights[0], 3.0);
        assert_eq!(heights[2], 7.0);
        assert_eq!(heights[3], 12.0);
        assert_ne!(heights[1], 10.0);
    }
}
