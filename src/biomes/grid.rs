//! Regular grid of biome samples for smooth blending.

use std::collections::HashMap;

use glam::DVec2;
use rayon::prelude::*;

use super::{smoothstep, Biome};
use crate::geometry::Bounds;
use crate::terrain::World;

/// Nearest-cell biomes sampled on a regular lattice.
///
/// Columns wrap horizontally: the column spacing is adjusted so a whole
/// number of columns spans the width. Rows cover `[0, height]` inclusive.
#[derive(Debug, Clone)]
pub struct BiomeGrid {
    bounds: Bounds,
    cols: usize,
    rows: usize,
    dx: f64,
    dy: f64,
    nodes: Vec<Biome>,
}

impl BiomeGrid {
    /// Samples the biome of the nearest cell at every grid node.
    ///
    /// Cells without a biome count as ocean.
    pub fn build(world: &World, spacing: f64) -> Self {
        let bounds = world.bounds();
        let spacing = spacing.max(f64::EPSILON);
        let cols = ((bounds.width / spacing).round() as usize).max(1);
        let rows = ((bounds.height / spacing).ceil() as usize).max(1) + 1;
        let dx = bounds.width / cols as f64;
        let dy = bounds.height / (rows - 1) as f64;

        let nodes = (0..rows * cols)
            .into_par_iter()
            .map(|i| {
                let pos = DVec2::new((i % cols) as f64 * dx, (i / cols) as f64 * dy);
                world
                    .graph
                    .nearest_cell(pos)
                    .and_then(|c| world.cells[c].biome)
                    .unwrap_or(Biome::Ocean)
            })
            .collect();

        Self { bounds, cols, rows, dx, dy, nodes }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn node(&self, col: usize, row: usize) -> Biome {
        self.nodes[row * self.cols + col]
    }

    /// Smoothstep-weighted blend of the four surrounding nodes.
    ///
    /// Weights of nodes sharing a biome are summed; the result sums to 1.
    pub fn weights(&self, pos: DVec2) -> HashMap<Biome, f64> {
        let p = self.bounds.wrap(pos);

        let fx = p.x / self.dx;
        let col0 = (fx.floor() as usize) % self.cols;
        let col1 = (col0 + 1) % self.cols;
        let tx = smoothstep(0.0, 1.0, fx - fx.floor());

        let fy = (p.y / self.dy).clamp(0.0, (self.rows - 1) as f64);
        let row0 = (fy.floor() as usize).min(self.rows - 1);
        let row1 = (row0 + 1).min(self.rows - 1);
        let ty = smoothstep(0.0, 1.0, fy - row0 as f64);

        let mut weights = HashMap::with_capacity(4);
        for (col, row, w) in [
            (col0, row0, (1.0 - tx) * (1.0 - ty)),
            (col1, row0, tx * (1.0 - ty)),
            (col0, row1, (1.0 - tx) * ty),
            (col1, row1, tx * ty),
        ] {
            if w > 0.0 {
                *weights.entry(self.node(col, row)).or_insert(0.0) += w;
            }
        }
        weights
    }

    /// Biome with the largest blend weight at `pos`.
    pub fn dominant(&self, pos: DVec2) -> Biome {
        self.weights(pos)
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(biome, _)| biome)
            .unwrap_or(Biome::Ocean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::test_support::grid_world;

    fn split_world() -> World {
        let mut world = grid_world(10, 6, 10.0);
        for cell in &mut world.cells {
            cell.biome = Some(if cell.position.x < 50.0 {
                Biome::Savanna
            } else {
                Biome::BorealForest
            });
        }
        world
    }

    #[test]
    fn weights_sum_to_one() {
        let grid = BiomeGrid::build(&split_world(), 7.0);
        for &(x, y) in &[(0.0, 0.0), (49.0, 30.0), (51.3, 12.7), (99.9, 59.9), (-3.0, 20.0), (250.0, 44.0)] {
            let w = grid.weights(DVec2::new(x, y));
            let sum: f64 = w.values().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum {sum} at ({x}, {y})");
            assert!(w.values().all(|&v| v > 0.0));
        }
    }

    #[test]
    fn interior_positions_take_their_region_biome() {
        let grid = BiomeGrid::build(&split_world(), 5.0);
        assert_eq!(grid.dominant(DVec2::new(20.0, 30.0)), Biome::Savanna);
        assert_eq!(grid.dominant(DVec2::new(75.0, 30.0)), Biome::BorealForest);
    }

    #[test]
    fn boundary_blends_both_biomes() {
        // nodes at x = 48 and x = 52 sit on either side of the split
        let grid = BiomeGrid::build(&split_world(), 4.0);
        let w = grid.weights(DVec2::new(50.0, 30.0));
        assert_eq!(w.len(), 2);
        assert!((w[&Biome::Savanna] - 0.5).abs() < 1e-9);
        assert!((w[&Biome::BorealForest] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn columns_wrap_horizontally() {
        let grid = BiomeGrid::build(&split_world(), 10.0);
        assert_eq!(grid.cols(), 10);
        let a = grid.weights(DVec2::new(3.0, 25.0));
        let b = grid.weights(DVec2::new(103.0, 25.0));
        assert_eq!(a.len(), b.len());
        for (biome, w) in &a {
            assert!((b[biome] - w).abs() < 1e-12);
        }
    }
}
