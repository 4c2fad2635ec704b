//! The world: cell graph plus per-cell state.

use crate::geometry::{Bounds, PlanarGraph};

use super::Cell;

/// A generated world.
///
/// Holds the immutable [`PlanarGraph`] and one [`Cell`] per real sample point.
#[derive(Debug)]
pub struct World {
    pub graph: PlanarGraph,
    pub cells: Vec<Cell>,
}

impl World {
    /// Creates one cell per graph site with empty simulation state.
    pub fn new(graph: PlanarGraph) -> Self {
        let cells = (0..graph.len())
            .map(|id| {
                Cell::new(
                    id,
                    graph.site(id),
                    graph.polygon(id).to_vec(),
                    graph.area(id),
                )
            })
            .collect();
        Self { graph, cells }
    }

    pub fn bounds(&self) -> Bounds {
        self.graph.bounds()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn heights(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.height).collect()
    }

    /// Computes the min and max cell heights.
    pub fn height_range(&self) -> (f64, f64) {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for cell in &self.cells {
            min = min.min(cell.height);
            max = max.max(cell.height);
        }
        (min, max)
    }

    /// Fraction of the total cell area that is continental.
    pub fn continental_fraction(&self) -> f64 {
        let total: f64 = self.cells.iter().map(|c| c.area).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let land: f64 = self
            .cells
            .iter()
            .filter(|c| c.is_continental())
            .map(|c| c.area)
            .sum();
        land / total
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use glam::DVec2;

    use super::World;
    use crate::geometry::{Bounds, PlanarGraph, SamplePoints};
    use crate::noise::mix64;

    /// A `cols x rows` jittered grid world with the given spacing.
    ///
    /// Cell `row * cols + col` sits near `((col + 0.5) * spacing, (row + 0.5) * spacing)`.
    pub(crate) fn grid_world(cols: usize, rows: usize, spacing: f64) -> World {
        let bounds = Bounds::new(cols as f64 * spacing, rows as f64 * spacing);
        let mut points = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let h = mix64((row * cols + col) as u64);
                let jx = ((h & 0xFFFF) as f64 / 65535.0 - 0.5) * 0.1 * spacing;
                let jy = (((h >> 16) & 0xFFFF) as f64 / 65535.0 - 0.5) * 0.1 * spacing;
                points.push(DVec2::new(
                    (col as f64 + 0.5) * spacing + jx,
                    (row as f64 + 0.5) * spacing + jy,
                ));
            }
        }
        let samples = SamplePoints::from_real(bounds, points, 2.0 * spacing);
        let graph = PlanarGraph::build(bounds, samples).expect("grid world triangulates");
        World::new(graph)
    }
}
