//! Read-only queries on a completed world.
//!
//! Positions are wrapped horizontally before lookup.

use std::collections::HashMap;

use glam::DVec2;

use super::{GenerationError, GenerationState, Generator};
use crate::biomes::{Biome, BiomeGrid};
use crate::geometry::TriangleHit;
use crate::tectonics::{PlateId, PlateType};
use crate::terrain::World;

/// Simulation state of the cell nearest to a queried position.
#[derive(Debug, Clone, PartialEq)]
pub struct CellDebug {
    pub cell: usize,
    pub position: DVec2,
    pub plate: PlateId,
    pub plate_type: PlateType,
    pub uplift: f64,
    pub height: f64,
    pub temperature: f64,
    pub precipitation: f64,
    pub drainage_area: f64,
    pub discharge: f64,
    pub receiver: Option<usize>,
    pub is_river_mouth: bool,
    pub biome: Option<Biome>,
}

impl Generator {
    fn completed(&self) -> Result<(&World, &BiomeGrid), GenerationError> {
        let invalid = || GenerationError::InvalidState { state: self.state };
        if self.state != GenerationState::Completed {
            return Err(invalid());
        }
        match (&self.world, &self.biome_grid) {
            (Some(world), Some(grid)) => Ok((world, grid)),
            _ => Err(invalid()),
        }
    }

    /// Ids of the `k` cells nearest to `pos`, closest first.
    pub fn nearest_cells(&self, pos: DVec2, k: usize) -> Result<Vec<usize>, GenerationError> {
        let (world, _) = self.completed()?;
        Ok(world.graph.nearest(world.bounds().wrap(pos), k))
    }

    /// The three cells whose triangle contains `pos`, with barycentric weights.
    pub fn containing_triangle(&self, pos: DVec2) -> Result<TriangleHit, GenerationError> {
        let (world, _) = self.completed()?;
        world
            .graph
            .containing_triangle(world.bounds().wrap(pos))
            .map_err(GenerationError::OutsideDomain)
    }

    /// Barycentric height blend plus the detail overlay.
    pub fn height_at(&self, pos: DVec2) -> Result<f64, GenerationError> {
        let (world, _) = self.completed()?;
        let pos = world.bounds().wrap(pos);
        let hit = world
            .graph
            .containing_triangle(pos)
            .map_err(GenerationError::OutsideDomain)?;

        let base: f64 = hit
            .cells
            .iter()
            .zip(hit.weights)
            .map(|(&cell, w)| world.cells[cell].height * w)
            .sum();
        let overlay = self.config.noise.height_overlay_amplitude
            * self.noise.height_overlay.evaluate(pos.x, pos.y);
        Ok(base + overlay)
    }

    /// Blend weights of the biomes around `pos`. The weights sum to 1.
    ///
    /// Positions above or below the domain take the nearest grid row.
    pub fn biome_weights(&self, pos: DVec2) -> Result<HashMap<Biome, f64>, GenerationError> {
        let (_, grid) = self.completed()?;
        Ok(grid.weights(pos))
    }

    /// Biome with the largest blend weight at `pos`.
    pub fn dominant_biome(&self, pos: DVec2) -> Result<Biome, GenerationError> {
        let (_, grid) = self.completed()?;
        Ok(grid.dominant(pos))
    }

    pub fn cell_debug(&self, pos: DVec2) -> Result<CellDebug, GenerationError> {
        let (world, _) = self.completed()?;
        let pos = world.bounds().wrap(pos);
        let id = world
            .graph
            .nearest_cell(pos)
            .ok_or(GenerationError::InvalidState { state: self.state })?;
        let c = &world.cells[id];
        Ok(CellDebug {
            cell: id,
            position: c.position,
            plate: c.plate,
            plate_type: c.plate_type,
            uplift: c.uplift,
            height: c.height,
            temperature: c.temperature,
            precipitation: c.precipitation,
            drainage_area: c.drainage_area,
            discharge: c.discharge,
            receiver: c.receiver,
            is_river_mouth: c.is_river_mouth,
            biome: c.biome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::pipeline::WorldConfig;

    fn completed() -> Generator {
        let mut config = WorldConfig::new(31, Bounds::new(800.0, 500.0));
        config.min_cell_distance = 20.0;
        config.erosion.max_iterations = 10;
        let mut generator = Generator::new(config);
        generator.run().unwrap();
        generator
    }

    #[test]
    fn test_queries_wrap_horizontally() {
        let g = completed();
        let p = DVec2::new(123.0, 240.0);
        let shifted = p + DVec2::new(800.0, 0.0);
        assert!((g.height_at(p).unwrap() - g.height_at(shifted).unwrap()).abs() < 1e-9);
        assert_eq!(g.nearest_cells(p, 3).unwrap(), g.nearest_cells(shifted, 3).unwrap());
        assert_eq!(g.cell_debug(p).unwrap().cell, g.cell_debug(DVec2::new(-677.0, 240.0)).unwrap().cell);
    }

    #[test]
    fn test_height_is_barycentric_blend_plus_overlay() {
        let g = completed();
        let p = DVec2::new(400.0, 250.0);
        let hit = g.containing_triangle(p).unwrap();
        let world = g.world().unwrap();
        let base: f64 = (0..3).map(|i| world.cells[hit.cells[i]].height * hit.weights[i]).sum();
        let overlay = g.config().noise.height_overlay_amplitude * g.noise.height_overlay.evaluate(p.x, p.y);
        assert!((g.height_at(p).unwrap() - (base + overlay)).abs() < 1e-9);
    }

    #[test]
    fn test_biome_weights_sum_to_one() {
        let g = completed();
        for i in 0..20 {
            let p = DVec2::new(i as f64 * 41.3, (i as f64 * 23.7) % 500.0);
            let sum: f64 = g.biome_weights(p).unwrap().values().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cell_debug_reports_nearest_cell() {
        let g = completed();
        let p = DVec2::new(250.0, 125.0);
        let debug = g.cell_debug(p).unwrap();
        assert_eq!(Some(debug.cell), g.nearest_cells(p, 1).unwrap().first().copied());
        assert!(debug.biome.is_some());
        assert!(debug.precipitation >= 0.0);
    }

    #[test]
    fn test_far_outside_query_fails() {
        let g = completed();
        assert!(matches!(
            g.height_at(DVec2::new(100.0, 5000.0)),
            Err(GenerationError::OutsideDomain(_))
        ));
    }
}
