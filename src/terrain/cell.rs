//! Per-cell simulation state.

use glam::DVec2;

use crate::biomes::Biome;
use crate::tectonics::{PlateId, PlateType};

/// One Voronoi cell of the world, filled in place by successive stages.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Cell id, equal to the id of its sample point.
    pub id: usize,
    /// Sample point position.
    pub position: DVec2,
    /// Voronoi polygon vertices, counter-clockwise.
    pub polygon: Vec<DVec2>,
    /// Polygon area in square world units.
    pub area: f64,

    /// Plate the cell belongs to (populated by the tectonic stage).
    pub plate: PlateId,
    pub plate_type: PlateType,
    /// Plate velocity in world units per step.
    pub velocity: DVec2,
    /// Uplift rate from plate boundary interactions.
    pub uplift: f64,

    /// Surface height; negative below sea level.
    pub height: f64,
    /// Mean temperature (°C).
    pub temperature: f64,
    /// Annual precipitation (mm/year).
    pub precipitation: f64,
    pub biome: Option<Biome>,

    pub is_river_mouth: bool,
    /// Downstream neighbour from the last hydrology pass.
    ///
    /// Normally strictly lower than this cell. The exception is a cell on a
    /// lake's rerouted path from its pit to the overflow pass: that path is
    /// reversed, so its receivers can be higher.
    pub receiver: Option<usize>,
    /// Accumulated upstream area from the last hydrology pass.
    pub drainage_area: f64,
    /// Accumulated upstream discharge from the last hydrology pass.
    pub discharge: f64,
}

impl Cell {
    /// Creates a cell with empty simulation state.
    pub fn new(id: usize, position: DVec2, polygon: Vec<DVec2>, area: f64) -> Self {
        Self {
            id,
            position,
            polygon,
            area,
            plate: PlateId::default(),
            plate_type: PlateType::Oceanic,
            velocity: DVec2::ZERO,
            uplift: 0.0,
            height: 0.0,
            temperature: 0.0,
            precipitation: 0.0,
            biome: None,
            is_river_mouth: false,
            receiver: None,
            drainage_area: area,
            discharge: 0.0,
        }
    }

    pub fn is_continental(&self) -> bool {
        self.plate_type == PlateType::Continental
    }

    pub fn is_oceanic(&self) -> bool {
        self.plate_type == PlateType::Oceanic
    }
}
