//! Plate identity, type and kinematics.
//!
//! Plates are not stored anywhere: a plate is a bucket of the warped plate
//! noise, and everything about it is derived from the bucket index.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::TectonicConfig;
use crate::noise::{mix64, NoiseFields};
use crate::terrain::World;

/// Offset between the two samples of the warp field.
const WARP_AXIS_OFFSET: f64 = 7919.0;

/// Type of crustal material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlateType {
    /// Continental crust: thick, light, floats above sea level.
    Continental,
    /// Oceanic crust: thin, dense, sits below sea level.
    Oceanic,
}

impl PlateType {
    /// Height a fresh cell of this type starts at.
    pub fn initial_height(&self, config: &TectonicConfig) -> f64 {
        match self {
            PlateType::Continental => 0.0,
            PlateType::Oceanic => -config.ocean_depth,
        }
    }
}

/// Plate identifier: the index of the quantized noise bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlateId(pub i64);

/// Kinematic description of a plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plate {
    pub id: PlateId,
    pub plate_type: PlateType,
    /// Velocity in world units per step; `|velocity| <= max_tectonic_movement`.
    pub velocity: DVec2,
}

impl Plate {
    /// Derives a plate from its bucket index.
    ///
    /// Two calls with the same bucket, seed and config always agree.
    pub fn from_bucket(bucket: i64, seed: u64, config: &TectonicConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ mix64(bucket as u64)));

        let angle = rng.random::<f64>() * TAU;
        let speed = rng.random::<f64>() * config.max_tectonic_movement;
        let plate_type = if rng.random_bool(config.continent_ratio.clamp(0.0, 1.0)) {
            PlateType::Continental
        } else {
            PlateType::Oceanic
        };

        Self {
            id: PlateId(bucket),
            plate_type,
            velocity: DVec2::new(angle.cos(), angle.sin()) * speed,
        }
    }
}

/// Returns the plate at world position `pos`.
pub fn plate_at(pos: DVec2, noise: &NoiseFields, config: &TectonicConfig, seed: u64) -> Plate {
    let warp = DVec2::new(
        noise.plate_warp.evaluate(pos.x, pos.y),
        noise.plate_warp.evaluate(pos.x, pos.y + WARP_AXIS_OFFSET),
    ) * config.plate_warp_strength;
    let warped = pos + warp;

    let value = noise.plates.evaluate(warped.x, warped.y);
    let bucket = (value / config.plate_merge_ratio).floor() as i64;
    Plate::from_bucket(bucket, seed, config)
}

/// Assigns plate id, type and velocity to every cell and resets heights to the
/// plate type's initial height. Returns the number of distinct plates.
pub fn assign_plates(
    world: &mut World,
    noise: &NoiseFields,
    config: &TectonicConfig,
    seed: u64,
) -> usize {
    let plates: Vec<Plate> = world
        .cells
        .par_iter()
        .map(|cell| plate_at(cell.position, noise, config, seed))
        .collect();

    let mut distinct = std::collections::HashSet::new();
    for (cell, plate) in world.cells.iter_mut().zip(plates) {
        distinct.insert(plate.id);
        cell.plate = plate.id;
        cell.plate_type = plate.plate_type;
        cell.velocity = plate.velocity;
        cell.uplift = 0.0;
        cell.height = plate.plate_type.initial_height(config);
    }
    distinct.len()
}
