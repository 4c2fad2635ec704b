//! Uplift from plate boundary interactions.
//!
//! Seeding turns relative plate motion across each boundary edge into uplift on
//! both endpoints. Propagation then spreads the seeded uplift inland with
//! distance decay and random roughness.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

use super::{PlateType, TectonicConfig};
use crate::noise::{mix64, NoiseFields};
use crate::terrain::World;

/// Uplift magnitudes below this are dropped during propagation.
pub const MIN_PROPAGATED_UPLIFT: f64 = 0.01;

/// Type of plate boundary based on relative motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryType {
    /// Plates moving toward each other.
    Convergent,
    /// Plates moving apart.
    Divergent,
    /// Plates sliding past each other.
    Transform,
}

impl BoundaryType {
    /// Classifies eased relative motion; `|motion| < 0.1` counts as transform.
    pub fn from_motion(motion: f64) -> Self {
        if motion > 0.1 {
            BoundaryType::Convergent
        } else if motion < -0.1 {
            BoundaryType::Divergent
        } else {
            BoundaryType::Transform
        }
    }
}

/// Signed relative motion across an edge, in `[-1, 1]`, positive when converging.
///
/// # Arguments
/// * `velocity_a` - Velocity of the cell the edge starts at
/// * `velocity_b` - Velocity of the cell the edge ends at
/// * `direction` - Unit vector from `a` to `b`
/// * `max_movement` - Maximum plate speed
pub fn relative_motion(velocity_a: DVec2, velocity_b: DVec2, direction: DVec2, max_movement: f64) -> f64 {
    if max_movement <= 0.0 {
        return 0.0;
    }
    ((velocity_a - velocity_b).dot(direction) / (2.0 * max_movement)).clamp(-1.0, 1.0)
}

/// Cubic ease-out preserving sign: `sign(x)·(1 − (1 − |x|)³)`.
pub fn ease_motion(x: f64) -> f64 {
    let t = x.abs().min(1.0);
    x.signum() * (1.0 - (1.0 - t).powi(3))
}

/// Uplift response of a cell of type `own` facing a plate of type `other`.
///
/// `motion` is eased relative motion in `[-1, 1]`. The result is in units of
/// `max_uplift`.
pub fn boundary_response(own: PlateType, other: PlateType, motion: f64) -> f64 {
    use PlateType::{Continental, Oceanic};

    match (own, other) {
        // collision orogeny; rift valleys when pulled apart
        (Continental, Continental) => {
            if motion >= 0.0 {
                (1.4 * motion).min(1.0)
            } else {
                0.35 * motion
            }
        }
        // island arcs when converging, mid-ocean ridges when spreading
        (Oceanic, Oceanic) => {
            if motion >= 0.0 {
                0.6 * motion
            } else {
                -0.25 * motion
            }
        }
        // coastal range over the subducting slab; passive margin subsides slightly
        (Continental, Oceanic) => {
            if motion >= 0.0 {
                0.8 * motion.sqrt()
            } else {
                0.1 * motion
            }
        }
        // accretionary wedge on the subducting side
        (Oceanic, Continental) => {
            if motion >= 0.0 {
                0.3 * motion
            } else {
                0.2 * motion
            }
        }
    }
}

/// Seeds uplift on every boundary edge. Returns the number of cells that
/// received uplift.
pub fn seed_uplift(world: &mut World, noise: &NoiseFields, config: &TectonicConfig) -> usize {
    let cells = &world.cells;
    let contributions: Vec<(usize, f64, usize, f64, BoundaryType)> = world
        .graph
        .edges()
        .par_iter()
        .filter_map(|edge| {
            let a = &cells[edge.a];
            let b = &cells[edge.b];
            if a.velocity == b.velocity {
                return None;
            }

            let motion = ease_motion(relative_motion(
                a.velocity,
                b.velocity,
                edge.direction(),
                config.max_tectonic_movement,
            ));

            let noise_factor = |pos: DVec2| 1.0 + 0.5 * noise.uplift.evaluate(pos.x, pos.y);
            let up_a = boundary_response(a.plate_type, b.plate_type, motion)
                * config.max_uplift
                * noise_factor(a.position);
            let up_b = boundary_response(b.plate_type, a.plate_type, motion)
                * config.max_uplift
                * noise_factor(b.position);

            Some((edge.a, up_a, edge.b, up_b, BoundaryType::from_motion(motion)))
        })
        .collect();

    let mut touched = vec![false; world.cells.len()];
    let mut counts = [0usize; 3];
    for (a, up_a, b, up_b, kind) in contributions {
        world.cells[a].uplift += up_a;
        world.cells[b].uplift += up_b;
        touched[a] = true;
        touched[b] = true;
        counts[kind as usize] += 1;
    }

    debug!(
        convergent = counts[BoundaryType::Convergent as usize],
        divergent = counts[BoundaryType::Divergent as usize],
        transform = counts[BoundaryType::Transform as usize],
        "seeded plate boundary uplift"
    );

    touched.iter().filter(|t| **t).count()
}

#[derive(Clone, Copy, Debug)]
struct HeapItem {
    magnitude: f64,
    cell: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.magnitude == other.magnitude && self.cell == other.cell
    }
}

impl Eq for HeapItem {}

// Max-heap by |uplift|; lower cell id wins ties.
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude
            .partial_cmp(&other.magnitude)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

/// Spreads seeded uplift to the rest of the world. Returns the number of cells
/// that received propagated uplift.
///
/// # Arguments
/// * `world` - World with seeded uplift
/// * `config` - Decay and sharpness parameters
/// * `min_cell_distance` - Distance unit for the decay exponent
/// * `seed` - Seed for the roughness RNG
pub fn propagate_uplift(
    world: &mut World,
    config: &TectonicConfig,
    min_cell_distance: f64,
    seed: u64,
) -> usize {
    let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ 0x7570_6c69_6674));
    let mut visited = vec![false; world.cells.len()];
    let mut heap = BinaryHeap::new();

    for cell in &world.cells {
        if cell.uplift != 0.0 {
            visited[cell.id] = true;
            heap.push(HeapItem {
                magnitude: cell.uplift.abs(),
                cell: cell.id,
            });
        }
    }

    let mut reached = 0;
    while let Some(HeapItem { magnitude, cell }) = heap.pop() {
        if magnitude < MIN_PROPAGATED_UPLIFT {
            break;
        }
        let uplift = world.cells[cell].uplift;

        let neighbors = world.graph.neighbors(cell);
        let offsets = world.graph.neighbor_offsets(cell);
        for (&n, offset) in neighbors.iter().zip(offsets) {
            if visited[n] {
                continue;
            }
            let decay = config.uplift_decay.powf(offset.length() / min_cell_distance);
            let roughness = 1.0 + config.uplift_sharpness * rng.random_range(-1.0..=1.0);
            let contribution = uplift * decay * roughness;
            if contribution.abs() < MIN_PROPAGATED_UPLIFT {
                continue;
            }

            world.cells[n].uplift += contribution;
            visited[n] = true;
            reached += 1;
            heap.push(HeapItem {
                magnitude: world.cells[n].uplift.abs(),
                cell: n,
            });
        }
    }

    reached
}
