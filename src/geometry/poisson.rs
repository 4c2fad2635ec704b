//! Bridson Poisson-disk sampling over the wrapping domain.

use glam::DVec2;
use rand::Rng;
use std::f64::consts::{SQRT_2, TAU};

use super::Bounds;

/// Sample points produced by [`sample`]: real points first, then mirrored ghosts.
///
/// Ids `0..real_count()` are real points and double as cell ids. Every later id
/// is a ghost copy of a real point shifted by one domain period; `origin(id)`
/// maps it back. Ghost ids never leave the geometry module.
#[derive(Debug, Clone)]
pub struct SamplePoints {
    positions: Vec<DVec2>,
    origins: Vec<usize>,
    real_count: usize,
}

impl SamplePoints {
    /// Wraps `real` points and mirrors every point within `margin` of an edge
    /// to the opposite side. Corner points are also mirrored diagonally.
    pub fn from_real(bounds: Bounds, real: Vec<DVec2>, margin: f64) -> Self {
        let real_count = real.len();
        let mut positions = real;
        let mut origins: Vec<usize> = (0..real_count).collect();

        for id in 0..real_count {
            let p = positions[id];
            let shift_x = if p.x < margin {
                Some(bounds.width)
            } else if p.x > bounds.width - margin {
                Some(-bounds.width)
            } else {
                None
            };
            let shift_y = if p.y < margin {
                Some(bounds.height)
            } else if p.y > bounds.height - margin {
                Some(-bounds.height)
            } else {
                None
            };

            if let Some(sx) = shift_x {
                positions.push(p + DVec2::new(sx, 0.0));
                origins.push(id);
            }
            if let Some(sy) = shift_y {
                positions.push(p + DVec2::new(0.0, sy));
                origins.push(id);
            }
            if let (Some(sx), Some(sy)) = (shift_x, shift_y) {
                positions.push(p + DVec2::new(sx, sy));
                origins.push(id);
            }
        }

        Self {
            positions,
            origins,
            real_count,
        }
    }

    /// Total number of points, ghosts included.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of real (in-bounds) points.
    pub fn real_count(&self) -> usize {
        self.real_count
    }

    pub fn positions(&self) -> &[DVec2] {
        &self.positions
    }

    pub fn real_positions(&self) -> &[DVec2] {
        &self.positions[..self.real_count]
    }

    /// Maps a triangulation point id to the id of the real point it copies.
    #[inline]
    pub fn origin(&self, id: usize) -> usize {
        self.origins[id]
    }

    #[inline]
    pub fn is_ghost(&self, id: usize) -> bool {
        id >= self.real_count
    }
}

/// Samples blue-noise points over `bounds` and mirrors ghosts within
/// `2 * min_distance` of the edges.
///
/// # Arguments
/// * `bounds` - World domain
/// * `min_distance` - Minimum spacing between any two points
/// * `rng` - Random source (seeded by the caller for reproducibility)
/// * `iterations_per_point` - Consecutive rejections before an active point retires
pub fn sample<R: Rng>(
    bounds: Bounds,
    min_distance: f64,
    rng: &mut R,
    iterations_per_point: u32,
) -> SamplePoints {
    let real = poisson_disk(bounds, min_distance, rng, iterations_per_point);
    SamplePoints::from_real(bounds, real, 2.0 * min_distance)
}

/// Background grid with cell size `r/√2`, so each cell holds at most one point.
struct BackgroundGrid {
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Option<usize>>,
}

impl BackgroundGrid {
    fn new(bounds: Bounds, min_distance: f64) -> Self {
        let cell_size = min_distance / SQRT_2;
        let cols = (bounds.width / cell_size).ceil().max(1.0) as usize;
        let rows = (bounds.height / cell_size).ceil().max(1.0) as usize;
        Self {
            cell_size,
            cols,
            rows,
            cells: vec![None; cols * rows],
        }
    }

    fn coords(&self, p: DVec2) -> (usize, usize) {
        let gx = ((p.x / self.cell_size) as usize).min(self.cols - 1);
        let gy = ((p.y / self.cell_size) as usize).min(self.rows - 1);
        (gx, gy)
    }

    fn insert(&mut self, p: DVec2, id: usize) {
        let (gx, gy) = self.coords(p);
        self.cells[gy * self.cols + gx] = Some(id);
    }
}

fn is_far_enough(
    bounds: Bounds,
    grid: &BackgroundGrid,
    points: &[DVec2],
    candidate: DVec2,
    min_distance: f64,
) -> bool {
    let (gx, gy) = grid.coords(candidate);
    let min_sq = min_distance * min_distance;

    for dy in -2i64..=2 {
        for dx in -2i64..=2 {
            let cx = (gx as i64 + dx).rem_euclid(grid.cols as i64) as usize;
            let cy = (gy as i64 + dy).rem_euclid(grid.rows as i64) as usize;
            if let Some(other) = grid.cells[cy * grid.cols + cx] {
                if bounds.toroidal_delta(candidate, points[other]).length_squared() < min_sq {
                    return false;
                }
            }
        }
    }
    true
}

/// Bridson's algorithm. Returns only in-bounds points.
pub fn poisson_disk<R: Rng>(
    bounds: Bounds,
    min_distance: f64,
    rng: &mut R,
    iterations_per_point: u32,
) -> Vec<DVec2> {
    let mut grid = BackgroundGrid::new(bounds, min_distance);
    let mut points: Vec<DVec2> = Vec::new();
    let mut active: Vec<usize> = Vec::new();

    let first = DVec2::new(
        rng.random::<f64>() * bounds.width,
        rng.random::<f64>() * bounds.height,
    );
    grid.insert(first, 0);
    points.push(first);
    active.push(0);

    let r_sq = min_distance * min_distance;

    while !active.is_empty() {
        let slot = rng.random_range(0..active.len());
        let origin = points[active[slot]];
        let mut accepted = false;

        for _ in 0..iterations_per_point {
            // Uniform by area in the annulus [r, 2r].
            let angle = rng.random::<f64>() * TAU;
            let radius = (r_sq + rng.random::<f64>() * 3.0 * r_sq).sqrt();
            let candidate = origin + DVec2::new(angle.cos(), angle.sin()) * radius;

            if !bounds.contains(candidate) {
                continue;
            }
            if is_far_enough(bounds, &grid, &points, candidate, min_distance) {
                let id = points.len();
                grid.insert(candidate, id);
                points.push(candidate);
                active.push(id);
                accepted = true;
                break;
            }
        }

        if !accepted {
            active.swap_remove(slot);
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn accepted_points_respect_min_distance() {
        let bounds = Bounds::new(300.0, 200.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let points = poisson_disk(bounds, 12.0, &mut rng, 30);

        assert!(points.len() > 100);
        for (i, a) in points.iter().enumerate() {
            assert!(bounds.contains(*a));
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 12.0 - 1e-9, "points {:?} and {:?} too close", a, b);
            }
        }
    }

    #[test]
    fn spacing_holds_across_the_wrap() {
        let bounds = Bounds::new(200.0, 200.0);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let points = poisson_disk(bounds, 10.0, &mut rng, 30);

        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(bounds.toroidal_delta(*a, *b).length() >= 10.0 - 1e-9);
            }
        }
    }

    #[test]
    fn sampling_is_reproducible() {
        let bounds = Bounds::new(150.0, 150.0);
        let a = poisson_disk(bounds, 10.0, &mut ChaCha8Rng::seed_from_u64(5), 30);
        let b = poisson_disk(bounds, 10.0, &mut ChaCha8Rng::seed_from_u64(5), 30);
        assert_eq!(a, b);
    }

    #[test]
    fn ghosts_mirror_edge_points() {
        let bounds = Bounds::new(100.0, 100.0);
        let real = vec![
            DVec2::new(50.0, 50.0), // interior
            DVec2::new(2.0, 50.0),  // left edge
            DVec2::new(98.0, 1.0),  // bottom-right corner
        ];
        let samples = SamplePoints::from_real(bounds, real, 10.0);

        assert_eq!(samples.real_count(), 3);
        // one ghost for the edge point, three for the corner point
        assert_eq!(samples.len(), 3 + 1 + 3);
        for id in samples.real_count()..samples.len() {
            assert!(samples.is_ghost(id));
            let origin = samples.origin(id);
            let delta = samples.positions()[id] - samples.positions()[origin];
            assert!(delta.x.abs() == 100.0 || delta.x == 0.0);
            assert!(delta.y.abs() == 100.0 || delta.y == 0.0);
        }
        assert!(samples.positions().contains(&DVec2::new(102.0, 50.0)));
        assert!(samples.positions().contains(&DVec2::new(-2.0, 101.0)));
    }
}
