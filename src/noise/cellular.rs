//! Wrap-aware cellular (Worley value) noise.

use super::{mix64, NoiseField};

/// Each point takes the value of the nearest jittered feature point.
///
/// Feature points live on a grid whose column count divides the domain width
/// exactly, and the column index is wrapped before hashing, so the field is
/// periodic in `x`. Returned values are uniform in `[-1, 1)`.
#[derive(Debug, Clone)]
pub struct CellularNoise {
    seed: u64,
    columns: i64,
    cell_width: f64,
    cell_height: f64,
    jitter: f64,
}

impl CellularNoise {
    /// Creates a field with roughly `frequency` features per world unit.
    pub fn new(seed: u64, frequency: f64, width: f64) -> Self {
        let columns = (width * frequency).round().max(1.0) as i64;
        Self {
            seed,
            columns,
            cell_width: width / columns as f64,
            cell_height: 1.0 / frequency,
            jitter: 0.9,
        }
    }

    fn cell_hash(&self, cx: i64, cy: i64) -> u64 {
        let cx = cx.rem_euclid(self.columns) as u64;
        mix64(self.seed ^ mix64(cx.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (cy as u64)))
    }
}

/// Maps the top 53 bits of `bits` to `[0, 1)`.
fn unit(bits: u64) -> f64 {
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

impl NoiseField for CellularNoise {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        let gx = (x / self.cell_width).floor() as i64;
        let gy = (y / self.cell_height).floor() as i64;

        let mut best = f64::INFINITY;
        let mut value = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let cx = gx + dx;
                let cy = gy + dy;
                let hash = self.cell_hash(cx, cy);
                let jx = unit(hash) - 0.5;
                let jy = unit(mix64(hash ^ 0x5851_F42D_4C95_7F2D)) - 0.5;

                let fx = (cx as f64 + 0.5 + self.jitter * jx) * self.cell_width;
                let fy = (cy as f64 + 0.5 + self.jitter * jy) * self.cell_height;
                let d = (fx - x).powi(2) + (fy - y).powi(2);
                if d < best {
                    best = d;
                    value = unit(mix64(hash.rotate_left(17))) * 2.0 - 1.0;
                }
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_in_x() {
        let noise = CellularNoise::new(3, 0.01, 1000.0);
        for i in 0..40 {
            let x = i as f64 * 23.7;
            let y = i as f64 * 11.3;
            assert_eq!(noise.evaluate(x, y), noise.evaluate(x + 1000.0, y));
        }
    }

    #[test]
    fn piecewise_constant_regions() {
        let noise = CellularNoise::new(11, 0.01, 1000.0);
        let mut distinct = std::collections::HashSet::new();
        for i in 0..200 {
            let v = noise.evaluate(i as f64 * 5.0, 500.0);
            assert!((-1.0..1.0).contains(&v));
            distinct.insert(v.to_bits());
        }
        // 1000 units at 0.01 features per unit crosses roughly ten regions
        assert!(distinct.len() > 3 && distinct.len() < 40, "{} regions", distinct.len());
    }

    #[test]
    fn seed_changes_values() {
        let a = CellularNoise::new(1, 0.01, 1000.0);
        let b = CellularNoise::new(2, 0.01, 1000.0);
        let differs = (0..20).any(|i| a.evaluate(i as f64 * 50.0, 10.0) != b.evaluate(i as f64 * 50.0, 10.0));
        assert!(differs);
    }
}
