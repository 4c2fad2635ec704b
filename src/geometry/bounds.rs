//! The wrapping rectangular world domain.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// World rectangle `[0, width) x [0, height)`.
///
/// The domain wraps horizontally: `x` and `x + width` name the same location.
/// Sample points are mirrored across both axes so the triangulation is seamless,
/// but only the horizontal wrap is visible to queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Horizontal extent (wrap period) in world units.
    pub width: f64,
    /// Vertical extent in world units.
    pub height: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
        }
    }
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Returns true if `p` lies inside the half-open rectangle.
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= 0.0 && p.x < self.width && p.y >= 0.0 && p.y < self.height
    }

    /// Wraps `x` into `[0, width)`. `y` is left untouched.
    pub fn wrap(&self, p: DVec2) -> DVec2 {
        DVec2::new(p.x.rem_euclid(self.width), p.y)
    }

    /// Signed horizontal offset from `from_x` to `to_x` taking the short way around.
    pub fn wrapped_dx(&self, from_x: f64, to_x: f64) -> f64 {
        let mut dx = to_x - from_x;
        let half = self.width * 0.5;
        if dx > half {
            dx -= self.width;
        } else if dx < -half {
            dx += self.width;
        }
        dx
    }

    /// Shortest offset from `a` to `b` when both axes are treated as periodic.
    ///
    /// Used where mirrored ghost points must respect sample spacing.
    pub fn toroidal_delta(&self, a: DVec2, b: DVec2) -> DVec2 {
        let mut d = b - a;
        let half = DVec2::new(self.width * 0.5, self.height * 0.5);
        if d.x > half.x {
            d.x -= self.width;
        } else if d.x < -half.x {
            d.x += self.width;
        }
        if d.y > half.y {
            d.y -= self.height;
        } else if d.y < -half.y {
            d.y += self.height;
        }
        d
    }

    /// Latitude in radians: `-π/2` at `y = 0`, `0` at the centre line, `+π/2` at `y = height`.
    pub fn latitude(&self, y: f64) -> f64 {
        ((y / self.height).clamp(0.0, 1.0) - 0.5) * PI
    }
}
