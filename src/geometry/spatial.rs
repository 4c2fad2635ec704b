//! k-d tree over the cylindrical embedding of the wrapping domain.

use glam::DVec2;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use std::f64::consts::TAU;
use std::fmt;

use super::Bounds;

/// Nearest-site lookup that respects the horizontal wrap.
///
/// Sites are embedded as `(cos θ · W/2π, sin θ · W/2π, y)` with `θ = 2πx/W`, so
/// points on either side of the seam are close in the tree.
pub struct SpatialIndex {
    tree: ImmutableKdTree<f64, 3>,
    bounds: Bounds,
    len: usize,
}

impl SpatialIndex {
    /// Builds the index over `sites`. Item ids are positions in `sites`.
    pub fn new(bounds: Bounds, sites: &[DVec2]) -> Self {
        let entries: Vec<[f64; 3]> = sites.iter().map(|p| embed(bounds, *p)).collect();
        let tree = ImmutableKdTree::new_from_slice(&entries);
        Self {
            tree,
            bounds,
            len: sites.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ids of the `k` sites nearest to `p`, closest first.
    pub fn nearest(&self, p: DVec2, k: usize) -> Vec<usize> {
        if k == 0 || self.len == 0 {
            return Vec::new();
        }
        let query = embed(self.bounds, p);
        self.tree
            .nearest_n::<SquaredEuclidean>(&query, k.min(self.len))
            .into_iter()
            .map(|n| n.item as usize)
            .collect()
    }

    /// Id of the site nearest to `p`.
    pub fn nearest_one(&self, p: DVec2) -> Option<usize> {
        self.nearest(p, 1).first().copied()
    }
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("bounds", &self.bounds)
            .field("len", &self.len)
            .finish()
    }
}

fn embed(bounds: Bounds, p: DVec2) -> [f64; 3] {
    let radius = bounds.width / TAU;
    let theta = TAU * p.x / bounds.width;
    [theta.cos() * radius, theta.sin() * radius, p.y]
}
