//! Planar geometry over a horizontally wrapping rectangle.
//!
//! Provides blue-noise sampling with mirrored ghost points, a Delaunay
//! triangulation, the Voronoi cell graph derived from it and a wrap-aware
//! spatial index for point queries.

mod bounds;
pub mod delaunay;
mod graph;
pub mod poisson;
mod spatial;

use thiserror::Error;

pub use bounds::Bounds;
pub use delaunay::{Triangulation, EDGE_STACK_CAPACITY, EMPTY};
pub use graph::{barycentric, signed_area, DualEdge, PlanarGraph, TriangleHit};
pub use poisson::SamplePoints;
pub use spatial::SpatialIndex;

/// Errors from triangulation and point location.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("triangulation needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("all input points are collinear")]
    Collinear,
    #[error("point {0} is not part of any triangle")]
    Unconnected(usize),
    #[error("position ({x}, {y}) is outside the simulated domain")]
    PointOutsideDomain { x: f64, y: f64 },
}
