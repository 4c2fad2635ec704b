//! Voronoi cell graph built from the Delaunay triangulation of real and ghost points.
//!
//! Triangulation point ids include ghosts; everything this module hands out is
//! expressed in cell ids (the origin ids of real points).

use glam::DVec2;
use rayon::prelude::*;

use super::delaunay::{next_halfedge, Triangulation, EMPTY};
use super::poisson::SamplePoints;
use super::spatial::SpatialIndex;
use super::{Bounds, GeometryError};

/// Number of nearby sites whose triangle fans are searched during point location.
const LOCATE_CANDIDATES: usize = 4;

/// Barycentric tolerance for containment tests.
const CONTAINMENT_EPSILON: f64 = 1e-9;

/// Dual edge between two adjacent cells, stored once per unordered pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualEdge {
    pub a: usize,
    pub b: usize,
    /// Planar vector from site `a` to site `b`, wrap-corrected.
    pub delta: DVec2,
    /// Voronoi edge endpoints in `a`'s frame.
    pub endpoints: [DVec2; 2],
}

impl DualEdge {
    pub fn length(&self) -> f64 {
        self.delta.length()
    }

    /// Unit vector from `a` towards `b`.
    pub fn direction(&self) -> DVec2 {
        self.delta.normalize_or_zero()
    }
}

/// Result of point location: three cell ids and barycentric weights summing to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub cells: [usize; 3],
    pub weights: [f64; 3],
}

#[derive(Debug, Clone, Default)]
struct CellTopology {
    neighbors: Vec<usize>,
    offsets: Vec<DVec2>,
    edge_ends: Vec<Option<[DVec2; 2]>>,
    polygon: Vec<DVec2>,
    area: f64,
}

/// Cell adjacency, Voronoi polygons and point location over the wrapping domain.
#[derive(Debug)]
pub struct PlanarGraph {
    bounds: Bounds,
    points: SamplePoints,
    triangulation: Triangulation,
    inedges: Vec<usize>,
    neighbors: Vec<Vec<usize>>,
    neighbor_offsets: Vec<Vec<DVec2>>,
    polygons: Vec<Vec<DVec2>>,
    areas: Vec<f64>,
    edges: Vec<DualEdge>,
    index: SpatialIndex,
}

impl PlanarGraph {
    /// Triangulates `points` (ghosts included) and derives the cell graph.
    ///
    /// # Errors
    /// Fails on degenerate input or when a real point ends up in no triangle.
    pub fn build(bounds: Bounds, points: SamplePoints) -> Result<Self, GeometryError> {
        let triangulation = Triangulation::new(points.positions())?;
        let inedges = triangulation.incoming_edges(points.len());
        let real = points.real_count();

        let topology: Vec<CellTopology> = (0..real)
            .into_par_iter()
            .map(|cell| cell_topology(&triangulation, &inedges, &points, cell))
            .collect();

        if let Some(cell) = topology.iter().position(|t| t.neighbors.is_empty()) {
            return Err(GeometryError::Unconnected(cell));
        }

        let mut neighbors = Vec::with_capacity(real);
        let mut neighbor_offsets = Vec::with_capacity(real);
        let mut polygons = Vec::with_capacity(real);
        let mut areas = Vec::with_capacity(real);
        let mut edges = Vec::new();

        for (a, topo) in topology.into_iter().enumerate() {
            for (k, &b) in topo.neighbors.iter().enumerate() {
                if a < b {
                    let delta = topo.offsets[k];
                    let endpoints = topo.edge_ends[k].unwrap_or([delta * 0.5; 2]);
                    edges.push(DualEdge {
                        a,
                        b,
                        delta,
                        endpoints,
                    });
                }
            }
            neighbors.push(topo.neighbors);
            neighbor_offsets.push(topo.offsets);
            polygons.push(topo.polygon);
            areas.push(topo.area);
        }

        let index = SpatialIndex::new(bounds, points.real_positions());

        Ok(Self {
            bounds,
            points,
            triangulation,
            inedges,
            neighbors,
            neighbor_offsets,
            polygons,
            areas,
            edges,
            index,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of cells (real points).
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn site(&self, cell: usize) -> DVec2 {
        self.points.positions()[cell]
    }

    /// Neighbouring cell ids, ghosts remapped, without duplicates or self.
    pub fn neighbors(&self, cell: usize) -> &[usize] {
        &self.neighbors[cell]
    }

    /// Planar offsets from `cell` to each entry of [`neighbors`](Self::neighbors).
    pub fn neighbor_offsets(&self, cell: usize) -> &[DVec2] {
        &self.neighbor_offsets[cell]
    }

    /// Planar distance between two adjacent cells.
    pub fn neighbor_distance(&self, cell: usize, other: usize) -> Option<f64> {
        self.neighbors[cell]
            .iter()
            .position(|&n| n == other)
            .map(|k| self.neighbor_offsets[cell][k].length())
    }

    /// Voronoi polygon of `cell` (absolute positions, counter-clockwise).
    pub fn polygon(&self, cell: usize) -> &[DVec2] {
        &self.polygons[cell]
    }

    pub fn area(&self, cell: usize) -> f64 {
        self.areas[cell]
    }

    pub fn edges(&self) -> &[DualEdge] {
        &self.edges
    }

    /// The `k` cells nearest to `pos` (wrapped horizontally).
    pub fn nearest(&self, pos: DVec2, k: usize) -> Vec<usize> {
        self.index.nearest(self.bounds.wrap(pos), k)
    }

    pub fn nearest_cell(&self, pos: DVec2) -> Option<usize> {
        self.index.nearest_one(self.bounds.wrap(pos))
    }

    /// Finds the triangle containing `pos` and its barycentric weights.
    ///
    /// # Errors
    /// `PointOutsideDomain` if no triangle near the query contains it.
    pub fn containing_triangle(&self, pos: DVec2) -> Result<TriangleHit, GeometryError> {
        let query = self.bounds.wrap(pos);
        for seed in self.index.nearest(query, LOCATE_CANDIDATES) {
            let site = self.site(seed);
            // move the query onto the seed's side of the seam
            let local = DVec2::new(site.x + self.bounds.wrapped_dx(site.x, query.x), query.y);
            if let Some(hit) = self.fan_hit(seed, local) {
                return Ok(hit);
            }
        }
        Err(GeometryError::PointOutsideDomain { x: pos.x, y: pos.y })
    }

    fn fan_hit(&self, point: usize, p: DVec2) -> Option<TriangleHit> {
        let tri = &self.triangulation;
        let positions = self.points.positions();
        let start = self.inedges[point];
        if start == EMPTY {
            return None;
        }

        let mut e = start;
        loop {
            let t = e / 3;
            let [i0, i1, i2] = tri.triangle(t);
            if let Some(weights) = barycentric(p, positions[i0], positions[i1], positions[i2]) {
                if weights.iter().all(|w| *w >= -CONTAINMENT_EPSILON) {
                    let clamped = weights.map(|w| w.max(0.0));
                    let sum: f64 = clamped.iter().sum();
                    return Some(TriangleHit {
                        cells: [
                            self.points.origin(i0),
                            self.points.origin(i1),
                            self.points.origin(i2),
                        ],
                        weights: clamped.map(|w| w / sum),
                    });
                }
            }
            e = tri.halfedges[next_halfedge(e)];
            if e == EMPTY || e == start {
                return None;
            }
        }
    }
}

fn centroid(positions: &[DVec2], tri: [usize; 3]) -> DVec2 {
    (positions[tri[0]] + positions[tri[1]] + positions[tri[2]]) / 3.0
}

/// Walks the triangle fan around real point `cell`.
fn cell_topology(
    tri: &Triangulation,
    inedges: &[usize],
    points: &SamplePoints,
    cell: usize,
) -> CellTopology {
    let positions = points.positions();
    let start = inedges[cell];
    if start == EMPTY {
        return CellTopology::default();
    }
    let site = positions[cell];
    let mut topo = CellTopology::default();

    let push_neighbor = |topo: &mut CellTopology, from: usize, ends: Option<[DVec2; 2]>| {
        let origin = points.origin(from);
        if origin != cell && !topo.neighbors.contains(&origin) {
            topo.neighbors.push(origin);
            topo.offsets.push(positions[from] - site);
            topo.edge_ends.push(ends);
        }
    };

    let mut e = start;
    loop {
        let t = e / 3;
        let center = centroid(positions, tri.triangle(t));
        topo.polygon.push(center);

        let opposite = tri.halfedges[e];
        let ends = (opposite != EMPTY).then(|| [center, centroid(positions, tri.triangle(opposite / 3))]);
        push_neighbor(&mut topo, tri.triangles[e], ends);

        let outgoing = next_halfedge(e);
        e = tri.halfedges[outgoing];
        if e == EMPTY {
            // open fan on the hull; the far end of the last edge is a neighbour too
            push_neighbor(&mut topo, tri.triangles[next_halfedge(outgoing)], None);
            break;
        }
        if e == start {
            break;
        }
    }

    let signed = signed_area(&topo.polygon);
    if signed < 0.0 {
        topo.polygon.reverse();
    }
    topo.area = signed.abs();
    topo
}

/// Shoelace area, positive for counter-clockwise rings.
pub fn signed_area(ring: &[DVec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}

/// Barycentric coordinates of `p` in triangle `a, b, c`, or `None` if degenerate.
pub fn barycentric(p: DVec2, a: DVec2, b: DVec2, c: DVec2) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let den = v0.perp_dot(v1);
    if den.abs() < f64::EPSILON {
        return None;
    }
    let v = v2.perp_dot(v1) / den;
    let w = v0.perp_dot(v2) / den;
    Some([1.0 - v - w, v, w])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::poisson;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn build_graph(seed: u64) -> PlanarGraph {
        let bounds = Bounds::new(300.0, 240.0);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let samples = poisson::sample(bounds, 10.0, &mut rng, 30);
        PlanarGraph::build(bounds, samples).unwrap()
    }

    #[test]
    fn every_cell_has_three_or_more_neighbours() {
        let graph = build_graph(1);
        for cell in 0..graph.len() {
            let n = graph.neighbors(cell);
            assert!(n.len() >= 3, "cell {} has {} neighbours", cell, n.len());
            assert!(!n.contains(&cell));
            assert!(n.iter().all(|&c| c < graph.len()));
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        let graph = build_graph(2);
        for cell in 0..graph.len() {
            for &other in graph.neighbors(cell) {
                assert!(graph.neighbors(other).contains(&cell));
                let d1 = graph.neighbor_distance(cell, other).unwrap();
                let d2 = graph.neighbor_distance(other, cell).unwrap();
                assert!((d1 - d2).abs() < 1e-9);
                assert!(d1 >= 10.0 - 1e-9);
            }
        }
    }

    #[test]
    fn cell_areas_tile_the_domain() {
        let graph = build_graph(3);
        let total: f64 = (0..graph.len()).map(|c| graph.area(c)).sum();
        for cell in 0..graph.len() {
            assert!(graph.area(cell) > 0.0);
            assert!(signed_area(graph.polygon(cell)) > 0.0);
        }
        // centroid duals do not tile exactly, but come close
        let domain = graph.bounds().area();
        assert!((total - domain).abs() / domain < 0.05, "total {} vs {}", total, domain);
    }

    #[test]
    fn dual_edges_are_unique_pairs() {
        let graph = build_graph(4);
        let mut seen = std::collections::HashSet::new();
        for edge in graph.edges() {
            assert!(edge.a < edge.b);
            assert!(seen.insert((edge.a, edge.b)));
            assert!(edge.length() > 0.0);
        }
        let degree_sum: usize = (0..graph.len()).map(|c| graph.neighbors(c).len()).sum();
        assert_eq!(degree_sum, 2 * graph.edges().len());
    }

    #[test]
    fn point_location_returns_weights_summing_to_one() {
        let graph = build_graph(5);
        let queries = [
            DVec2::new(150.0, 120.0),
            DVec2::new(0.5, 30.0),
            DVec2::new(299.7, 200.0),
            DVec2::new(-20.0, 100.0),
            DVec2::new(610.0, 5.0),
        ];
        for q in queries {
            let hit = graph.containing_triangle(q).unwrap();
            let sum: f64 = hit.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(hit.weights.iter().all(|w| *w >= 0.0));
            assert!(hit.cells.iter().all(|&c| c < graph.len()));
        }
    }

    #[test]
    fn point_location_at_a_site_weights_that_site() {
        let graph = build_graph(6);
        let site = graph.site(17);
        let hit = graph.containing_triangle(site).unwrap();
        let k = hit.cells.iter().position(|&c| c == 17).unwrap();
        assert!(hit.weights[k] > 1.0 - 1e-6);
    }

    #[test]
    fn queries_far_outside_fail() {
        let graph = build_graph(7);
        assert!(matches!(
            graph.containing_triangle(DVec2::new(10.0, 1000.0)),
            Err(GeometryError::PointOutsideDomain { .. })
        ));
    }
}
