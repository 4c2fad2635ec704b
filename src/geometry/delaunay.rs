//! Incremental sweep-hull Delaunay triangulation.
//!
//! Points are inserted in order of distance from the seed triangle's
//! circumcenter. Each new point connects to the visible part of the convex hull,
//! which is found through a pseudo-angle hash, and the new edges are legalized
//! by flipping.
//!
//! Triangles are stored as flat half-edge arrays: half-edge `e` starts at
//! `triangles[e]` and belongs to triangle `e / 3`; `halfedges[e]` is the
//! opposite half-edge in the neighbouring triangle or [`EMPTY`] on the hull.

use glam::DVec2;
use tracing::warn;

use super::GeometryError;

/// Sentinel for a missing half-edge or hull entry.
pub const EMPTY: usize = usize::MAX;

/// Capacity of the edge-flip stack used during legalization.
///
/// When the stack is full further flipped edges are not re-checked.
pub const EDGE_STACK_CAPACITY: usize = 512;

#[inline]
pub fn next_halfedge(e: usize) -> usize {
    if e % 3 == 2 {
        e - 2
    } else {
        e + 1
    }
}

#[inline]
pub fn prev_halfedge(e: usize) -> usize {
    if e % 3 == 0 {
        e + 2
    } else {
        e - 1
    }
}

/// True when `p, q, r` wind counter-clockwise (y up).
#[inline]
fn orient(p: DVec2, q: DVec2, r: DVec2) -> bool {
    (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y) < 0.0
}

fn circumdelta(a: DVec2, b: DVec2, c: DVec2) -> DVec2 {
    let d = b - a;
    let e = c - a;
    let bl = d.length_squared();
    let cl = e.length_squared();
    let det = 0.5 / (d.x * e.y - d.y * e.x);
    DVec2::new((e.y * bl - d.y * cl) * det, (d.x * cl - e.x * bl) * det)
}

fn circumradius_squared(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    circumdelta(a, b, c).length_squared()
}

pub fn circumcenter(a: DVec2, b: DVec2, c: DVec2) -> DVec2 {
    a + circumdelta(a, b, c)
}

/// True when `p` lies strictly inside the circumcircle of `a, b, c`.
fn in_circle(a: DVec2, b: DVec2, c: DVec2, p: DVec2) -> bool {
    let d = a - p;
    let e = b - p;
    let f = c - p;

    let ap = d.length_squared();
    let bp = e.length_squared();
    let cp = f.length_squared();

    d.x * (e.y * cp - bp * f.y) - d.y * (e.x * cp - bp * f.x) + ap * (e.x * f.y - e.y * f.x) < 0.0
}

fn pseudo_angle(d: DVec2) -> f64 {
    let p = d.x / (d.x.abs() + d.y.abs());
    if d.y > 0.0 {
        (3.0 - p) / 4.0
    } else {
        (1.0 + p) / 4.0
    }
}

/// Half-edge triangulation of a point set.
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// Vertex ids, three per triangle.
    pub triangles: Vec<usize>,
    /// Opposite half-edge for each half-edge, or [`EMPTY`] on the hull.
    pub halfedges: Vec<usize>,
    /// Convex hull vertex ids.
    pub hull: Vec<usize>,
    /// Number of flipped edges that could not be re-checked.
    pub skipped_flips: usize,
}

impl Triangulation {
    /// Triangulates `points`.
    ///
    /// Exact duplicate points (within `f64::EPSILON`) are skipped and end up in
    /// no triangle.
    ///
    /// # Errors
    /// `TooFewPoints` below three points, `Collinear` when every point lies on a line.
    pub fn new(points: &[DVec2]) -> Result<Self, GeometryError> {
        let n = points.len();
        if n < 3 {
            return Err(GeometryError::TooFewPoints(n));
        }

        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        let bbox_center = (min + max) * 0.5;

        let i0 = nearest_to(points, bbox_center, None).ok_or(GeometryError::Collinear)?;
        let p0 = points[i0];
        let mut i1 = nearest_to(points, p0, Some(i0)).ok_or(GeometryError::Collinear)?;

        let mut min_radius = f64::INFINITY;
        let mut i2 = EMPTY;
        for (i, p) in points.iter().enumerate() {
            if i == i0 || i == i1 {
                continue;
            }
            let r = circumradius_squared(p0, points[i1], *p);
            if r < min_radius {
                min_radius = r;
                i2 = i;
            }
        }
        if i2 == EMPTY || !min_radius.is_finite() {
            return Err(GeometryError::Collinear);
        }

        if orient(p0, points[i1], points[i2]) {
            std::mem::swap(&mut i1, &mut i2);
        }

        let center = circumcenter(p0, points[i1], points[i2]);
        let dists: Vec<f64> = points.iter().map(|p| (*p - center).length_squared()).collect();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_unstable_by(|&a, &b| dists[a].total_cmp(&dists[b]));

        let mut sweep = Sweep::new(points, center);
        sweep.seed(i0, i1, i2);

        let mut previous: Option<DVec2> = None;
        for &i in &order {
            let p = points[i];
            if let Some(prev) = previous {
                if (p - prev).abs().max_element() <= f64::EPSILON {
                    continue;
                }
            }
            previous = Some(p);
            if i == i0 || i == i1 || i == i2 {
                continue;
            }
            sweep.insert(i);
        }

        if sweep.skipped_flips > 0 {
            warn!(
                skipped = sweep.skipped_flips,
                capacity = EDGE_STACK_CAPACITY,
                "edge-flip stack overflowed; some edges were not re-legalized"
            );
        }

        let hull = sweep.hull();
        Ok(Self {
            triangles: sweep.triangles,
            halfedges: sweep.halfedges,
            hull,
            skipped_flips: sweep.skipped_flips,
        })
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The three vertex ids of triangle `t`.
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        [
            self.triangles[3 * t],
            self.triangles[3 * t + 1],
            self.triangles[3 * t + 2],
        ]
    }

    /// For each point, one half-edge ending at it (or [`EMPTY`] if the point is
    /// in no triangle). Hull points get their hull-side half-edge so a walk
    /// around them starts at the open end of the fan.
    pub fn incoming_edges(&self, point_count: usize) -> Vec<usize> {
        let mut index = vec![EMPTY; point_count];
        for e in 0..self.triangles.len() {
            let endpoint = self.triangles[next_halfedge(e)];
            if index[endpoint] == EMPTY || self.halfedges[e] == EMPTY {
                index[endpoint] = e;
            }
        }
        index
    }
}

fn nearest_to(points: &[DVec2], target: DVec2, exclude: Option<usize>) -> Option<usize> {
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for (i, p) in points.iter().enumerate() {
        if Some(i) == exclude {
            continue;
        }
        let d = (*p - target).length_squared();
        if d < best_dist && (exclude.is_none() || d > 0.0) {
            best_dist = d;
            best = Some(i);
        }
    }
    best
}

/// Mutable state of one triangulation run.
struct Sweep<'a> {
    points: &'a [DVec2],
    center: DVec2,
    triangles: Vec<usize>,
    halfedges: Vec<usize>,
    hull_prev: Vec<usize>,
    hull_next: Vec<usize>,
    hull_tri: Vec<usize>,
    hull_hash: Vec<usize>,
    hull_start: usize,
    edge_stack: [usize; EDGE_STACK_CAPACITY],
    skipped_flips: usize,
}

impl<'a> Sweep<'a> {
    fn new(points: &'a [DVec2], center: DVec2) -> Self {
        let n = points.len();
        let max_triangles = (2 * n).saturating_sub(5).max(1);
        let hash_size = (n as f64).sqrt().ceil().max(1.0) as usize;
        Self {
            points,
            center,
            triangles: Vec::with_capacity(max_triangles * 3),
            halfedges: Vec::with_capacity(max_triangles * 3),
            hull_prev: vec![EMPTY; n],
            hull_next: vec![EMPTY; n],
            hull_tri: vec![EMPTY; n],
            hull_hash: vec![EMPTY; hash_size],
            hull_start: EMPTY,
            edge_stack: [0; EDGE_STACK_CAPACITY],
            skipped_flips: 0,
        }
    }

    fn hash_key(&self, p: DVec2) -> usize {
        let len = self.hull_hash.len();
        ((pseudo_angle(p - self.center) * len as f64).floor() as usize) % len
    }

    fn seed(&mut self, i0: usize, i1: usize, i2: usize) {
        self.hull_start = i0;

        self.hull_next[i0] = i1;
        self.hull_prev[i2] = i1;
        self.hull_next[i1] = i2;
        self.hull_prev[i0] = i2;
        self.hull_next[i2] = i0;
        self.hull_prev[i1] = i0;

        self.hull_tri[i0] = 0;
        self.hull_tri[i1] = 1;
        self.hull_tri[i2] = 2;

        for i in [i0, i1, i2] {
            let key = self.hash_key(self.points[i]);
            self.hull_hash[key] = i;
        }

        self.add_triangle(i0, i1, i2, EMPTY, EMPTY, EMPTY);
    }

    fn insert(&mut self, i: usize) {
        let p = self.points[i];

        // find a visible edge on the hull
        let key = self.hash_key(p);
        let size = self.hull_hash.len();
        let mut start = EMPTY;
        for j in 0..size {
            start = self.hull_hash[(key + j) % size];
            if start != EMPTY && start != self.hull_next[start] {
                break;
            }
        }
        if start == EMPTY {
            return;
        }
        start = self.hull_prev[start];

        let mut e = start;
        loop {
            let q = self.hull_next[e];
            if orient(p, self.points[e], self.points[q]) {
                break;
            }
            e = q;
            if e == start {
                // point on the hull within floating error
                return;
            }
        }

        let t = self.add_triangle(e, i, self.hull_next[e], EMPTY, EMPTY, self.hull_tri[e]);
        self.hull_tri[i] = self.legalize(t + 2);
        self.hull_tri[e] = t;

        // walk forward along the hull
        let mut next = self.hull_next[e];
        loop {
            let q = self.hull_next[next];
            if !orient(p, self.points[next], self.points[q]) {
                break;
            }
            let t = self.add_triangle(next, i, q, self.hull_tri[i], EMPTY, self.hull_tri[next]);
            self.hull_tri[i] = self.legalize(t + 2);
            self.hull_next[next] = next;
            next = q;
        }

        // walk backward
        if e == start {
            loop {
                let q = self.hull_prev[e];
                if !orient(p, self.points[q], self.points[e]) {
                    break;
                }
                let t = self.add_triangle(q, i, e, EMPTY, self.hull_tri[e], self.hull_tri[q]);
                self.legalize(t + 2);
                self.hull_tri[q] = t;
                self.hull_next[e] = e;
                e = q;
            }
        }

        self.hull_start = e;
        self.hull_prev[i] = e;
        self.hull_next[e] = i;
        self.hull_prev[next] = i;
        self.hull_next[i] = next;

        let key = self.hash_key(p);
        self.hull_hash[key] = i;
        let key = self.hash_key(self.points[e]);
        self.hull_hash[key] = e;
    }

    fn link(&mut self, a: usize, b: usize) {
        self.halfedges[a] = b;
        if b != EMPTY {
            self.halfedges[b] = a;
        }
    }

    fn add_triangle(&mut self, i0: usize, i1: usize, i2: usize, a: usize, b: usize, c: usize) -> usize {
        let t = self.triangles.len();
        self.triangles.extend_from_slice(&[i0, i1, i2]);
        self.halfedges.extend_from_slice(&[EMPTY, EMPTY, EMPTY]);
        self.link(t, a);
        self.link(t + 1, b);
        self.link(t + 2, c);
        t
    }

    fn legalize(&mut self, edge: usize) -> usize {
        let mut a = edge;
        let mut depth = 0usize;
        let mut ar;

        loop {
            let b = self.halfedges[a];
            let a0 = a - a % 3;
            ar = a0 + (a + 2) % 3;

            if b == EMPTY {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                a = self.edge_stack[depth];
                continue;
            }

            let b0 = b - b % 3;
            let al = a0 + (a + 1) % 3;
            let bl = b0 + (b + 2) % 3;

            let p0 = self.triangles[ar];
            let pr = self.triangles[a];
            let pl = self.triangles[al];
            let p1 = self.triangles[bl];

            let illegal = in_circle(
                self.points[p0],
                self.points[pr],
                self.points[pl],
                self.points[p1],
            );

            if illegal {
                self.triangles[a] = p1;
                self.triangles[b] = p0;

                let hbl = self.halfedges[bl];

                // the flipped edge was on the hull; repoint the hull triangle
                if hbl == EMPTY {
                    let mut e = self.hull_start;
                    loop {
                        if self.hull_tri[e] == bl {
                            self.hull_tri[e] = a;
                            break;
                        }
                        e = self.hull_prev[e];
                        if e == self.hull_start {
                            break;
                        }
                    }
                }

                self.link(a, hbl);
                let har = self.halfedges[ar];
                self.link(b, har);
                self.link(ar, bl);

                let br = b0 + (b + 1) % 3;
                if depth < EDGE_STACK_CAPACITY {
                    self.edge_stack[depth] = br;
                    depth += 1;
                } else {
                    self.skipped_flips += 1;
                }
            } else {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                a = self.edge_stack[depth];
            }
        }

        ar
    }

    fn hull(&self) -> Vec<usize> {
        let mut hull = Vec::new();
        let mut e = self.hull_start;
        loop {
            hull.push(e);
            e = self.hull_next[e];
            if e == self.hull_start || e == EMPTY {
                break;
            }
        }
        hull
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{poisson, Bounds};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_points(seed: u64) -> Vec<DVec2> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        poisson::poisson_disk(Bounds::new(200.0, 150.0), 9.0, &mut rng, 30)
    }

    #[test]
    fn halfedges_are_symmetric() {
        let points = sample_points(3);
        let tri = Triangulation::new(&points).unwrap();

        assert!(!tri.is_empty());
        for (e, &opposite) in tri.halfedges.iter().enumerate() {
            if opposite != EMPTY {
                assert_eq!(tri.halfedges[opposite], e);
                // opposite half-edges run between the same two points
                assert_eq!(tri.triangles[e], tri.triangles[next_halfedge(opposite)]);
                assert_eq!(tri.triangles[opposite], tri.triangles[next_halfedge(e)]);
            }
        }
    }

    #[test]
    fn circumcircles_are_empty() {
        let points = sample_points(11);
        let tri = Triangulation::new(&points).unwrap();

        for t in 0..tri.len() {
            let [a, b, c] = tri.triangle(t);
            let center = circumcenter(points[a], points[b], points[c]);
            let r_sq = (points[a] - center).length_squared();
            for (i, p) in points.iter().enumerate() {
                if i == a || i == b || i == c {
                    continue;
                }
                let d_sq = (*p - center).length_squared();
                assert!(
                    d_sq >= r_sq * (1.0 - 1e-9),
                    "point {} inside circumcircle of triangle {}",
                    i,
                    t
                );
            }
        }
    }

    #[test]
    fn euler_triangle_count() {
        let points = sample_points(5);
        let tri = Triangulation::new(&points).unwrap();
        // every point is used, so T = 2n - h - 2
        assert_eq!(tri.len(), 2 * points.len() - tri.hull.len() - 2);
        assert_eq!(tri.skipped_flips, 0);
    }

    #[test]
    fn incoming_edges_end_at_their_point() {
        let points = sample_points(8);
        let tri = Triangulation::new(&points).unwrap();
        let incoming = tri.incoming_edges(points.len());

        for (p, &e) in incoming.iter().enumerate() {
            assert_ne!(e, EMPTY);
            assert_eq!(tri.triangles[next_halfedge(e)], p);
        }
        for &h in &tri.hull {
            assert_eq!(tri.halfedges[incoming[h]], EMPTY);
        }
    }

    #[test]
    fn rejects_degenerate_input() {
        let two = [DVec2::ZERO, DVec2::X];
        assert!(matches!(
            Triangulation::new(&two),
            Err(GeometryError::TooFewPoints(2))
        ));

        let line: Vec<DVec2> = (0..10).map(|i| DVec2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(matches!(
            Triangulation::new(&line),
            Err(GeometryError::Collinear)
        ));
    }

    #[test]
    fn square_with_center() {
        let points = [
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
            DVec2::new(5.0, 5.0),
        ];
        let tri = Triangulation::new(&points).unwrap();
        assert_eq!(tri.len(), 4);
        assert_eq!(tri.hull.len(), 4);
        assert!(!tri.hull.contains(&4));
    }
}
