//! Drainage network over the cell graph.
//!
//! One hydrology pass rebuilds, from current heights:
//! 1. river mouths (continental cells touching the ocean),
//! 2. steepest-descent receivers,
//! 3. basins (one per mouth or lake seed),
//! 4. lake overflow, joining lakes lowest pass first into the drained network,
//! 5. drainage area and discharge accumulated down the receiver forest.
//!
//! Ocean cells take no part in the drainage graph.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use tracing::debug;

use crate::terrain::World;

/// Receiver forest with accumulated flow, rebuilt every hydrology pass.
#[derive(Debug, Clone, Default)]
pub struct DrainageGraph {
    /// Downstream neighbour per cell; `None` for roots and ocean cells.
    pub receivers: Vec<Option<usize>>,
    /// Planar distance to the receiver (0 for cells without one).
    pub receiver_distance: Vec<f64>,
    /// Upstream neighbours per cell (inverse of `receivers`).
    pub children: Vec<Vec<usize>>,
    /// River mouth cells, the roots of the drained forest.
    pub mouths: Vec<usize>,
    /// Roots of lakes that found no outflow.
    pub undrained: Vec<usize>,
    /// Accumulated upstream area, own cell included.
    pub drainage_area: Vec<f64>,
    /// Accumulated upstream area × precipitation, own cell included.
    pub discharge: Vec<f64>,
}

impl DrainageGraph {
    /// Builds the children map and accumulates flow for a receiver assignment.
    ///
    /// # Arguments
    /// * `receivers` - Receiver per cell; must be acyclic
    /// * `receiver_distance` - Distance to the receiver per cell
    /// * `mouths` - River mouth cells
    /// * `member` - Cells that take part in drainage (continental cells)
    /// * `areas` - Cell areas
    /// * `precipitation` - Precipitation per cell
    pub fn from_receivers(
        receivers: Vec<Option<usize>>,
        receiver_distance: Vec<f64>,
        mouths: Vec<usize>,
        member: &[bool],
        areas: &[f64],
        precipitation: &[f64],
    ) -> Self {
        let children = children_of(&receivers);

        let mut is_mouth = vec![false; receivers.len()];
        for &m in &mouths {
            is_mouth[m] = true;
        }
        let undrained: Vec<usize> = (0..receivers.len())
            .filter(|&c| member[c] && receivers[c].is_none() && !is_mouth[c])
            .collect();

        let roots: Vec<usize> = mouths.iter().chain(undrained.iter()).copied().collect();
        let (drainage_area, discharge) =
            accumulate(&roots, &receivers, &children, areas, precipitation);

        Self {
            receivers,
            receiver_distance,
            children,
            mouths,
            undrained,
            drainage_area,
            discharge,
        }
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Mouths followed by undrained lake roots.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.mouths.iter().chain(self.undrained.iter()).copied()
    }

    /// Copies receivers and accumulated flow onto the world's cells.
    pub fn write_to(&self, world: &mut World) {
        for (id, cell) in world.cells.iter_mut().enumerate() {
            cell.receiver = self.receivers[id];
            cell.drainage_area = self.drainage_area[id];
            cell.discharge = self.discharge[id];
        }
    }
}

/// Whether a basin drains to the sea or is a closed depression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasinKind {
    Mouth,
    Lake,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basin {
    pub root: usize,
    pub kind: BasinKind,
}

/// How a lake was joined to the drained network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LakeOutflow {
    /// Basin index of the lake.
    pub lake: usize,
    /// Basin the lake now drains into.
    pub target: usize,
    /// `max(h_from, h_to)` of the pass edge.
    pub pass_height: f64,
    /// Lake-side cell of the pass.
    pub from: usize,
    /// Joined-side cell of the pass.
    pub to: usize,
}

/// Result of lake resolution; consumed when building the drainage graph.
#[derive(Debug, Clone, Default)]
pub struct LakeMergeGraph {
    pub basins: Vec<Basin>,
    /// Basin label per cell (`None` for ocean cells).
    pub labels: Vec<Option<usize>>,
    pub outflows: Vec<LakeOutflow>,
}

impl LakeMergeGraph {
    pub fn lake_count(&self) -> usize {
        self.basins.iter().filter(|b| b.kind == BasinKind::Lake).count()
    }
}

/// Flags continental cells with at least one oceanic neighbour.
pub fn find_river_mouths(world: &World) -> Vec<bool> {
    (0..world.len())
        .into_par_iter()
        .map(|id| {
            world.cells[id].is_continental()
                && world
                    .graph
                    .neighbors(id)
                    .iter()
                    .any(|&n| world.cells[n].is_oceanic())
        })
        .collect()
}

/// Sets `is_river_mouth` on every cell. Returns the number of mouths.
pub fn mark_river_mouths(world: &mut World) -> usize {
    let mouths = find_river_mouths(world);
    let mut count = 0;
    for (cell, is_mouth) in world.cells.iter_mut().zip(mouths) {
        cell.is_river_mouth = is_mouth;
        count += is_mouth as usize;
    }
    count
}

/// Lowest strictly-lower neighbour of every non-mouth continental cell.
pub fn steepest_descent(world: &World) -> Vec<Option<usize>> {
    (0..world.len())
        .into_par_iter()
        .map(|id| {
            let cell = &world.cells[id];
            if !cell.is_continental() || cell.is_river_mouth {
                return None;
            }
            let mut best = None;
            let mut best_h = cell.height;
            for &n in world.graph.neighbors(id) {
                let h = world.cells[n].height;
                if h < best_h {
                    best_h = h;
                    best = Some(n);
                }
            }
            best
        })
        .collect()
}

pub fn children_of(receivers: &[Option<usize>]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); receivers.len()];
    for (cell, receiver) in receivers.iter().enumerate() {
        if let Some(r) = receiver {
            children[*r].push(cell);
        }
    }
    children
}

/// Breadth-first flood from every root through `children`, labelling each
/// reached cell with the index of its root in `roots`.
pub fn label_basins(roots: &[usize], children: &[Vec<usize>]) -> Vec<Option<usize>> {
    let mut labels = vec![None; children.len()];
    let mut queue = VecDeque::new();
    for (basin, &root) in roots.iter().enumerate() {
        labels[root] = Some(basin);
        queue.push_back(root);
        while let Some(cell) = queue.pop_front() {
            for &child in &children[cell] {
                labels[child] = Some(basin);
                queue.push_back(child);
            }
        }
    }
    labels
}

#[derive(Clone, Copy, Debug)]
struct PassItem {
    height: f64,
    order: usize,
}

impl PartialEq for PassItem {
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height && self.order == other.order
    }
}

impl Eq for PassItem {}

// Min-heap by pass height, then candidate order, via reversed ordering.
impl PartialOrd for PassItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PassItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .partial_cmp(&self.height)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.order.cmp(&self.order))
    }
}

struct Pass {
    height: f64,
    a: usize,
    b: usize,
}

/// Reroutes the lake containing `lake_cell` so it drains through `outlet`.
///
/// The receiver path from `lake_cell` up to the lake root is reversed and
/// `lake_cell` then points at `outlet`.
fn graft(receivers: &mut [Option<usize>], lake_cell: usize, outlet: usize) {
    let mut downstream = outlet;
    let mut cell = lake_cell;
    loop {
        let next = receivers[cell];
        receivers[cell] = Some(downstream);
        match next {
            Some(n) => {
                downstream = cell;
                cell = n;
            }
            None => break,
        }
    }
}

/// Joins lakes to the drained network, lowest pass first, rewriting `receivers`.
///
/// Lakes with no pass to any drained basin are left untouched.
pub fn resolve_lakes(world: &World, receivers: &mut [Option<usize>]) -> LakeMergeGraph {
    let children = children_of(receivers);

    let mut basins = Vec::new();
    for cell in &world.cells {
        if cell.is_continental() && receivers[cell.id].is_none() {
            let kind = if cell.is_river_mouth {
                BasinKind::Mouth
            } else {
                BasinKind::Lake
            };
            basins.push(Basin {
                root: cell.id,
                kind,
            });
        }
    }
    let roots: Vec<usize> = basins.iter().map(|b| b.root).collect();
    let labels = label_basins(&roots, &children);

    let mut passes = Vec::new();
    let mut by_basin: Vec<Vec<usize>> = vec![Vec::new(); basins.len()];
    for edge in world.graph.edges() {
        let (Some(ba), Some(bb)) = (labels[edge.a], labels[edge.b]) else {
            continue;
        };
        if ba == bb {
            continue;
        }
        if basins[ba].kind == BasinKind::Mouth && basins[bb].kind == BasinKind::Mouth {
            continue;
        }
        let height = world.cells[edge.a].height.max(world.cells[edge.b].height);
        by_basin[ba].push(passes.len());
        by_basin[bb].push(passes.len());
        passes.push(Pass {
            height,
            a: edge.a,
            b: edge.b,
        });
    }

    let mut joined: Vec<bool> = basins.iter().map(|b| b.kind == BasinKind::Mouth).collect();
    let mut heap = BinaryHeap::new();
    for (basin, candidates) in by_basin.iter().enumerate() {
        if joined[basin] {
            for &order in candidates {
                heap.push(PassItem {
                    height: passes[order].height,
                    order,
                });
            }
        }
    }

    let mut outflows = Vec::new();
    while let Some(PassItem { order, .. }) = heap.pop() {
        let pass = &passes[order];
        let (Some(ba), Some(bb)) = (labels[pass.a], labels[pass.b]) else {
            continue;
        };
        let (lake, target, from, to) = match (joined[ba], joined[bb]) {
            (true, false) => (bb, ba, pass.b, pass.a),
            (false, true) => (ba, bb, pass.a, pass.b),
            _ => continue,
        };

        graft(receivers, from, to);
        joined[lake] = true;
        outflows.push(LakeOutflow {
            lake,
            target,
            pass_height: pass.height,
            from,
            to,
        });

        for &next in &by_basin[lake] {
            let p = &passes[next];
            let other = if labels[p.a] == Some(lake) {
                labels[p.b]
            } else {
                labels[p.a]
            };
            if other.is_some_and(|o| !joined[o]) {
                heap.push(PassItem {
                    height: p.height,
                    order: next,
                });
            }
        }
    }

    LakeMergeGraph {
        basins,
        labels,
        outflows,
    }
}

/// Post-order of the tree below `root` (children before parents), without recursion.
fn post_order(root: usize, children: &[Vec<usize>]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((cell, expanded)) = stack.pop() {
        if expanded {
            out.push(cell);
            continue;
        }
        stack.push((cell, true));
        for &child in &children[cell] {
            stack.push((child, false));
        }
    }
    out
}

/// Sums area and discharge down every tree rooted at `roots`.
///
/// Cells outside every tree keep their own area and discharge.
pub fn accumulate(
    roots: &[usize],
    receivers: &[Option<usize>],
    children: &[Vec<usize>],
    areas: &[f64],
    precipitation: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let mut drainage_area = areas.to_vec();
    let mut discharge: Vec<f64> = areas
        .iter()
        .zip(precipitation)
        .map(|(a, p)| a * p)
        .collect();

    let trees: Vec<Vec<(usize, f64, f64)>> = roots
        .par_iter()
        .map(|&root| {
            let order = post_order(root, children);
            let mut slot = HashMap::with_capacity(order.len());
            let mut totals = Vec::with_capacity(order.len());
            for &cell in &order {
                slot.insert(cell, totals.len());
                totals.push((cell, areas[cell], areas[cell] * precipitation[cell]));
            }
            for i in 0..totals.len() {
                let (cell, area, flow) = totals[i];
                if cell == root {
                    continue;
                }
                if let Some(j) = receivers[cell].and_then(|r| slot.get(&r).copied()) {
                    totals[j].1 += area;
                    totals[j].2 += flow;
                }
            }
            totals
        })
        .collect();

    for tree in trees {
        for (cell, area, flow) in tree {
            drainage_area[cell] = area;
            discharge[cell] = flow;
        }
    }

    (drainage_area, discharge)
}

/// Runs receivers, lake resolution and accumulation for the current heights.
///
/// River mouths must already be marked on the cells.
pub fn build_drainage_graph(world: &World) -> DrainageGraph {
    let mut receivers = steepest_descent(world);
    let lakes = resolve_lakes(world, &mut receivers);

    let receiver_distance: Vec<f64> = receivers
        .iter()
        .enumerate()
        .map(|(cell, receiver)| match receiver {
            Some(r) => world.graph.neighbor_distance(cell, *r).unwrap_or_else(|| {
                let bounds = world.bounds();
                bounds
                    .toroidal_delta(world.cells[cell].position, world.cells[*r].position)
                    .length()
            }),
            None => 0.0,
        })
        .collect();

    let member: Vec<bool> = world.cells.iter().map(|c| c.is_continental()).collect();
    let areas: Vec<f64> = world.cells.iter().map(|c| c.area).collect();
    let precipitation: Vec<f64> = world.cells.iter().map(|c| c.precipitation).collect();
    let mouths: Vec<usize> = world
        .cells
        .iter()
        .filter(|c| c.is_river_mouth)
        .map(|c| c.id)
        .collect();

    let graph = DrainageGraph::from_receivers(
        receivers,
        receiver_distance,
        mouths,
        &member,
        &areas,
        &precipitation,
    );

    debug!(
        mouths = graph.mouths.len(),
        lakes = lakes.lake_count(),
        joined = lakes.outflows.len(),
        undrained = graph.undrained.len(),
        "built drainage graph"
    );

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tectonics::PlateType;
    use crate::terrain::test_support::grid_world;

    fn assert_acyclic(receivers: &[Option<usize>]) {
        for start in 0..receivers.len() {
            let mut cell = start;
            let mut steps = 0;
            while let Some(r) = receivers[cell] {
                cell = r;
                steps += 1;
                assert!(steps <= receivers.len(), "cycle through cell {}", start);
            }
        }
    }

    fn root_of(receivers: &[Option<usize>], mut cell: usize) -> usize {
        while let Some(r) = receivers[cell] {
            cell = r;
        }
        cell
    }

    /// Ocean in columns 0-1; a closed depression in column 6 fed by columns 5 and 7.
    fn coastal_world_with_lake() -> World {
        let cols = 12;
        let mut world = grid_world(cols, 6, 10.0);
        let profile = [0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 1.5, 5.0, 4.0, 3.0, 2.0, 1.0];
        for cell in &mut world.cells {
            let col = cell.id % cols;
            let row = cell.id / cols;
            cell.precipitation = 1.0;
            if col < 2 {
                cell.plate_type = PlateType::Oceanic;
                cell.height = -20.0;
            } else {
                cell.plate_type = PlateType::Continental;
                cell.height = profile[col] + 0.001 * row as f64;
            }
        }
        mark_river_mouths(&mut world);
        world
    }

    #[test]
    fn mouths_touch_the_ocean() {
        let world = coastal_world_with_lake();
        for cell in &world.cells {
            let col = cell.id % 12;
            assert_eq!(cell.is_river_mouth, col == 2 || col == 11, "cell {}", cell.id);
        }
    }

    #[test]
    fn steepest_descent_picks_strictly_lower_neighbours() {
        let world = coastal_world_with_lake();
        let receivers = steepest_descent(&world);
        for (cell, receiver) in receivers.iter().enumerate() {
            if let Some(r) = receiver {
                assert!(world.graph.neighbors(cell).contains(r));
                assert!(world.cells[*r].height < world.cells[cell].height);
            }
        }
        // bottom of the depression has nowhere to go
        assert_eq!(receivers[6], None);
    }

    #[test]
    fn lake_overflows_through_its_lowest_pass() {
        let world = coastal_world_with_lake();
        let mut receivers = steepest_descent(&world);
        let lakes = resolve_lakes(&world, &mut receivers);

        assert_eq!(lakes.lake_count(), 1);
        assert_eq!(lakes.outflows.len(), 1);
        let outflow = lakes.outflows[0];
        // column 5 drains into the pit, so the pass is the column 4-5 edge
        assert_eq!(outflow.from % 12, 5);
        assert_eq!(outflow.to % 12, 4);
        assert!((outflow.pass_height - 4.0).abs() < 0.01);
        assert_eq!(receivers[outflow.from], Some(outflow.to));

        // the old pit now drains uphill along the reversed path
        let pit_receiver = receivers[6].unwrap();
        assert!(world.cells[pit_receiver].height > world.cells[6].height);

        assert_acyclic(&receivers);
        for cell in &world.cells {
            if cell.is_continental() {
                assert!(world.cells[root_of(&receivers, cell.id)].is_river_mouth);
            }
        }
    }

    #[test]
    fn accumulated_area_at_roots_equals_land_area() {
        let world = coastal_world_with_lake();
        let graph = build_drainage_graph(&world);

        assert!(graph.undrained.is_empty());
        assert_acyclic(&graph.receivers);

        let land: f64 = world.cells.iter().filter(|c| c.is_continental()).map(|c| c.area).sum();
        let at_roots: f64 = graph.roots().map(|r| graph.drainage_area[r]).sum();
        assert!((land - at_roots).abs() < 1e-6 * land);

        for cell in 0..graph.len() {
            if let Some(r) = graph.receivers[cell] {
                assert!(graph.drainage_area[r] > graph.drainage_area[cell]);
                assert!(graph.receiver_distance[cell] > 0.0);
            }
        }
        // uniform precipitation of 1 makes discharge equal area
        for cell in 0..graph.len() {
            assert!((graph.discharge[cell] - graph.drainage_area[cell]).abs() < 1e-9);
        }
    }

    #[test]
    fn enclosed_basin_stays_a_lake() {
        let mut world = grid_world(10, 10, 10.0);
        let center = world.bounds().center();
        for cell in &mut world.cells {
            cell.plate_type = PlateType::Continental;
            cell.precipitation = 2.0;
            cell.height = (cell.position - center).length();
        }
        assert_eq!(mark_river_mouths(&mut world), 0);

        let graph = build_drainage_graph(&world);
        assert!(graph.mouths.is_empty());
        assert!(!graph.undrained.is_empty());
        assert_acyclic(&graph.receivers);

        let total: f64 = world.cells.iter().map(|c| c.area).sum();
        let at_roots: f64 = graph.roots().map(|r| graph.drainage_area[r]).sum();
        assert!((total - at_roots).abs() < 1e-6 * total);
    }

    #[test]
    fn ocean_cells_are_not_drained() {
        let world = coastal_world_with_lake();
        let graph = build_drainage_graph(&world);
        for cell in world.cells.iter().filter(|c| c.is_oceanic()) {
            assert_eq!(graph.receivers[cell.id], None);
            assert!(graph.children[cell.id].is_empty());
            assert_eq!(graph.drainage_area[cell.id], cell.area);
        }
    }

    #[test]
    fn post_order_visits_children_first() {
        let receivers = vec![None, Some(0), Some(0), Some(1), Some(3)];
        let children = children_of(&receivers);
        let order = post_order(0, &children);
        assert_eq!(order.len(), 5);
        let pos = |c: usize| order.iter().position(|&x| x == c).unwrap();
        assert!(pos(4) < pos(3) && pos(3) < pos(1) && pos(1) < pos(0));
        assert!(pos(2) < pos(0));
    }
}
