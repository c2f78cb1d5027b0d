// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-sector flow fields: a Dijkstra-derived gradient of unit-vector
//! directions pointing toward goal tile(s) within one zone of one sector.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::math::{Fixed64, Fixed64Vec2, SQRT_2};

use super::sector::{Sector, ZoneId};
use super::terrain::Terrain;

/// One cell of a built flow field.
#[derive(Clone, Copy, Debug)]
pub struct FlowCell {
    pub direction: Fixed64Vec2,
    pub distance: Fixed64,
}

impl Default for FlowCell {
    fn default() -> Self {
        Self {
            direction: Fixed64Vec2::ZERO,
            distance: Fixed64::MAX_VALUE,
        }
    }
}

/// A flow field covering one sector, for one zone within it.
#[derive(Clone, Debug)]
pub struct FlowField {
    pub sector_x: i32,
    pub sector_y: i32,
    pub zone: ZoneId,
    size: i32,
    cells: Vec<FlowCell>,
    pub is_complete: bool,
}

impl FlowField {
    fn empty(sector_x: i32, sector_y: i32, zone: ZoneId, size: i32) -> Self {
        Self {
            sector_x,
            sector_y,
            zone,
            size,
            cells: vec![FlowCell::default(); (size * size) as usize],
            is_complete: false,
        }
    }

    fn local_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.size || y >= self.size {
            None
        } else {
            Some((y * self.size + x) as usize)
        }
    }

    /// Samples the cell at a world tile coordinate, if within this field's sector.
    #[must_use]
    pub fn sample_world_tile(&self, world_x: i32, world_y: i32) -> Option<FlowCell> {
        let lx = world_x - self.sector_x * self.size;
        let ly = world_y - self.sector_y * self.size;
        self.local_index(lx, ly).map(|i| self.cells[i])
    }
}

/// A single-source-or-multi-source cost-field seed: `(local_x, local_y,
/// seed_distance)`. `seed_distance` is usually zero (true goal tiles) but is
/// nonzero when seeding from a downstream sector's already-built distances.
pub struct Seed {
    pub local_x: i32,
    pub local_y: i32,
    pub seed_distance: Fixed64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct HeapKey(i64);

/// Runs the shared Dijkstra kernel over one sector, restricted to one zone,
/// from the given seeds. Returns distances and a wall-proximity-aware cost
/// model; diagonal steps require both orthogonal neighbors to be in-zone
/// (no corner cutting through blocked cells).
fn dijkstra(
    sector: &Sector,
    terrain: &Terrain,
    zone: ZoneId,
    ignore_buildings: bool,
    wall_cost_factor: Fixed64,
    seeds: &[Seed],
) -> Vec<Fixed64> {
    let size = sector.size();
    let n = (size * size) as usize;
    let mut distances = vec![Fixed64::MAX_VALUE; n];

    let wall_distance = compute_wall_distance(sector, terrain, ignore_buildings);

    let idx = |x: i32, y: i32| (y * size + x) as usize;
    let mut heap: BinaryHeap<Reverse<(HeapKey, i32, i32)>> = BinaryHeap::new();

    for seed in seeds {
        if seed.local_x < 0 || seed.local_y < 0 || seed.local_x >= size || seed.local_y >= size {
            continue;
        }
        let world = (
            sector.sector_x * size + seed.local_x,
            sector.sector_y * size + seed.local_y,
        );
        if sector.zone_at_world_tile(world.0, world.1) != Some(zone) {
            continue;
        }
        let i = idx(seed.local_x, seed.local_y);
        if seed.seed_distance < distances[i] {
            distances[i] = seed.seed_distance;
            heap.push(Reverse((HeapKey(seed.seed_distance.raw()), seed.local_x, seed.local_y)));
        }
    }

    const NEIGHBORS: [(i32, i32); 8] = [
        (1, 0), (-1, 0), (0, 1), (0, -1),
        (1, 1), (1, -1), (-1, 1), (-1, -1),
    ];

    while let Some(Reverse((HeapKey(raw_dist), x, y))) = heap.pop() {
        let current_dist = Fixed64::from_raw(raw_dist);
        if current_dist > distances[idx(x, y)] {
            continue;
        }

        for (dx, dy) in NEIGHBORS {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= size || ny >= size {
                continue;
            }
            let world_n = (sector.sector_x * size + nx, sector.sector_y * size + ny);
            if sector.zone_at_world_tile(world_n.0, world_n.1) != Some(zone) {
                continue;
            }

            let is_diagonal = dx != 0 && dy != 0;
            if is_diagonal {
                let ortho_a = sector.zone_at_world_tile(
                    sector.sector_x * size + x + dx,
                    sector.sector_y * size + y,
                );
                let ortho_b = sector.zone_at_world_tile(
                    sector.sector_x * size + x,
                    sector.sector_y * size + y + dy,
                );
                if ortho_a != Some(zone) || ortho_b != Some(zone) {
                    continue;
                }
            }

            let base_cost = if is_diagonal { SQRT_2 } else { Fixed64::ONE };
            let wd = wall_distance[idx(nx, ny)];
            let wall_cost = wall_cost_factor / (Fixed64::ONE + wd);
            let edge_cost = base_cost + wall_cost;
            let tentative = current_dist + edge_cost;

            let n_i = idx(nx, ny);
            if tentative < distances[n_i] {
                distances[n_i] = tentative;
                heap.push(Reverse((HeapKey(tentative.raw()), nx, ny)));
            }
        }
    }

    distances
}

/// Chebyshev distance (capped at a few tiles) from each cell to the nearest
/// impassable tile, via bounded multi-source BFS. Used for the wall-hugging
/// cost penalty, not for correctness.
fn compute_wall_distance(sector: &Sector, terrain: &Terrain, ignore_buildings: bool) -> Vec<Fixed64> {
    let size = sector.size();
    let n = (size * size) as usize;
    const CAP: i32 = 4;
    let mut dist = vec![CAP; n];
    let mut queue = std::collections::VecDeque::new();
    let idx = |x: i32, y: i32| (y * size + x) as usize;

    for ly in 0..size {
        for lx in 0..size {
            let world = (sector.sector_x * size + lx, sector.sector_y * size + ly);
            if !terrain.is_passable(world.0, world.1, ignore_buildings) {
                dist[idx(lx, ly)] = 0;
                queue.push_back((lx, ly));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        let d = dist[idx(x, y)];
        if d >= CAP {
            continue;
        }
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= size || ny >= size {
                continue;
            }
            if dist[idx(nx, ny)] > d + 1 {
                dist[idx(nx, ny)] = d + 1;
                queue.push_back((nx, ny));
            }
        }
    }

    dist.into_iter().map(Fixed64::from_int).collect()
}

/// Builds a complete [`FlowField`] for `zone` within `sector`, from `seeds`,
/// computing directions from the Dijkstra distance gradient.
pub fn build_flow_field(
    sector: &Sector,
    terrain: &Terrain,
    zone: ZoneId,
    ignore_buildings: bool,
    wall_cost_factor: Fixed64,
    min_magnitude: Fixed64,
    seeds: &[Seed],
) -> FlowField {
    let size = sector.size();
    let distances = dijkstra(sector, terrain, zone, ignore_buildings, wall_cost_factor, seeds);
    let mut field = FlowField::empty(sector.sector_x, sector.sector_y, zone, size);

    let idx = |x: i32, y: i32| (y * size + x) as usize;
    let at = |x: i32, y: i32, fallback: Fixed64| -> Fixed64 {
        if x < 0 || y < 0 || x >= size || y >= size {
            fallback
        } else {
            let d = distances[idx(x, y)];
            if d == Fixed64::MAX_VALUE {
                fallback
            } else {
                d
            }
        }
    };

    for y in 0..size {
        for x in 0..size {
            let here = distances[idx(x, y)];
            let cell = &mut field.cells[idx(x, y)];
            cell.distance = here;
            if here == Fixed64::MAX_VALUE {
                cell.direction = Fixed64Vec2::ZERO;
                continue;
            }
            let left = at(x - 1, y, here);
            let right = at(x + 1, y, here);
            let up = at(x, y - 1, here);
            let down = at(x, y + 1, here);
            let grad = Fixed64Vec2::new(left - right, up - down);
            if grad.length() < min_magnitude {
                cell.direction = Fixed64Vec2::ZERO;
            } else {
                cell.direction = grad.normalized();
            }
        }
    }

    field.is_complete = true;
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinding::sector::Sector;

    #[test]
    fn single_goal_produces_monotonic_gradient_toward_it() {
        let terrain = Terrain::new(8, 8);
        let sector = Sector::build(0, 0, 8, &terrain);
        let zone = sector.zone_at_world_tile(0, 0).unwrap();
        let seeds = vec![Seed { local_x: 7, local_y: 7, seed_distance: Fixed64::ZERO }];
        let field = build_flow_field(
            &sector,
            &terrain,
            zone,
            true,
            Fixed64::from_float(1.0),
            Fixed64::from_float(0.0001),
            &seeds,
        );
        assert!(field.is_complete);
        let goal_cell = field.sample_world_tile(7, 7).unwrap();
        assert_eq!(goal_cell.distance, Fixed64::ZERO);
        let far_cell = field.sample_world_tile(0, 0).unwrap();
        assert!(far_cell.distance > goal_cell.distance);
    }

    #[test]
    fn no_corner_cutting_around_a_blocked_corner() {
        let mut terrain = Terrain::new(8, 8);
        terrain.set_terrain_passable(3, 3, false);
        let sector = Sector::build(0, 0, 8, &terrain);
        let zone = sector.zone_at_world_tile(0, 0).unwrap();
        let seeds = vec![Seed { local_x: 4, local_y: 4, seed_distance: Fixed64::ZERO }];
        let field = build_flow_field(
            &sector,
            &terrain,
            zone,
            true,
            Fixed64::from_float(1.0),
            Fixed64::from_float(0.0001),
            &seeds,
        );
        // The tile diagonally adjacent to the blocked corner (2,2) must not
        // path directly through it: distance there must exceed the cardinal
        // detour cost, i.e. not simply sqrt(2) from the goal.
        let diag_cell = field.sample_world_tile(2, 2).unwrap();
        assert!(diag_cell.distance > crate::math::SQRT_2 + Fixed64::from_float(0.5));
    }
}
