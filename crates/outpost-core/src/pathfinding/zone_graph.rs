// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The sector/zone graph: portals between adjacent sectors' zones, and
//! A*-based zone-to-zone pathing with a bounded recent-paths cache.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use super::lru::Lru;
use super::sector::{Sector, ZoneId};
use super::terrain::Terrain;

/// A contiguous run of boundary tile pairs connecting two zones across
/// adjacent sectors. Multiple disjoint portals may exist between the same
/// zone pair (e.g. a wall with two gaps) and all are tracked independently.
#[derive(Clone, Debug)]
pub struct Portal {
    pub zone_a: ZoneId,
    pub zone_b: ZoneId,
    /// Boundary tiles on `zone_a`'s side, each paired positionally with the
    /// corresponding tile in `tiles_b`.
    pub tiles_a: Vec<(i32, i32)>,
    pub tiles_b: Vec<(i32, i32)>,
}

impl Portal {
    /// The midpoint tile of this portal's `zone_a` side, used for flow
    /// seeding and A* edge cost estimates.
    #[must_use]
    pub fn center_a(&self) -> (i32, i32) {
        self.tiles_a[self.tiles_a.len() / 2]
    }

    /// The midpoint tile of this portal's `zone_b` side.
    #[must_use]
    pub fn center_b(&self) -> (i32, i32) {
        self.tiles_b[self.tiles_b.len() / 2]
    }
}

fn manhattan(a: (i32, i32), b: (i32, i32)) -> i64 {
    i64::from((a.0 - b.0).abs() + (a.1 - b.1).abs())
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    f_cost: i64,
    zone: ZoneIndexKey,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap via reversed comparison on a max-heap `BinaryHeap`.
        other.f_cost.cmp(&self.f_cost)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type ZoneIndexKey = ZoneId;

/// Owns every sector's labeling, the portal list, and zone-to-zone
/// adjacency derived from it.
pub struct ZoneGraph {
    sector_size: i32,
    sectors: HashMap<(i32, i32), Sector>,
    portals: Vec<Portal>,
    adjacency: HashMap<ZoneId, Vec<usize>>,
    recent_paths: Lru<(ZoneId, ZoneId), Vec<ZoneId>>,
    pending_invalidations: Vec<(i32, i32)>,
}

impl ZoneGraph {
    /// Builds a zone graph over the full map, labeling every sector and
    /// linking portals between adjacent ones.
    #[must_use]
    pub fn build(terrain: &Terrain, sector_size: i32, recent_paths_capacity: usize) -> Self {
        let sectors_x = terrain.width_tiles().div_ceil(sector_size);
        let sectors_y = terrain.height_tiles().div_ceil(sector_size);

        let mut sectors = HashMap::new();
        for sy in 0..sectors_y {
            for sx in 0..sectors_x {
                sectors.insert((sx, sy), Sector::build(sx, sy, sector_size, terrain));
            }
        }

        let mut graph = Self {
            sector_size,
            sectors,
            portals: Vec::new(),
            adjacency: HashMap::new(),
            recent_paths: Lru::new(recent_paths_capacity),
            pending_invalidations: Vec::new(),
        };
        graph.rebuild_portals(terrain, sectors_x, sectors_y);
        graph
    }

    fn rebuild_portals(&mut self, terrain: &Terrain, sectors_x: i32, sectors_y: i32) {
        self.portals.clear();
        self.adjacency.clear();

        for sy in 0..sectors_y {
            for sx in 0..sectors_x {
                if sx + 1 < sectors_x {
                    self.scan_boundary(terrain, (sx, sy), (sx + 1, sy), false);
                }
                if sy + 1 < sectors_y {
                    self.scan_boundary(terrain, (sx, sy), (sx, sy + 1), true);
                }
            }
        }

        for (index, portal) in self.portals.iter().enumerate() {
            self.adjacency.entry(portal.zone_a).or_default().push(index);
            self.adjacency.entry(portal.zone_b).or_default().push(index);
        }
    }

    /// Scans the shared boundary between two adjacent sectors, emitting one
    /// [`Portal`] per contiguous run of passable, same-zone-pair tiles.
    fn scan_boundary(
        &mut self,
        terrain: &Terrain,
        sector_a: (i32, i32),
        sector_b: (i32, i32),
        vertical: bool,
    ) {
        let size = self.sector_size;
        let mut run: Option<(ZoneId, ZoneId, Vec<(i32, i32)>, Vec<(i32, i32)>)> = None;

        for i in 0..size {
            let (tile_a, tile_b) = if vertical {
                let x = sector_a.0 * size + i;
                (
                    (x, sector_a.1 * size + size - 1),
                    (x, sector_b.1 * size),
                )
            } else {
                let y = sector_a.1 * size + i;
                (
                    (sector_a.0 * size + size - 1, y),
                    (sector_b.0 * size, y),
                )
            };

            let passable = terrain.is_passable(tile_a.0, tile_a.1, true)
                && terrain.is_passable(tile_b.0, tile_b.1, true);

            let zone_pair = passable.then(|| {
                let za = self.sectors[&sector_a].zone_at_world_tile(tile_a.0, tile_a.1);
                let zb = self.sectors[&sector_b].zone_at_world_tile(tile_b.0, tile_b.1);
                za.zip(zb)
            }).flatten();

            match (&mut run, zone_pair) {
                (Some((ra, rb, tiles_a, tiles_b)), Some((za, zb))) if *ra == za && *rb == zb => {
                    tiles_a.push(tile_a);
                    tiles_b.push(tile_b);
                }
                _ => {
                    if let Some((za, zb, tiles_a, tiles_b)) = run.take() {
                        self.portals.push(Portal {
                            zone_a: za,
                            zone_b: zb,
                            tiles_a,
                            tiles_b,
                        });
                    }
                    run = zone_pair.map(|(za, zb)| (za, zb, vec![tile_a], vec![tile_b]));
                }
            }
        }

        if let Some((za, zb, tiles_a, tiles_b)) = run {
            self.portals.push(Portal {
                zone_a: za,
                zone_b: zb,
                tiles_a,
                tiles_b,
            });
        }
    }

    /// This graph's sector side length, in tiles.
    #[must_use]
    pub const fn sector_size(&self) -> i32 {
        self.sector_size
    }

    /// Borrows a sector by its coordinates.
    #[must_use]
    pub fn sector(&self, sector_x: i32, sector_y: i32) -> Option<&Sector> {
        self.sectors.get(&(sector_x, sector_y))
    }

    /// Looks up the zone at a world tile coordinate.
    #[must_use]
    pub fn get_zone_id_at_tile(&self, x: i32, y: i32) -> Option<ZoneId> {
        let sector_x = x.div_euclid(self.sector_size);
        let sector_y = y.div_euclid(self.sector_size);
        self.sectors.get(&(sector_x, sector_y))?.zone_at_world_tile(x, y)
    }

    /// All portals directly connecting `zone_a` and `zone_b` (in either
    /// direction), possibly more than one.
    #[must_use]
    pub fn find_all_portals_between(&self, zone_a: ZoneId, zone_b: ZoneId) -> Vec<&Portal> {
        self.adjacency
            .get(&zone_a)
            .into_iter()
            .flatten()
            .map(|&i| &self.portals[i])
            .filter(|p| {
                (p.zone_a == zone_a && p.zone_b == zone_b)
                    || (p.zone_a == zone_b && p.zone_b == zone_a)
            })
            .collect()
    }

    /// All portal indices touching `zone`.
    fn portals_of(&self, zone: ZoneId) -> &[usize] {
        self.adjacency.get(&zone).map_or(&[], Vec::as_slice)
    }

    fn representative_tile(&self, zone: ZoneId) -> (i32, i32) {
        self.sectors[&(zone.sector_x as i32, zone.sector_y as i32)]
            .representative_tile(zone.local_zone)
    }

    /// A* over the zone graph from `from_zone` to `to_zone`. Returns the
    /// ordered list of zones on the path (inclusive of both ends), or `None`
    /// if unreachable. Results are cached in a bounded LRU.
    pub fn find_zone_path(&mut self, from_zone: ZoneId, to_zone: ZoneId) -> Option<Vec<ZoneId>> {
        if from_zone == to_zone {
            return Some(vec![from_zone]);
        }
        if let Some(cached) = self.recent_paths.get(&(from_zone, to_zone)) {
            return Some(cached.clone());
        }

        let target_tile = self.representative_tile(to_zone);
        let mut open = BinaryHeap::new();
        let mut g_cost: HashMap<ZoneId, i64> = HashMap::new();
        let mut came_from: HashMap<ZoneId, ZoneId> = HashMap::new();

        g_cost.insert(from_zone, 0);
        open.push(HeapEntry {
            f_cost: manhattan(self.representative_tile(from_zone), target_tile),
            zone: from_zone,
        });

        while let Some(HeapEntry { zone, .. }) = open.pop() {
            if zone == to_zone {
                let mut path = vec![zone];
                let mut cur = zone;
                while let Some(&prev) = came_from.get(&cur) {
                    path.push(prev);
                    cur = prev;
                }
                path.reverse();
                self.recent_paths.insert((from_zone, to_zone), path.clone());
                return Some(path);
            }

            let current_g = g_cost[&zone];
            for &portal_index in self.portals_of(zone) {
                let portal = &self.portals[portal_index];
                let neighbor = if portal.zone_a == zone { portal.zone_b } else { portal.zone_a };
                let step_cost = i64::from(self.sector_size);
                let tentative = current_g + step_cost;
                if tentative < *g_cost.get(&neighbor).unwrap_or(&i64::MAX) {
                    g_cost.insert(neighbor, tentative);
                    came_from.insert(neighbor, zone);
                    let h = manhattan(self.representative_tile(neighbor), target_tile);
                    open.push(HeapEntry {
                        f_cost: tentative + h,
                        zone: neighbor,
                    });
                }
            }
        }
        None
    }

    /// Marks a sector (and, per the invalidation contract, its 4 orthogonal
    /// neighbors) as needing a rebuild. Batched until [`Self::flush_pending_invalidations`].
    pub fn invalidate_sector(&mut self, sx: i32, sy: i32) {
        for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
            self.pending_invalidations.push((sx + dx, sy + dy));
        }
    }

    /// Sorts and deduplicates pending invalidations, rebuilds the affected
    /// sectors and all portals, and clears the recent-path cache.
    ///
    /// Returns `true` if any rebuild happened (callers use this to decide
    /// whether to also clear flow-field caches, which must happen globally).
    pub fn flush_pending_invalidations(&mut self, terrain: &Terrain) -> bool {
        if self.pending_invalidations.is_empty() {
            return false;
        }
        self.pending_invalidations.sort_unstable();
        self.pending_invalidations.dedup();

        for &(sx, sy) in &self.pending_invalidations {
            if let std::collections::hash_map::Entry::Occupied(mut e) =
                self.sectors.entry((sx, sy))
            {
                e.insert(Sector::build(sx, sy, self.sector_size, terrain));
            }
        }

        let sectors_x = terrain.width_tiles().div_ceil(self.sector_size);
        let sectors_y = terrain.height_tiles().div_ceil(self.sector_size);
        self.rebuild_portals(terrain, sectors_x, sectors_y);
        self.recent_paths.clear();
        self.pending_invalidations.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_terrain() -> Terrain {
        Terrain::new(32, 32)
    }

    #[test]
    fn adjacent_open_sectors_have_a_portal() {
        let terrain = open_terrain();
        let graph = ZoneGraph::build(&terrain, 16, 16);
        let za = graph.get_zone_id_at_tile(15, 0).unwrap();
        let zb = graph.get_zone_id_at_tile(16, 0).unwrap();
        assert!(!graph.find_all_portals_between(za, zb).is_empty());
    }

    #[test]
    fn find_zone_path_across_two_sectors() {
        let terrain = open_terrain();
        let mut graph = ZoneGraph::build(&terrain, 16, 16);
        let start = graph.get_zone_id_at_tile(0, 0).unwrap();
        let dest = graph.get_zone_id_at_tile(31, 31).unwrap();
        let path = graph.find_zone_path(start, dest).expect("path should exist");
        assert_eq!(*path.first().unwrap(), start);
        assert_eq!(*path.last().unwrap(), dest);
    }

    #[test]
    fn multiple_disjoint_portals_are_all_tracked() {
        let mut terrain = Terrain::new(32, 16);
        // Wall along the sector boundary x=15/16, with two gaps.
        for y in 0..16 {
            if y != 2 && y != 10 {
                terrain.set_terrain_passable(15, y, false);
            }
        }
        let graph = ZoneGraph::build(&terrain, 16, 16);
        let za = graph.get_zone_id_at_tile(14, 2).unwrap();
        let zb = graph.get_zone_id_at_tile(16, 2).unwrap();
        let portals = graph.find_all_portals_between(za, zb);
        assert_eq!(portals.len(), 2, "expected two disjoint gap portals");
    }
}
