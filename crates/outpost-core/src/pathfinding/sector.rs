// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sectors and the zones (connected components of passable tiles) within them.

use super::terrain::Terrain;

/// A globally-unique zone identifier: which sector, and which local
/// connected-component label within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId {
    pub sector_x: i16,
    pub sector_y: i16,
    pub local_zone: u16,
}

/// One square sector's tile-to-zone labeling, computed by 4-connected flood
/// fill of passable tiles (ignoring buildings — building occupancy only
/// affects flow-field cost, not zone connectivity, so that a temporary
/// building placement doesn't require relabeling every zone it touches).
#[derive(Clone, Debug)]
pub struct Sector {
    pub sector_x: i32,
    pub sector_y: i32,
    size: i32,
    /// Local tile index (`ly * size + lx`) -> zone id, or `None` if impassable.
    zone_of_local_tile: Vec<Option<u16>>,
    zone_count: u16,
    /// Representative (first-visited) tile for each zone, in world coords.
    /// Used only as an A* heuristic anchor — not a claim of true centrality.
    representative_tile: Vec<(i32, i32)>,
}

impl Sector {
    /// Builds and labels a sector at `(sector_x, sector_y)` of `size x size`
    /// tiles, reading passability from `terrain`.
    #[must_use]
    pub fn build(sector_x: i32, sector_y: i32, size: i32, terrain: &Terrain) -> Self {
        let mut zone_of_local_tile = vec![None; (size * size) as usize];
        let mut representative_tile = Vec::new();
        let mut next_zone: u16 = 0;

        let base_x = sector_x * size;
        let base_y = sector_y * size;

        let mut stack = Vec::new();
        for ly in 0..size {
            for lx in 0..size {
                let local_index = (ly * size + lx) as usize;
                if zone_of_local_tile[local_index].is_some() {
                    continue;
                }
                let world = (base_x + lx, base_y + ly);
                if !terrain.is_passable(world.0, world.1, true) {
                    continue;
                }

                let zone_id = next_zone;
                next_zone += 1;
                representative_tile.push(world);

                stack.push((lx, ly));
                zone_of_local_tile[local_index] = Some(zone_id);
                while let Some((cx, cy)) = stack.pop() {
                    for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                        let (nx, ny) = (cx + dx, cy + dy);
                        if nx < 0 || ny < 0 || nx >= size || ny >= size {
                            continue;
                        }
                        let n_index = (ny * size + nx) as usize;
                        if zone_of_local_tile[n_index].is_some() {
                            continue;
                        }
                        let world_n = (base_x + nx, base_y + ny);
                        if !terrain.is_passable(world_n.0, world_n.1, true) {
                            continue;
                        }
                        zone_of_local_tile[n_index] = Some(zone_id);
                        stack.push((nx, ny));
                    }
                }
            }
        }

        Self {
            sector_x,
            sector_y,
            size,
            zone_of_local_tile,
            zone_count: next_zone,
            representative_tile,
        }
    }

    /// This sector's side length in tiles.
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// Number of zones labeled in this sector.
    #[must_use]
    pub const fn zone_count(&self) -> u16 {
        self.zone_count
    }

    /// Looks up the zone id at a world tile coordinate, if passable and
    /// within this sector.
    #[must_use]
    pub fn zone_at_world_tile(&self, x: i32, y: i32) -> Option<ZoneId> {
        let lx = x - self.sector_x * self.size;
        let ly = y - self.sector_y * self.size;
        if lx < 0 || ly < 0 || lx >= self.size || ly >= self.size {
            return None;
        }
        let local = self.zone_of_local_tile[(ly * self.size + lx) as usize]?;
        Some(ZoneId {
            sector_x: self.sector_x as i16,
            sector_y: self.sector_y as i16,
            local_zone: local,
        })
    }

    /// The representative world tile recorded for `local_zone`, used as an
    /// A* heuristic anchor.
    #[must_use]
    pub fn representative_tile(&self, local_zone: u16) -> (i32, i32) {
        self.representative_tile[local_zone as usize]
    }
}
