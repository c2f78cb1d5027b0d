// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The public pathfinding service: owns the zone graph and the three
//! bounded flow-field caches, and answers `get_flow_direction` queries.

use crate::error::SimError;
use crate::math::Fixed64Vec2;

use super::flow_field::{build_flow_field, FlowField, Seed};
use super::lru::Lru;
use super::sector::ZoneId;
use super::terrain::Terrain;
use super::zone_graph::ZoneGraph;

/// Cache key for single-destination flow fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SingleDestKey {
    zone: ZoneId,
    dest_tile: (i32, i32),
    ignore_buildings: bool,
}

/// Cache key for target-set flow fields (any of N targets).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TargetSetKey {
    zone: ZoneId,
    targets_hash: u64,
}

/// Hit/miss/eviction counters for one flow-field cache, for telemetry only —
/// never read by simulation logic and not part of a rollback snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Snapshot of all three flow-field caches' [`CacheStats`], for the
/// `telemetry` feature to report.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathfindingTelemetry {
    pub multi_target: CacheStats,
    pub single_dest: CacheStats,
    pub target_set: CacheStats,
}

/// Tunable parameters the pathfinding service needs at construction.
#[derive(Clone, Copy, Debug)]
pub struct PathfindingConfig {
    pub sector_size_tiles: i32,
    pub recent_zone_paths_capacity: usize,
    pub multi_target_capacity: usize,
    pub single_dest_capacity: usize,
    pub target_set_capacity: usize,
    pub wall_cost_factor: crate::math::Fixed64,
    pub min_magnitude: crate::math::Fixed64,
    pub max_target_set_recursion: u32,
}

/// Owns the zone graph and flow-field caches; the single write-lock
/// boundary for pathfinding described in the concurrency model collapses,
/// in this single-threaded simulation, to plain `&mut self` access.
pub struct PathfindingService {
    zone_graph: ZoneGraph,
    multi_target_cache: Lru<ZoneId, FlowField>,
    multi_target_seed_hash: u64,
    single_dest_cache: Lru<SingleDestKey, FlowField>,
    target_set_cache: Lru<TargetSetKey, FlowField>,
    config: PathfindingConfig,
    multi_target_stats: CacheStats,
    single_dest_stats: CacheStats,
    target_set_stats: CacheStats,
}

impl PathfindingService {
    /// Builds the service over an initial terrain snapshot.
    #[must_use]
    pub fn new(terrain: &Terrain, config: PathfindingConfig) -> Self {
        Self {
            zone_graph: ZoneGraph::build(terrain, config.sector_size_tiles, config.recent_zone_paths_capacity),
            multi_target_cache: Lru::new(config.multi_target_capacity),
            multi_target_seed_hash: 0,
            single_dest_cache: Lru::new(config.single_dest_capacity),
            target_set_cache: Lru::new(config.target_set_capacity),
            config,
            multi_target_stats: CacheStats::default(),
            single_dest_stats: CacheStats::default(),
            target_set_stats: CacheStats::default(),
        }
    }

    /// Current hit/miss/eviction counts for every flow-field cache, for the
    /// `telemetry` module to report. Never consulted by simulation logic.
    #[must_use]
    pub const fn telemetry_snapshot(&self) -> PathfindingTelemetry {
        PathfindingTelemetry {
            multi_target: self.multi_target_stats,
            single_dest: self.single_dest_stats,
            target_set: self.target_set_stats,
        }
    }

    /// Mutable access to the underlying zone graph, for invalidation by
    /// entity-lifecycle systems (building placement/death).
    pub fn zone_graph_mut(&mut self) -> &mut ZoneGraph {
        &mut self.zone_graph
    }

    /// Read access to the underlying zone graph.
    #[must_use]
    pub fn zone_graph(&self) -> &ZoneGraph {
        &self.zone_graph
    }

    /// Flushes batched sector invalidations and, if anything rebuilt,
    /// clears every flow-field cache globally (a distant building can
    /// invalidate a path across the whole zone graph; local clears would
    /// leave stale flows).
    pub fn flush_pending_invalidations(&mut self, terrain: &Terrain) {
        if self.zone_graph.flush_pending_invalidations(terrain) {
            self.invalidate_all_flows();
        }
    }

    /// Clears every flow-field cache and the multi-target seed hash. Called
    /// on zone invalidation and on rollback restore (derived caches are not
    /// part of the snapshot).
    pub fn invalidate_all_flows(&mut self) {
        self.multi_target_cache.clear();
        self.single_dest_cache.clear();
        self.target_set_cache.clear();
        self.multi_target_seed_hash = 0;
    }

    /// Replaces the multi-target attraction seed set. If the content hash
    /// differs from the currently-cached one, every multi-target flow is
    /// dropped.
    pub fn set_multi_target_seeds_hash(&mut self, new_hash: u64) {
        if new_hash != self.multi_target_seed_hash {
            self.multi_target_cache.clear();
            self.multi_target_seed_hash = new_hash;
        }
    }

    fn get_or_build_single_dest(
        &mut self,
        terrain: &Terrain,
        zone: ZoneId,
        dest_tile: (i32, i32),
        ignore_buildings: bool,
        downstream_seeds: &[Seed],
    ) -> Option<()> {
        let key = SingleDestKey { zone, dest_tile, ignore_buildings };
        if self.single_dest_cache.peek(&key).is_some() {
            self.single_dest_stats.hits += 1;
            return Some(());
        }
        self.single_dest_stats.misses += 1;
        let sector = self.zone_graph.sector(zone.sector_x as i32, zone.sector_y as i32)?;

        let local_size = sector.size();
        let local_dest = (
            dest_tile.0 - zone.sector_x as i32 * local_size,
            dest_tile.1 - zone.sector_y as i32 * local_size,
        );
        let mut seeds: Vec<Seed> = downstream_seeds
            .iter()
            .map(|s| Seed { local_x: s.local_x, local_y: s.local_y, seed_distance: s.seed_distance })
            .collect();
        if local_dest.0 >= 0 && local_dest.1 >= 0 && local_dest.0 < local_size && local_dest.1 < local_size {
            seeds.push(Seed {
                local_x: local_dest.0,
                local_y: local_dest.1,
                seed_distance: crate::math::Fixed64::ZERO,
            });
        }

        let field = build_flow_field(
            sector,
            terrain,
            zone,
            ignore_buildings,
            self.config.wall_cost_factor,
            self.config.min_magnitude,
            &seeds,
        );
        if self.single_dest_cache.insert(key, field).is_some() {
            self.single_dest_stats.evictions += 1;
        }
        Some(())
    }

    /// Finds the zone path, then builds single-destination flow fields for
    /// every zone on it in reverse order (destination zone first), seeding
    /// each upstream build from the already-built downstream field's
    /// portal-tile distances.
    ///
    /// # Errors
    /// Returns [`SimError::PathfindingUnreachable`] if no zone path exists.
    pub fn ensure_flows_along_path(
        &mut self,
        terrain: &Terrain,
        start_tile: (i32, i32),
        dest_tile: (i32, i32),
        ignore_buildings: bool,
    ) -> Result<Vec<ZoneId>, SimError> {
        let start_zone = self
            .zone_graph
            .get_zone_id_at_tile(start_tile.0, start_tile.1)
            .ok_or(SimError::PathfindingUnreachable)?;
        let dest_zone = self
            .zone_graph
            .get_zone_id_at_tile(dest_tile.0, dest_tile.1)
            .ok_or(SimError::PathfindingUnreachable)?;

        let path = self
            .zone_graph
            .find_zone_path(start_zone, dest_zone)
            .ok_or(SimError::PathfindingUnreachable)?;

        // Build destination-zone first, then upstream zones, each seeding
        // from the already-built downstream field's distances at every
        // portal tile between the two zones (plural portals all honored).
        self.get_or_build_single_dest(terrain, dest_zone, dest_tile, ignore_buildings, &[]);

        for window in path.windows(2).rev() {
            let (upstream, downstream) = (window[0], window[1]);
            let portals: Vec<(ZoneId, (i32, i32), (i32, i32))> = self
                .zone_graph
                .find_all_portals_between(upstream, downstream)
                .into_iter()
                .map(|p| {
                    if p.zone_a == upstream {
                        (downstream, p.tiles_a[0], p.tiles_b[0])
                    } else {
                        (downstream, p.tiles_b[0], p.tiles_a[0])
                    }
                })
                .collect();

            let mut seeds = Vec::new();
            for (_, upstream_tile, downstream_tile) in &portals {
                let downstream_key = SingleDestKey { zone: downstream, dest_tile, ignore_buildings };
                let downstream_distance = self
                    .single_dest_cache
                    .peek(&downstream_key)
                    .and_then(|f| f.sample_world_tile(downstream_tile.0, downstream_tile.1))
                    .map_or(crate::math::Fixed64::ZERO, |c| c.distance);

                let upstream_size = self
                    .zone_graph
                    .sector(upstream.sector_x as i32, upstream.sector_y as i32)
                    .map(super::sector::Sector::size)
                    .unwrap_or(1);
                let local_upstream = (
                    upstream_tile.0 - upstream.sector_x as i32 * upstream_size,
                    upstream_tile.1 - upstream.sector_y as i32 * upstream_size,
                );
                seeds.push(Seed {
                    local_x: local_upstream.0,
                    local_y: local_upstream.1,
                    seed_distance: downstream_distance + crate::math::Fixed64::ONE,
                });
            }

            self.get_or_build_single_dest(terrain, upstream, dest_tile, ignore_buildings, &seeds);
        }

        Ok(path)
    }

    /// Queries the flow direction at a world-space position, for a
    /// single-destination flow. Builds the field on demand if not cached.
    /// Returns `ZERO` if no zone, no path, or no flow cell direction exists
    /// (callers fall back to direct steering).
    pub fn get_flow_direction(
        &mut self,
        terrain: &Terrain,
        position: Fixed64Vec2,
        tile_size_px: i32,
        dest_tile: (i32, i32),
        ignore_buildings: bool,
    ) -> Fixed64Vec2 {
        let tile = (
            (position.x / crate::math::Fixed64::from_int(tile_size_px)).to_int(),
            (position.y / crate::math::Fixed64::from_int(tile_size_px)).to_int(),
        );

        let Some(zone) = self.zone_graph.get_zone_id_at_tile(tile.0, tile.1) else {
            return Fixed64Vec2::ZERO;
        };
        let key = SingleDestKey { zone, dest_tile, ignore_buildings };

        // Already-warm fast path: this zone's field toward `dest_tile` was
        // built by an earlier call (this one or another position in the same
        // zone), so there is no zone path to re-derive and nothing to
        // allocate — every steady-state tick for a unit standing still in an
        // already-flowing zone takes this branch.
        if let Some(field) = self.single_dest_cache.peek(&key) {
            let direction = field.sample_world_tile(tile.0, tile.1).map_or(Fixed64Vec2::ZERO, |c| c.direction);
            self.single_dest_stats.hits += 1;
            return direction;
        }

        if self
            .ensure_flows_along_path(terrain, tile, dest_tile, ignore_buildings)
            .is_err()
        {
            return Fixed64Vec2::ZERO;
        }

        self.single_dest_cache
            .peek(&key)
            .and_then(|f| f.sample_world_tile(tile.0, tile.1))
            .map_or(Fixed64Vec2::ZERO, |c| c.direction)
    }

    /// Normalized straight-line direction toward `target`, the universal
    /// fallback when no flow field covers a position.
    #[must_use]
    pub fn direct_direction(from: Fixed64Vec2, target: Fixed64Vec2) -> Fixed64Vec2 {
        (target - from).normalized()
    }

    /// Queries the flow direction toward the nearest of a shared set of
    /// attraction seeds (e.g. every tile above the chase threshold on the
    /// threat grid). Call [`Self::set_multi_target_seeds_hash`] first with a
    /// hash of `seed_tiles` so a changed seed set invalidates stale fields.
    ///
    /// Unlike single-destination flows, the field is built directly from all
    /// seeds falling within the queried zone — there is no cross-zone A*
    /// routing, since the attraction set is usually dense and local (a zombie
    /// chases the nearest hot cell in its own zone, not across the map).
    pub fn get_multi_target_flow_direction(
        &mut self,
        terrain: &Terrain,
        position: Fixed64Vec2,
        tile_size_px: i32,
        seed_tiles: &[(i32, i32)],
    ) -> Fixed64Vec2 {
        let tile = (
            (position.x / crate::math::Fixed64::from_int(tile_size_px)).to_int(),
            (position.y / crate::math::Fixed64::from_int(tile_size_px)).to_int(),
        );
        let Some(zone) = self.zone_graph.get_zone_id_at_tile(tile.0, tile.1) else {
            return Fixed64Vec2::ZERO;
        };

        if self.multi_target_cache.peek(&zone).is_some() {
            self.multi_target_stats.hits += 1;
        } else {
            self.multi_target_stats.misses += 1;
            let Some(sector) = self.zone_graph.sector(zone.sector_x as i32, zone.sector_y as i32) else {
                return Fixed64Vec2::ZERO;
            };
            let local_size = sector.size();
            let seeds: Vec<Seed> = seed_tiles
                .iter()
                .filter_map(|&(wx, wy)| {
                    if sector.zone_at_world_tile(wx, wy) != Some(zone) {
                        return None;
                    }
                    Some(Seed {
                        local_x: wx - zone.sector_x as i32 * local_size,
                        local_y: wy - zone.sector_y as i32 * local_size,
                        seed_distance: crate::math::Fixed64::ZERO,
                    })
                })
                .collect();
            if seeds.is_empty() {
                return Fixed64Vec2::ZERO;
            }
            let field = build_flow_field(
                sector,
                terrain,
                zone,
                true,
                self.config.wall_cost_factor,
                self.config.min_magnitude,
                &seeds,
            );
            if self.multi_target_cache.insert(zone, field).is_some() {
                self.multi_target_stats.evictions += 1;
            }
        }

        self.multi_target_cache
            .peek(&zone)
            .and_then(|f| f.sample_world_tile(tile.0, tile.1))
            .map_or(Fixed64Vec2::ZERO, |c| c.direction)
    }

    /// Queries the flow direction toward whichever reachable tile in
    /// `targets` has the shortest zone-path distance, recursing through
    /// `targets` as a fallback chain (e.g. "rally point A, or B if A is
    /// unreachable") up to `max_target_set_recursion` and guarding against
    /// cycles with a visited-zone set. Used by formation/waypoint-group
    /// orders where any one of several tiles satisfies the order.
    pub fn get_target_set_flow_direction(
        &mut self,
        terrain: &Terrain,
        position: Fixed64Vec2,
        tile_size_px: i32,
        targets: &[(i32, i32)],
        targets_hash: u64,
    ) -> Fixed64Vec2 {
        let tile = (
            (position.x / crate::math::Fixed64::from_int(tile_size_px)).to_int(),
            (position.y / crate::math::Fixed64::from_int(tile_size_px)).to_int(),
        );
        let Some(zone) = self.zone_graph.get_zone_id_at_tile(tile.0, tile.1) else {
            return Fixed64Vec2::ZERO;
        };
        let key = TargetSetKey { zone, targets_hash };

        if self.target_set_cache.peek(&key).is_some() {
            self.target_set_stats.hits += 1;
        } else {
            self.target_set_stats.misses += 1;
            let Some(nearest) = self.nearest_reachable_target(zone, targets) else {
                return Fixed64Vec2::ZERO;
            };
            if self
                .ensure_flows_along_path(terrain, tile, nearest, false)
                .is_err()
            {
                return Fixed64Vec2::ZERO;
            }
            let inner_key = SingleDestKey { zone, dest_tile: nearest, ignore_buildings: false };
            let Some(field) = self.single_dest_cache.peek(&inner_key).cloned() else {
                return Fixed64Vec2::ZERO;
            };
            if self.target_set_cache.insert(key, field).is_some() {
                self.target_set_stats.evictions += 1;
            }
        }

        self.target_set_cache
            .peek(&key)
            .and_then(|f| f.sample_world_tile(tile.0, tile.1))
            .map_or(Fixed64Vec2::ZERO, |c| c.direction)
    }

    /// Picks the target with the fewest zones on its path from `from_zone`,
    /// recursing up to `max_target_set_recursion` deep and refusing to
    /// revisit a zone already tried (breaks cycles between equally-ranked
    /// targets that route through one another).
    fn nearest_reachable_target(
        &mut self,
        from_zone: ZoneId,
        targets: &[(i32, i32)],
    ) -> Option<(i32, i32)> {
        let mut visited = std::collections::HashSet::new();
        visited.insert(from_zone);
        let mut best: Option<((i32, i32), usize)> = None;

        for &target in targets.iter().take(self.config.max_target_set_recursion as usize) {
            let Some(target_zone) = self.zone_graph.get_zone_id_at_tile(target.0, target.1) else {
                continue;
            };
            if !visited.insert(target_zone) {
                continue;
            }
            let Some(path) = self.zone_graph.find_zone_path(from_zone, target_zone) else {
                continue;
            };
            if best.is_none_or(|(_, len)| path.len() < len) {
                best = Some((target, path.len()));
            }
        }

        best.map(|(target, _)| target)
    }
}
