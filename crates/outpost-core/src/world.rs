// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The `World`: a fixed, name-known set of tables plus per-tick run state.

use crate::config::WorldConfig;
use crate::grid::{NoiseGrid, SeparationField, ThreatGrid};
use crate::lifecycle::{MoveCommandQueue, PlacementRequest};
use crate::pathfinding::{PathfindingConfig, PathfindingService, Terrain};
use crate::rows::{
    Building, CombatUnit, MapConfig, MatchStats, MoveCommand, PlayerState, Projectile,
    ResourceNode, WaveState, Zombie, MAX_PLAYERS,
};
use crate::table::{Table, TableSnapshot};

/// The simulation world: the sole owner of every table, grid, and derived
/// cache. Systems borrow from it through `&mut World`.
pub struct World {
    pub config: WorldConfig,
    pub map_config: MapConfig,

    pub combat_units: Table<CombatUnit>,
    pub zombies: Table<Zombie>,
    pub buildings: Table<Building>,
    pub projectiles: Table<Projectile>,
    pub resource_nodes: Table<ResourceNode>,
    pub move_commands: MoveCommandQueue,
    /// Building-placement requests queued by player input this frame,
    /// drained by the `building_placement` system.
    pub pending_placements: Vec<PlacementRequest>,

    pub players: [PlayerState; MAX_PLAYERS],
    pub wave_state: WaveState,
    pub match_stats: MatchStats,

    pub noise_grid: NoiseGrid,
    pub threat_grid: ThreatGrid,
    pub separation_field: SeparationField,

    pub terrain: Terrain,
    pub pathfinding: PathfindingService,
}

impl World {
    /// Constructs a fresh world with empty tables and an all-passable map,
    /// using `config`'s fixed capacities and grid sizes.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        let map_config = MapConfig {
            width_tiles: config.map_width_tiles,
            height_tiles: config.map_height_tiles,
            tile_size_px: config.tile_size_px,
        };

        let mut combat_units = Table::new(crate::ids::COMBAT_UNIT, config.combat_unit_capacity);
        combat_units.enable_spatial_index(crate::math::Fixed64::from_int(config.tile_size_px * 4));
        let mut zombies = Table::new(crate::ids::ZOMBIE, config.zombie_capacity);
        zombies.enable_spatial_index(crate::math::Fixed64::from_int(config.tile_size_px * 4));
        let mut projectiles = Table::new(crate::ids::PROJECTILE, config.projectile_capacity);
        projectiles.enable_spatial_index(crate::math::Fixed64::from_int(config.tile_size_px * 4));
        let mut resource_nodes = Table::new(crate::ids::RESOURCE_NODE, config.resource_node_capacity);
        resource_nodes.enable_spatial_index(crate::math::Fixed64::from_int(config.tile_size_px * 8));
        let buildings = Table::new(crate::ids::BUILDING, config.building_capacity);

        let terrain = Terrain::new(config.map_width_tiles, config.map_height_tiles);
        let pathfinding = PathfindingService::new(
            &terrain,
            PathfindingConfig {
                sector_size_tiles: config.sector_size_tiles,
                recent_zone_paths_capacity: 64,
                multi_target_capacity: config.flow_multi_target_lru_capacity,
                single_dest_capacity: config.flow_single_dest_lru_capacity,
                target_set_capacity: config.flow_target_set_lru_capacity,
                wall_cost_factor: config.flow_wall_cost_factor,
                min_magnitude: config.flow_min_magnitude,
                max_target_set_recursion: config.flow_target_set_max_recursion,
            },
        );

        Self {
            noise_grid: NoiseGrid::new(config.noise_grid_size, config.noise_cell_size_px),
            threat_grid: ThreatGrid::new(config.threat_grid_size, config.threat_cell_size_px),
            separation_field: SeparationField::new(config.separation_grid_size, config.tile_size_px),
            combat_units,
            zombies,
            buildings,
            projectiles,
            resource_nodes,
            move_commands: MoveCommandQueue::new(config.move_command_capacity),
            pending_placements: Vec::new(),
            players: std::array::from_fn(|_| PlayerState::default()),
            wave_state: WaveState::default(),
            match_stats: MatchStats::default(),
            terrain,
            pathfinding,
            map_config,
            config,
        }
    }

    /// Rebuilds every derived, non-snapshotted cache (spatial indices,
    /// flow-field caches, zone graph) after a raw-row restore.
    pub fn rebuild_derived_state(&mut self) {
        self.combat_units.spatial_sort();
        self.zombies.spatial_sort();
        self.projectiles.spatial_sort();
        self.resource_nodes.spatial_sort();
        self.pathfinding.invalidate_all_flows();
    }

    /// Captures every table, grid, and singleton that is part of the
    /// rollback snapshot contract. Derived caches — spatial indices,
    /// flow-field/zone-graph caches, the separation density field (rebuilt
    /// from scratch every tick before it is read) — are deliberately
    /// excluded; [`World::restore_from_snapshot`] reconstructs them via
    /// [`World::rebuild_derived_state`].
    #[must_use]
    pub fn to_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            combat_units: self.combat_units.to_snapshot(),
            zombies: self.zombies.to_snapshot(),
            buildings: self.buildings.to_snapshot(),
            projectiles: self.projectiles.to_snapshot(),
            resource_nodes: self.resource_nodes.to_snapshot(),
            move_commands: self.move_commands.to_snapshot(),
            players: self.players.clone(),
            wave_state: self.wave_state.clone(),
            match_stats: self.match_stats.clone(),
            noise_grid: self.noise_grid.clone(),
            threat_grid: self.threat_grid.clone(),
        }
    }

    /// Restores every table, grid, and singleton captured by
    /// [`World::to_snapshot`], then rebuilds derived caches. `config`,
    /// `map_config`, and `terrain` are fixed at construction and are not
    /// part of the snapshot (spec.md §6's configuration surface is
    /// immutable for the life of a `World`).
    pub fn restore_from_snapshot(&mut self, snapshot: WorldSnapshot) {
        self.combat_units.restore_from_snapshot(snapshot.combat_units);
        self.zombies.restore_from_snapshot(snapshot.zombies);
        self.buildings.restore_from_snapshot(snapshot.buildings);
        self.projectiles.restore_from_snapshot(snapshot.projectiles);
        self.resource_nodes.restore_from_snapshot(snapshot.resource_nodes);
        self.move_commands.restore_from_snapshot(snapshot.move_commands);
        self.players = snapshot.players;
        self.wave_state = snapshot.wave_state;
        self.match_stats = snapshot.match_stats;
        self.noise_grid = snapshot.noise_grid;
        self.threat_grid = snapshot.threat_grid;
        self.rebuild_derived_state();
    }
}

/// Every table, grid, and singleton covered by the rollback snapshot
/// contract (spec.md §3 "Ownership", §6 "Persisted snapshot format").
///
/// `outpost-core` has no knowledge of files or wire formats — this is plain
/// data. Turning it into the bytes spec.md §6 describes (and storing it in a
/// ring buffer) is `outpost-net`'s job.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSnapshot {
    pub combat_units: TableSnapshot<CombatUnit>,
    pub zombies: TableSnapshot<Zombie>,
    pub buildings: TableSnapshot<Building>,
    pub projectiles: TableSnapshot<Projectile>,
    pub resource_nodes: TableSnapshot<ResourceNode>,
    pub move_commands: Vec<MoveCommand>,
    pub players: [PlayerState; MAX_PLAYERS],
    pub wave_state: WaveState,
    pub match_stats: MatchStats,
    pub noise_grid: NoiseGrid,
    pub threat_grid: ThreatGrid,
}
