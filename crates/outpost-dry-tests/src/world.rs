// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Builder for small, fast [`World`]s, so a test can state only the
//! capacities and map size it actually exercises instead of repeating
//! `WorldConfig`'s full field list.

use outpost_core::config::WorldConfig;
use outpost_core::world::World;

/// Builds a [`World`] from [`WorldConfig::default`] plus targeted overrides.
pub struct WorldBuilder {
    config: WorldConfig,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBuilder {
    /// Starts from `WorldConfig::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WorldConfig::default(),
        }
    }

    /// Shrinks every table capacity to `capacity`, the common case for a
    /// test that only needs a handful of entities.
    #[must_use]
    pub fn with_small_capacities(mut self, capacity: usize) -> Self {
        self.config.combat_unit_capacity = capacity;
        self.config.zombie_capacity = capacity;
        self.config.building_capacity = capacity;
        self.config.projectile_capacity = capacity;
        self.config.resource_node_capacity = capacity;
        self.config.move_command_capacity = capacity;
        self
    }

    /// Sets the map's tile dimensions.
    #[must_use]
    pub const fn with_map_size(mut self, width_tiles: i32, height_tiles: i32) -> Self {
        self.config.map_width_tiles = width_tiles;
        self.config.map_height_tiles = height_tiles;
        self
    }

    /// Sets the tick rate systems compute their `delta_seconds` against.
    #[must_use]
    pub const fn with_tick_rate_hz(mut self, tick_rate_hz: u32) -> Self {
        self.config.tick_rate_hz = tick_rate_hz;
        self
    }

    /// Sets the rollback tunables (ring capacity, max frames ahead of
    /// confirmed input, input redundancy).
    #[must_use]
    pub const fn with_rollback_tuning(
        mut self,
        snapshot_ring_capacity: usize,
        max_frames_ahead_of_confirmed: i32,
        input_redundancy_frames: u8,
    ) -> Self {
        self.config.rollback_snapshot_ring_capacity = snapshot_ring_capacity;
        self.config.rollback_max_frames_ahead_of_confirmed = max_frames_ahead_of_confirmed;
        self.config.rollback_input_redundancy_frames = input_redundancy_frames;
        self
    }

    /// Applies an arbitrary override to the underlying config before build,
    /// for the rare field the other builder methods don't cover.
    #[must_use]
    pub fn with_config(mut self, edit: impl FnOnce(&mut WorldConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// The config as built so far, useful for constructing a
    /// [`crate::session::run_scripted_session`] call with the same tuning.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Builds the `World`.
    #[must_use]
    pub fn build(self) -> World {
        World::new(self.config)
    }
}
