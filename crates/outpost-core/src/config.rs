// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-at-construction world configuration.
//!
//! Plain data, no dynamic reload in production builds: constructed once and
//! handed to `World::new`. This crate has no knowledge of files or
//! serialization formats — loading a `WorldConfig` from disk is
//! `outpost-cli`'s job.

use crate::math::Fixed64;

/// All tunable constants fixed at world construction.
///
/// Changing any of these requires a restart in single-player and a
/// coordinator broadcast in networked play.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    pub map_width_tiles: i32,
    pub map_height_tiles: i32,
    pub tile_size_px: i32,
    pub tick_rate_hz: u32,

    pub combat_unit_capacity: usize,
    pub zombie_capacity: usize,
    pub building_capacity: usize,
    pub projectile_capacity: usize,
    pub resource_node_capacity: usize,
    pub move_command_capacity: usize,

    pub unit_death_delay_frames: i32,
    pub building_death_delay_frames: i32,

    pub noise_grid_size: i32,
    pub noise_cell_size_px: i32,
    pub noise_decay_rate_per_second: Fixed64,

    pub threat_grid_size: i32,
    pub threat_cell_size_px: i32,
    pub threat_decay_rate_per_second: Fixed64,
    pub threat_peak_decay_rate_per_second: Fixed64,
    pub threat_chase_threshold: Fixed64,
    pub threat_lose_interest_threshold: Fixed64,
    pub noise_spillover_multiplier: Fixed64,

    pub separation_grid_size: i32,
    pub separation_min_density_threshold: Fixed64,
    pub separation_scale: Fixed64,
    pub separation_smoothing_alpha: Fixed64,

    pub sector_size_tiles: i32,
    pub flow_multi_target_lru_capacity: usize,
    pub flow_single_dest_lru_capacity: usize,
    pub flow_target_set_lru_capacity: usize,
    pub flow_min_magnitude: Fixed64,
    pub flow_wall_cost_factor: Fixed64,
    pub flow_target_set_max_recursion: u32,

    pub rvo_neighbor_radius: Fixed64,
    pub rvo_max_neighbors: usize,
    pub rvo_time_horizon: Fixed64,
    pub rvo_avoidance_weight: Fixed64,
    pub rvo_max_avoidance_force: Fixed64,
    pub rvo_smoothing_alpha: Fixed64,
    pub rvo_default_agent_radius: Fixed64,

    pub rollback_snapshot_ring_capacity: usize,
    pub rollback_max_frames_ahead_of_confirmed: i32,
    pub rollback_input_redundancy_frames: u8,

    pub zombie_target_acquisition_range: Fixed64,
    pub zombie_attack_cooldown_seconds: Fixed64,
    pub zombie_idle_timer_min_frames: i32,
    pub zombie_idle_timer_max_frames: i32,
    pub zombie_wander_timer_min_frames: i32,
    pub zombie_wander_timer_max_frames: i32,

    pub combat_unit_attack_cooldown_seconds: Fixed64,
    pub building_turret_cooldown_seconds: Fixed64,
    pub projectile_hit_radius: Fixed64,
    pub projectile_speed: Fixed64,
    pub projectile_max_range: Fixed64,
    pub projectile_splash_radius: Fixed64,
    pub projectile_homing_strength: Fixed64,

    pub wave_interval_frames: i32,
    pub wave_base_zombie_count: u32,
    pub wave_zombie_count_growth: u32,
    pub wave_max_spawns_per_tick: u32,
    pub zombie_spawn_health: Fixed64,
    pub zombie_spawn_damage: Fixed64,
    pub zombie_spawn_attack_range: Fixed64,
    pub zombie_spawn_move_speed: Fixed64,
    pub zombie_spawn_threat_search_radius: Fixed64,
    pub zombie_spawn_noise_search_radius: Fixed64,

    pub unit_production_seconds: Fixed64,
    pub unit_production_cost_gold: Fixed64,
    pub unit_spawn_health: Fixed64,
    pub unit_spawn_damage: Fixed64,
    pub unit_spawn_attack_range: Fixed64,
    pub unit_spawn_move_speed: Fixed64,
    pub unit_spawn_armor: Fixed64,

    pub resource_node_respawn_chance_denominator: u32,
    pub resource_node_spawn_amount: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_width_tiles: 256,
            map_height_tiles: 256,
            tile_size_px: 32,
            tick_rate_hz: 30,

            combat_unit_capacity: 2_000,
            zombie_capacity: 50_000,
            building_capacity: 2_000,
            projectile_capacity: 4_000,
            resource_node_capacity: 512,
            move_command_capacity: 256,

            unit_death_delay_frames: 10,
            building_death_delay_frames: 30,

            noise_grid_size: 32,
            noise_cell_size_px: 256,
            noise_decay_rate_per_second: Fixed64::from_float(10.0),

            threat_grid_size: 64,
            threat_cell_size_px: 128,
            threat_decay_rate_per_second: Fixed64::from_float(8.0),
            threat_peak_decay_rate_per_second: Fixed64::from_float(2.0),
            threat_chase_threshold: Fixed64::from_float(40.0),
            threat_lose_interest_threshold: Fixed64::from_float(15.0),
            noise_spillover_multiplier: Fixed64::from_float(0.5),

            separation_grid_size: 256,
            separation_min_density_threshold: Fixed64::from_float(1.0),
            separation_scale: Fixed64::from_float(8.0),
            separation_smoothing_alpha: Fixed64::from_float(0.2),

            sector_size_tiles: 16,
            flow_multi_target_lru_capacity: 256,
            flow_single_dest_lru_capacity: 256,
            flow_target_set_lru_capacity: 128,
            flow_min_magnitude: Fixed64::from_float(0.0001),
            flow_wall_cost_factor: Fixed64::from_float(2.0),
            flow_target_set_max_recursion: 10,

            rvo_neighbor_radius: Fixed64::from_float(96.0),
            rvo_max_neighbors: 8,
            rvo_time_horizon: Fixed64::from_float(2.0),
            rvo_avoidance_weight: Fixed64::from_float(1.0),
            rvo_max_avoidance_force: Fixed64::from_float(120.0),
            rvo_smoothing_alpha: Fixed64::from_float(0.3),
            rvo_default_agent_radius: Fixed64::from_float(12.0),

            rollback_snapshot_ring_capacity: 8,
            rollback_max_frames_ahead_of_confirmed: 4,
            rollback_input_redundancy_frames: 3,

            zombie_target_acquisition_range: Fixed64::from_float(320.0),
            zombie_attack_cooldown_seconds: Fixed64::from_float(1.0),
            zombie_idle_timer_min_frames: 30,
            zombie_idle_timer_max_frames: 150,
            zombie_wander_timer_min_frames: 60,
            zombie_wander_timer_max_frames: 300,

            combat_unit_attack_cooldown_seconds: Fixed64::from_float(1.0),
            building_turret_cooldown_seconds: Fixed64::from_float(1.5),
            projectile_hit_radius: Fixed64::from_float(16.0),
            projectile_speed: Fixed64::from_float(480.0),
            projectile_max_range: Fixed64::from_float(640.0),
            projectile_splash_radius: Fixed64::ZERO,
            projectile_homing_strength: Fixed64::from_float(0.15),

            wave_interval_frames: 30 * 45,
            wave_base_zombie_count: 20,
            wave_zombie_count_growth: 8,
            wave_max_spawns_per_tick: 10,
            zombie_spawn_health: Fixed64::from_float(40.0),
            zombie_spawn_damage: Fixed64::from_float(6.0),
            zombie_spawn_attack_range: Fixed64::from_float(24.0),
            zombie_spawn_move_speed: Fixed64::from_float(48.0),
            zombie_spawn_threat_search_radius: Fixed64::from_float(256.0),
            zombie_spawn_noise_search_radius: Fixed64::from_float(256.0),

            unit_production_seconds: Fixed64::from_float(8.0),
            unit_production_cost_gold: Fixed64::from_float(50.0),
            unit_spawn_health: Fixed64::from_float(100.0),
            unit_spawn_damage: Fixed64::from_float(12.0),
            unit_spawn_attack_range: Fixed64::from_float(160.0),
            unit_spawn_move_speed: Fixed64::from_float(64.0),
            unit_spawn_armor: Fixed64::from_float(2.0),

            resource_node_respawn_chance_denominator: 600,
            resource_node_spawn_amount: 100,
        }
    }
}

impl WorldConfig {
    /// `1 / tick_rate_hz` as an exact [`Fixed64`].
    #[must_use]
    pub fn delta_seconds(&self) -> Fixed64 {
        Fixed64::ONE / Fixed64::from_int(self.tick_rate_hz as i32)
    }
}
