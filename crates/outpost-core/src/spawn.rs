// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wave scheduling, entity spawning, and building placement.
//!
//! None of these systems draw from a per-`type_id` stat catalog — this crate
//! has no such catalog (see `DESIGN.md`) — so every spawned row gets the
//! flat baseline stats carried on [`crate::config::WorldConfig`].

use crate::lifecycle::PlacementRequest;
use crate::math::Fixed64Vec2;
use crate::rand;
use crate::rows::{MortalFlags, ZombieState};
use crate::scheduler::SimulationContext;
use crate::world::World;

const SALT_SPAWN_EDGE: u32 = 301;
const SALT_SPAWN_ALONG: u32 = 302;
const SALT_RESOURCE_RESPAWN: u32 = 303;

/// The `wave_management` system (pipeline step 20): starts the next wave once
/// the current one is fully spawned and its cooldown has elapsed, then
/// recomputes this tick's spawn budget from what remains.
pub fn wave_management(world: &mut World, ctx: &SimulationContext) {
    let cfg = world.config;
    let wave = &mut world.wave_state;

    if wave.zombies_remaining_in_wave == 0 && ctx.current_frame >= wave.next_wave_frame {
        wave.wave_number += 1;
        wave.zombies_remaining_in_wave =
            cfg.wave_base_zombie_count + cfg.wave_zombie_count_growth * (wave.wave_number - 1);
        wave.next_wave_frame = ctx.current_frame + cfg.wave_interval_frames;
    }

    wave.spawn_budget_this_tick = wave.zombies_remaining_in_wave.min(cfg.wave_max_spawns_per_tick);
}

fn edge_spawn_position(ctx: &SimulationContext, index: i32, map_config: crate::rows::MapConfig) -> Fixed64Vec2 {
    let width_tiles = map_config.width_tiles;
    let height_tiles = map_config.height_tiles;
    let tile_size = map_config.tile_size_px;

    let edge = rand::range_with_seed(ctx.session_seed, ctx.current_frame, index, SALT_SPAWN_EDGE, 0, 4);
    let along_x = rand::range_with_seed(ctx.session_seed, ctx.current_frame, index, SALT_SPAWN_ALONG, 0, width_tiles);
    let along_y =
        rand::range_with_seed(ctx.session_seed, ctx.current_frame, index, SALT_SPAWN_ALONG, 0, height_tiles);

    let (tx, ty) = match edge {
        0 => (along_x, 0),
        1 => (width_tiles - 1, along_y),
        2 => (along_x, height_tiles - 1),
        _ => (0, along_y),
    };
    Fixed64Vec2::from_ints(tx * tile_size + tile_size / 2, ty * tile_size + tile_size / 2)
}

/// The `enemy_spawn` system (pipeline step 20): spawns this tick's wave
/// budget of zombies at deterministic map-edge positions.
///
/// A [`crate::table::Table::allocate`] failure (table at capacity) is
/// counted in [`crate::rows::MatchStats::capacity_exceeded_skips`] and left
/// in the wave's remaining count rather than dropped, so the spawn is
/// retried on a later tick once room frees up.
pub fn enemy_spawn(world: &mut World, ctx: &SimulationContext) {
    let budget = world.wave_state.spawn_budget_this_tick;
    if budget == 0 {
        return;
    }

    let cfg = world.config;
    let map_config = world.map_config;
    let mut spawned = 0_u32;

    for i in 0..budget {
        let Ok(handle) = world.zombies.allocate() else {
            world.match_stats.capacity_exceeded_skips += 1;
            #[cfg(feature = "telemetry")]
            crate::telemetry::capacity_exceeded(
                ctx.current_frame,
                crate::ids::ZOMBIE,
                world.match_stats.capacity_exceeded_skips,
            );
            continue;
        };
        let Some(slot) = world.zombies.get_slot(handle) else {
            continue;
        };

        let position = edge_spawn_position(ctx, i as i32, map_config);
        let row = world.zombies.row_by_slot_mut(slot);
        row.position = position;
        row.health = cfg.zombie_spawn_health;
        row.max_health = cfg.zombie_spawn_health;
        row.damage = cfg.zombie_spawn_damage;
        row.attack_range = cfg.zombie_spawn_attack_range;
        row.move_speed = cfg.zombie_spawn_move_speed;
        row.threat_search_radius = cfg.zombie_spawn_threat_search_radius;
        row.noise_search_radius = cfg.zombie_spawn_noise_search_radius;
        row.mortal = MortalFlags::active();
        row.is_wave_zombie = true;
        row.ai_state = ZombieState::WaveChase;
        spawned += 1;
    }

    world.wave_state.zombies_remaining_in_wave =
        world.wave_state.zombies_remaining_in_wave.saturating_sub(spawned);
    world.wave_state.spawn_budget_this_tick = 0;
}

/// The `unit_spawn` system (pipeline step 20): advances each building's
/// production queue by one slot per tick once its owner can afford it and
/// has population headroom, spawning the produced unit at the building's
/// rally point (or its footprint center, if unset).
pub fn unit_spawn(world: &mut World, _ctx: &SimulationContext) {
    let cfg = world.config;
    let tile_size = world.map_config.tile_size_px;

    for slot in 0..world.buildings.count() {
        let building = world.buildings.row_by_slot(slot).clone();
        if building.mortal.is_dead() || building.production_queue[0] == 0 {
            continue;
        }

        let owner = usize::from(building.owner);
        let Some(player) = world.players.get(owner) else {
            continue;
        };
        if player.gold < cfg.unit_production_cost_gold || player.population >= player.max_population {
            continue;
        }

        let Ok(handle) = world.combat_units.allocate() else {
            world.match_stats.capacity_exceeded_skips += 1;
            #[cfg(feature = "telemetry")]
            crate::telemetry::capacity_exceeded(
                _ctx.current_frame,
                crate::ids::COMBAT_UNIT,
                world.match_stats.capacity_exceeded_skips,
            );
            continue;
        };
        let Some(unit_slot) = world.combat_units.get_slot(handle) else {
            continue;
        };

        let spawn_position = if building.rally_point != Fixed64Vec2::ZERO {
            building.rally_point
        } else {
            building.center(tile_size)
        };
        let type_id = building.production_queue[0];

        let unit = world.combat_units.row_by_slot_mut(unit_slot);
        unit.position = spawn_position;
        unit.type_id = type_id;
        unit.owner_slot = building.owner;
        unit.health = cfg.unit_spawn_health;
        unit.max_health = cfg.unit_spawn_health;
        unit.damage = cfg.unit_spawn_damage;
        unit.attack_range = cfg.unit_spawn_attack_range;
        unit.move_speed = cfg.unit_spawn_move_speed;
        unit.armor = cfg.unit_spawn_armor;
        unit.mortal = MortalFlags::active();

        if let Some(player) = world.players.get_mut(owner) {
            player.gold -= cfg.unit_production_cost_gold;
            player.population += 1;
        }

        let queue = &mut world.buildings.row_by_slot_mut(slot).production_queue;
        let last = queue.len() - 1;
        for i in 0..last {
            queue[i] = queue[i + 1];
        }
        queue[last] = 0;
    }
}

/// The `resource_node_spawn` system (pipeline step 20): restocks depleted
/// resource nodes with deterministic odds of `1 / resource_node_respawn_chance_denominator`
/// per tick.
pub fn resource_node_spawn(world: &mut World, ctx: &SimulationContext) {
    let denominator = i32::try_from(world.config.resource_node_respawn_chance_denominator).unwrap_or(i32::MAX);
    let amount = world.config.resource_node_spawn_amount;

    for slot in 0..world.resource_nodes.count() {
        if world.resource_nodes.row_by_slot(slot).amount > 0 {
            continue;
        }
        let roll =
            rand::range_with_seed(ctx.session_seed, ctx.current_frame, slot as i32, SALT_RESOURCE_RESPAWN, 0, denominator);
        if roll == 0 {
            world.resource_nodes.row_by_slot_mut(slot).amount = amount;
        }
    }
}

/// The `building_placement` system (pipeline step 20): drains this frame's
/// queued placement requests through [`crate::lifecycle::building_placement`].
pub fn building_placement(world: &mut World, _ctx: &SimulationContext) {
    let sector_size_tiles = world.config.sector_size_tiles;
    let requests: Vec<PlacementRequest> = world.pending_placements.drain(..).collect();
    for request in requests {
        let _placed = crate::lifecycle::building_placement(
            &mut world.buildings,
            &mut world.terrain,
            &mut world.pathfinding,
            sector_size_tiles,
            request,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::math::Fixed64;

    fn ctx(frame: i32) -> SimulationContext {
        SimulationContext { current_frame: frame, session_seed: 9, delta_seconds: Fixed64::ONE / Fixed64::from_int(30) }
    }

    #[test]
    fn wave_management_starts_first_wave_immediately() {
        let mut world = World::new(WorldConfig::default());
        wave_management(&mut world, &ctx(0));
        assert_eq!(world.wave_state.wave_number, 1);
        assert!(world.wave_state.zombies_remaining_in_wave > 0);
        assert_eq!(world.wave_state.spawn_budget_this_tick, world.config.wave_max_spawns_per_tick);
    }

    #[test]
    fn enemy_spawn_consumes_budget_and_spawns_zombies() {
        let mut world = World::new(WorldConfig::default());
        world.wave_state.spawn_budget_this_tick = 5;
        world.wave_state.zombies_remaining_in_wave = 5;

        enemy_spawn(&mut world, &ctx(0));
        assert_eq!(world.zombies.count(), 5);
        assert_eq!(world.wave_state.zombies_remaining_in_wave, 0);
        assert_eq!(world.match_stats.capacity_exceeded_skips, 0);
    }

    #[test]
    fn enemy_spawn_counts_capacity_exhaustion_and_retries_next_tick() {
        let mut cfg = WorldConfig::default();
        cfg.zombie_capacity = 3;
        let mut world = World::new(cfg);
        world.wave_state.spawn_budget_this_tick = 5;
        world.wave_state.zombies_remaining_in_wave = 5;

        enemy_spawn(&mut world, &ctx(0));
        assert_eq!(world.zombies.count(), 3);
        assert_eq!(world.match_stats.capacity_exceeded_skips, 2);
        assert_eq!(world.wave_state.zombies_remaining_in_wave, 2, "failed spawns stay queued for retry");
    }

    #[test]
    fn unit_spawn_drains_queue_and_charges_gold() {
        let mut world = World::new(WorldConfig::default());
        world.players[0].gold = Fixed64::from_int(1000);
        world.players[0].max_population = 10;

        let h = world.buildings.allocate().unwrap();
        let slot = world.buildings.get_slot(h).unwrap();
        let building = world.buildings.row_by_slot_mut(slot);
        building.mortal = MortalFlags::active();
        building.owner = 0;
        building.production_queue = [7, 0, 0, 0];

        unit_spawn(&mut world, &ctx(0));
        assert_eq!(world.combat_units.count(), 1);
        assert_eq!(world.buildings.row_by_slot(slot).production_queue, [0, 0, 0, 0]);
        assert!(world.players[0].gold < Fixed64::from_int(1000));
        assert_eq!(world.players[0].population, 1);
    }

    #[test]
    fn resource_node_spawn_leaves_stocked_nodes_untouched() {
        let mut world = World::new(WorldConfig::default());
        let h = world.resource_nodes.allocate().unwrap();
        let slot = world.resource_nodes.get_slot(h).unwrap();
        world.resource_nodes.row_by_slot_mut(slot).amount = 50;

        resource_node_spawn(&mut world, &ctx(0));
        assert_eq!(world.resource_nodes.row_by_slot(slot).amount, 50);
    }
}
