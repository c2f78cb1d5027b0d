// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The zombie AI state machine: `Idle -> Wander -> Chase -> Attack`, plus a
//! `WaveChase` state that never falls back to idling.
//!
//! Split into two systems, run in separate pipeline phases, matching every
//! other stateful system in this crate: [`zombie_state_transition`] advances
//! the state machine and handles target (re)acquisition; [`zombie_movement`]
//! turns the current state into a velocity, reading (never writing) state.

use crate::handle::Handle;
use crate::math::{Fixed64, Fixed64Vec2};
use crate::rand;
use crate::rows::{Building, CombatUnit, TargetKind, Zombie, ZombieState};
use crate::scheduler::SimulationContext;
use crate::world::World;

const SALT_IDLE_TIMER: u32 = 101;
const SALT_WANDER_TIMER: u32 = 102;
const SALT_WANDER_SEED: u32 = 103;
const SALT_WANDER_HEADING: u32 = 104;

fn direction_from_degrees(degrees: i32) -> Fixed64Vec2 {
    let radians = Fixed64::from_int(degrees) * Fixed64::from_float(std::f64::consts::PI / 180.0);
    let (sin, cos) = radians.sin_cos();
    Fixed64Vec2::new(cos, sin)
}

fn enter_idle(zombie: &mut Zombie, ctx: &SimulationContext, slot: i32, cfg: &crate::config::WorldConfig) {
    zombie.ai_state = ZombieState::Idle;
    zombie.state_timer = rand::range_with_seed(
        ctx.session_seed,
        ctx.current_frame,
        slot,
        SALT_IDLE_TIMER,
        cfg.zombie_idle_timer_min_frames,
        cfg.zombie_idle_timer_max_frames,
    );
}

fn enter_wander(zombie: &mut Zombie, ctx: &SimulationContext, slot: i32, cfg: &crate::config::WorldConfig) {
    zombie.ai_state = ZombieState::Wander;
    zombie.state_timer = rand::range_with_seed(
        ctx.session_seed,
        ctx.current_frame,
        slot,
        SALT_WANDER_TIMER,
        cfg.zombie_wander_timer_min_frames,
        cfg.zombie_wander_timer_max_frames,
    );
    #[allow(clippy::cast_sign_loss)]
    {
        zombie.wander_seed = rand::range_with_seed(
            ctx.session_seed,
            ctx.current_frame,
            slot,
            SALT_WANDER_SEED,
            0,
            i32::MAX,
        ) as u32;
    }
    zombie.wander_heading_deg =
        rand::degrees_0_359(ctx.session_seed, ctx.current_frame, slot, SALT_WANDER_HEADING);
}

fn enter_attack(zombie: &mut Zombie, tick_rate_hz: u32, attack_cooldown_seconds: Fixed64) {
    zombie.ai_state = ZombieState::Attack;
    zombie.state_timer = (attack_cooldown_seconds * Fixed64::from_int(tick_rate_hz as i32)).to_int();
}

fn threat_nearby(world: &World, position: Fixed64Vec2, radius: Fixed64) -> Fixed64 {
    world
        .threat_grid
        .find_highest_threat_nearby(position, radius)
        .map_or(Fixed64::ZERO, |(_, magnitude, _)| magnitude)
}

fn target_is_valid(world: &World, target: Handle, kind: TargetKind) -> bool {
    match kind {
        TargetKind::None => false,
        TargetKind::Unit => world
            .combat_units
            .get_slot(target)
            .is_some_and(|slot| !world.combat_units.row_by_slot(slot).mortal.is_dead()),
        TargetKind::Building => world
            .buildings
            .get_slot(target)
            .is_some_and(|slot| !world.buildings.row_by_slot(slot).mortal.is_dead()),
    }
}

fn target_within_attack_range(world: &World, zombie: &Zombie, target: Handle, kind: TargetKind) -> bool {
    match kind {
        TargetKind::None => false,
        TargetKind::Unit => world.combat_units.get_slot(target).is_some_and(|slot| {
            let unit = world.combat_units.row_by_slot(slot);
            zombie.position.distance_squared(unit.position) <= zombie.attack_range * zombie.attack_range
        }),
        TargetKind::Building => world.buildings.get_slot(target).is_some_and(|slot| {
            let building = world.buildings.row_by_slot(slot);
            let closest = building.closest_point(zombie.position, world.map_config.tile_size_px);
            zombie.position.distance_squared(closest) <= zombie.attack_range * zombie.attack_range
        }),
    }
}

/// Re-acquires the nearest target within `range`, preferring a still-valid
/// aggro source, then any building, then the nearest combat unit. Once a
/// building is found it is always preferred over a unit, regardless of
/// relative distance.
fn reacquire_target(world: &World, zombie: &Zombie, range: Fixed64) -> (Handle, TargetKind) {
    if !zombie.aggro_handle.is_invalid() {
        let kind = if world.combat_units.get_slot(zombie.aggro_handle).is_some() {
            TargetKind::Unit
        } else if world.buildings.get_slot(zombie.aggro_handle).is_some() {
            TargetKind::Building
        } else {
            TargetKind::None
        };
        if kind != TargetKind::None && target_is_valid(world, zombie.aggro_handle, kind) {
            return (zombie.aggro_handle, kind);
        }
    }

    let range_sq = range * range;
    let mut nearest_building: Option<(Handle, Fixed64)> = None;
    for slot in 0..world.buildings.count() {
        let building: &Building = world.buildings.row_by_slot(slot);
        if building.mortal.is_dead() {
            continue;
        }
        let closest = building.closest_point(zombie.position, world.map_config.tile_size_px);
        let dist_sq = zombie.position.distance_squared(closest);
        if dist_sq > range_sq {
            continue;
        }
        let handle = world.buildings.get_handle(slot);
        if nearest_building.is_none_or(|(_, best)| dist_sq < best) {
            nearest_building = Some((handle, dist_sq));
        }
    }
    if let Some((handle, _)) = nearest_building {
        return (handle, TargetKind::Building);
    }

    let mut nearest_unit: Option<(Handle, Fixed64)> = None;
    for slot in world.combat_units.query_radius(zombie.position, range) {
        let unit: &CombatUnit = world.combat_units.row_by_slot(slot);
        if unit.mortal.is_dead() {
            continue;
        }
        let dist_sq = zombie.position.distance_squared(unit.position);
        if dist_sq > range_sq {
            continue;
        }
        let handle = world.combat_units.get_handle(slot);
        if nearest_unit.is_none_or(|(_, best)| dist_sq < best) {
            nearest_unit = Some((handle, dist_sq));
        }
    }
    nearest_unit.map_or((Handle::INVALID, TargetKind::None), |(h, _)| (h, TargetKind::Unit))
}

/// The `zombie_state_transition` system (pipeline step 6): advances every
/// zombie's AI state and re-acquires targets while chasing, independent of
/// movement (which [`zombie_movement`] derives from the resulting state).
pub fn zombie_state_transition(world: &mut World, ctx: &SimulationContext) {
    let cfg = world.config;
    for slot in 0..world.zombies.count() {
        let zombie = world.zombies.row_by_slot(slot).clone();
        if zombie.mortal.is_dead() {
            continue;
        }
        let nearby_threat = threat_nearby(world, zombie.position, zombie.threat_search_radius);
        let mut next = zombie.clone();

        match zombie.ai_state {
            ZombieState::Idle | ZombieState::Wander => {
                if nearby_threat >= cfg.threat_chase_threshold {
                    let (target, kind) =
                        reacquire_target(world, &zombie, cfg.zombie_target_acquisition_range);
                    next.target = target;
                    next.target_kind = kind;
                    next.ai_state = ZombieState::Chase;
                } else if zombie.state_timer <= 0 {
                    if zombie.ai_state == ZombieState::Idle {
                        enter_wander(&mut next, ctx, slot as i32, &cfg);
                    } else {
                        enter_idle(&mut next, ctx, slot as i32, &cfg);
                    }
                } else {
                    next.state_timer -= 1;
                }
            }
            ZombieState::Chase | ZombieState::WaveChase => {
                let lost_interest = zombie.ai_state == ZombieState::Chase
                    && nearby_threat < cfg.threat_lose_interest_threshold;
                let target_valid = target_is_valid(world, zombie.target, zombie.target_kind);

                if lost_interest || !target_valid {
                    if zombie.ai_state == ZombieState::Chase {
                        enter_idle(&mut next, ctx, slot as i32, &cfg);
                        next.target = Handle::INVALID;
                        next.target_kind = TargetKind::None;
                    } else {
                        // WaveChase never idles; keep advancing toward the map
                        // center via zombie_movement's fallback flow.
                        next.target = Handle::INVALID;
                        next.target_kind = TargetKind::None;
                    }
                } else {
                    let (target, kind) =
                        reacquire_target(world, &zombie, cfg.zombie_target_acquisition_range);
                    if kind != TargetKind::None {
                        next.target = target;
                        next.target_kind = kind;
                    }
                    if target_within_attack_range(world, &zombie, next.target, next.target_kind) {
                        enter_attack(&mut next, cfg.tick_rate_hz, cfg.zombie_attack_cooldown_seconds);
                    }
                }
            }
            ZombieState::Attack => {
                next.state_timer -= 1;
                if next.state_timer == 0 {
                    let still_in_range =
                        target_within_attack_range(world, &zombie, zombie.target, zombie.target_kind);
                    if still_in_range {
                        next.ai_state = ZombieState::Chase;
                    } else if zombie.is_wave_zombie {
                        next.ai_state = ZombieState::WaveChase;
                    } else {
                        enter_idle(&mut next, ctx, slot as i32, &cfg);
                        next.target = Handle::INVALID;
                        next.target_kind = TargetKind::None;
                    }
                }
            }
        }

        *world.zombies.row_by_slot_mut(slot) = next;
    }
}

/// The `noise_attraction_update` system (pipeline step 9): points each living
/// zombie's `flow_vector` at the loudest nearby noise-grid cell, or zeroes it
/// when nothing is in range. [`zombie_movement`]'s `Wander` branch steers
/// toward this in preference to its random heading whenever it is non-zero.
pub fn noise_attraction_update(world: &mut World, _ctx: &SimulationContext) {
    for slot in 0..world.zombies.count() {
        let zombie = world.zombies.row_by_slot(slot).clone();
        if zombie.mortal.is_dead() {
            continue;
        }
        let direction = world
            .noise_grid
            .find_highest_noise_nearby(zombie.position, zombie.noise_search_radius)
            .map_or(Fixed64Vec2::ZERO, |(_, _, direction)| direction);
        world.zombies.row_by_slot_mut(slot).flow_vector = direction;
    }
}

/// The `zombie_movement` system (pipeline step 10): turns the current AI
/// state into a velocity. Never mutates AI state.
pub fn zombie_movement(world: &mut World, ctx: &SimulationContext) {
    let tile_size = world.map_config.tile_size_px;
    let map_center = Fixed64Vec2::from_ints(
        world.map_config.width_tiles * tile_size / 2,
        world.map_config.height_tiles * tile_size / 2,
    );
    let threat_threshold = world.config.threat_lose_interest_threshold;
    let hot_cells = collect_hot_threat_cells(world, threat_threshold);
    let hash = hash_tile_list(&hot_cells);
    world.pathfinding.set_multi_target_seeds_hash(hash);

    let half_second_frames = (world.config.tick_rate_hz / 2).max(1) as i32;

    let separation_scale = world.config.separation_scale;

    for slot in 0..world.zombies.count() {
        let zombie = world.zombies.row_by_slot(slot).clone();
        if zombie.mortal.is_dead() {
            continue;
        }

        let velocity = match zombie.ai_state {
            ZombieState::Idle | ZombieState::Attack => Fixed64Vec2::ZERO,
            ZombieState::Wander => {
                let base = if zombie.flow_vector == Fixed64Vec2::ZERO {
                    let bucket = ctx.current_frame / half_second_frames;
                    let heading = rand::degrees_0_359(
                        ctx.session_seed,
                        bucket,
                        slot as i32,
                        SALT_WANDER_HEADING ^ zombie.wander_seed,
                    );
                    direction_from_degrees(heading) * (zombie.move_speed / Fixed64::from_int(3))
                } else {
                    zombie.flow_vector * (zombie.move_speed / Fixed64::from_int(3))
                };
                base + zombie.smoothed_separation * separation_scale
            }
            ZombieState::Chase | ZombieState::WaveChase => {
                let direction = chase_direction(world, &zombie, tile_size, &hot_cells, map_center);
                direction * zombie.move_speed + zombie.smoothed_separation * separation_scale
            }
        };

        world.zombies.row_by_slot_mut(slot).velocity = velocity;
    }
}

fn chase_direction(
    world: &mut World,
    zombie: &Zombie,
    tile_size: i32,
    hot_cells: &[(i32, i32)],
    map_center: Fixed64Vec2,
) -> Fixed64Vec2 {
    if zombie.target_kind != TargetKind::None {
        if let Some(direction) = target_flow_direction(world, zombie, tile_size) {
            if direction != Fixed64Vec2::ZERO {
                return direction;
            }
        }
    }

    if zombie.ai_state == ZombieState::Chase && !hot_cells.is_empty() {
        let terrain = world.terrain.clone();
        let direction = world.pathfinding.get_multi_target_flow_direction(
            &terrain,
            zombie.position,
            tile_size,
            hot_cells,
        );
        if direction != Fixed64Vec2::ZERO {
            return direction;
        }
    }

    crate::pathfinding::PathfindingService::direct_direction(zombie.position, map_center)
}

fn target_flow_direction(world: &mut World, zombie: &Zombie, tile_size: i32) -> Option<Fixed64Vec2> {
    let terrain = world.terrain.clone();
    match zombie.target_kind {
        TargetKind::Unit => {
            let slot = world.combat_units.get_slot(zombie.target)?;
            let dest = world.combat_units.row_by_slot(slot).position;
            let dest_tile = (
                (dest.x / Fixed64::from_int(tile_size)).to_int(),
                (dest.y / Fixed64::from_int(tile_size)).to_int(),
            );
            Some(
                world
                    .pathfinding
                    .get_flow_direction(&terrain, zombie.position, tile_size, dest_tile, true),
            )
        }
        TargetKind::Building => {
            let slot = world.buildings.get_slot(zombie.target)?;
            let building = world.buildings.row_by_slot(slot);
            let closest = building.closest_point(zombie.position, tile_size);
            let center = building.center(tile_size);
            let outward = (closest - center).normalized();
            let perimeter = closest + outward * Fixed64::from_int(tile_size);
            let dest_tile = (
                (perimeter.x / Fixed64::from_int(tile_size)).to_int(),
                (perimeter.y / Fixed64::from_int(tile_size)).to_int(),
            );
            Some(
                world
                    .pathfinding
                    .get_flow_direction(&terrain, zombie.position, tile_size, dest_tile, false),
            )
        }
        TargetKind::None => None,
    }
}

/// Collects every threat-grid cell at or above `threshold`, bounded to a
/// small count so the shared multi-target flow field stays cheap to build.
fn collect_hot_threat_cells(world: &World, threshold: Fixed64) -> Vec<(i32, i32)> {
    const MAX_HOT_CELLS: usize = 64;
    let grid = &world.threat_grid;
    let mut cells = Vec::new();
    'scan: for cy in 0..grid.size() {
        for cx in 0..grid.size() {
            if grid.current(cx, cy) >= threshold {
                cells.push((cx, cy));
                if cells.len() >= MAX_HOT_CELLS {
                    break 'scan;
                }
            }
        }
    }
    cells
}

fn hash_tile_list(tiles: &[(i32, i32)]) -> u64 {
    let mut acc = 0xcbf2_9ce4_8422_2325_u64;
    for &(x, y) in tiles {
        acc ^= u64::from(x as u32);
        acc = acc.wrapping_mul(0x0000_0100_0000_01B3);
        acc ^= u64::from(y as u32);
        acc = acc.wrapping_mul(0x0000_0100_0000_01B3);
    }
    acc
}
