// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The combat loop: target acquisition, projectile spawn/flight/impact, and
//! the melee damage zombies deal once their AI state machine (see [`crate::ai`])
//! reaches `Attack`.
//!
//! Combat units and building turrets always re-evaluate their target every
//! tick rather than sticking with a stale one; projectiles, once fired, fly
//! independently of their source and resolve on approach or range expiry.

use crate::handle::Handle;
use crate::math::{Fixed64, Fixed64Vec2};
use crate::rows::{Building, CombatUnit, ProjectileFlags, TargetKind, Zombie};
use crate::scheduler::SimulationContext;
use crate::world::World;

fn max_fixed(a: Fixed64, b: Fixed64) -> Fixed64 {
    if a > b {
        a
    } else {
        b
    }
}

/// Damage actually applied after armor, always at least `1` (per the
/// "combat damage minimum" invariant: any positive raw damage deals at
/// least one point, regardless of armor).
fn mitigated_damage(raw_damage: Fixed64, armor: Fixed64) -> Fixed64 {
    max_fixed(raw_damage - armor, Fixed64::ONE)
}

fn nearest_alive_zombie(world: &World, from: Fixed64Vec2, range: Fixed64) -> Option<Handle> {
    let range_sq = range * range;
    let mut best: Option<(Handle, Fixed64)> = None;
    for slot in world.zombies.query_radius(from, range) {
        let zombie: &Zombie = world.zombies.row_by_slot(slot);
        if zombie.mortal.is_dead() {
            continue;
        }
        let dist_sq = from.distance_squared(zombie.position);
        if dist_sq > range_sq {
            continue;
        }
        let handle = world.zombies.get_handle(slot);
        if best.is_none_or(|(_, best_dist)| dist_sq < best_dist) {
            best = Some((handle, dist_sq));
        }
    }
    best.map(|(h, _)| h)
}

/// The `combat_unit_target_acquisition` system (pipeline step 12): every
/// alive combat unit re-scans for the nearest zombie within its
/// `attack_range`, replacing any previously acquired target.
pub fn combat_unit_target_acquisition(world: &mut World, _ctx: &SimulationContext) {
    for slot in 0..world.combat_units.count() {
        let unit = world.combat_units.row_by_slot(slot);
        if unit.mortal.is_dead() {
            continue;
        }
        let (position, range) = (unit.position, unit.attack_range);
        let target = nearest_alive_zombie(world, position, range).unwrap_or(Handle::INVALID);
        world.combat_units.row_by_slot_mut(slot).target = target;
    }
}

fn spawn_projectile(
    world: &mut World,
    source: Handle,
    source_position: Fixed64Vec2,
    target: Handle,
    target_position: Fixed64Vec2,
    damage: Fixed64,
) {
    let cfg = world.config;
    let Ok(handle) = world.projectiles.allocate() else {
        return;
    };
    let Some(slot) = world.projectiles.get_slot(handle) else {
        return;
    };
    let direction = (target_position - source_position).normalized();
    let row = world.projectiles.row_by_slot_mut(slot);
    row.position = source_position;
    row.velocity = direction * cfg.projectile_speed;
    row.source = source;
    row.target = target;
    row.damage = damage;
    row.splash_radius = cfg.projectile_splash_radius;
    row.pierce_count = 0;
    row.homing_strength = cfg.projectile_homing_strength;
    row.max_range = cfg.projectile_max_range;
    row.distance_traveled = Fixed64::ZERO;
    row.lifetime_frames =
        (cfg.projectile_max_range / cfg.projectile_speed * Fixed64::from_int(cfg.tick_rate_hz as i32))
            .to_int()
            .max(1);
    row.flags = ProjectileFlags::new(
        true,
        cfg.projectile_homing_strength > Fixed64::ZERO,
        cfg.projectile_splash_radius > Fixed64::ZERO,
    );
}

/// Fires one named entity's turret/weapon at `target` if its cooldown has
/// elapsed, resetting the timer on a successful shot. Shared by combat
/// units and building turrets, which carry independent cooldown timers but
/// the same fire-and-reset shape.
fn try_fire(
    cooldown_timer: &mut Fixed64,
    cooldown_seconds: Fixed64,
    dt: Fixed64,
    range: Fixed64,
    source_position: Fixed64Vec2,
    target_position: Fixed64Vec2,
) -> bool {
    *cooldown_timer = (*cooldown_timer - dt).clamp(Fixed64::ZERO, cooldown_seconds);
    if *cooldown_timer > Fixed64::ZERO {
        return false;
    }
    if source_position.distance_squared(target_position) > range * range {
        return false;
    }
    *cooldown_timer = cooldown_seconds;
    true
}

/// The `combat_unit_combat` system (pipeline step 14): fires a projectile
/// at each unit's acquired target once its attack cooldown elapses, and
/// (folded into the same pipeline slot, since the fixed system list has no
/// separate entry for it) does the same for building turrets against the
/// nearest zombie in `turret_range` — gated on [`crate::rows::PowerFlags::may_operate`]
/// per the power-semantics decision recorded in `DESIGN.md`.
pub fn combat_unit_combat(world: &mut World, ctx: &SimulationContext) {
    let cooldown_seconds = world.config.combat_unit_attack_cooldown_seconds;
    for slot in 0..world.combat_units.count() {
        let unit: &CombatUnit = world.combat_units.row_by_slot(slot);
        if unit.mortal.is_dead() || unit.target.is_invalid() {
            continue;
        }
        let Some(target_slot) = world.zombies.get_slot(unit.target) else {
            continue;
        };
        let target_position = world.zombies.row_by_slot(target_slot).position;
        let (position, range, damage, handle, target_handle) = (
            unit.position,
            unit.attack_range,
            unit.damage,
            world.combat_units.get_handle(slot),
            unit.target,
        );

        let mut timer = unit.attack_cooldown_timer;
        let fired = try_fire(&mut timer, cooldown_seconds, ctx.delta_seconds, range, position, target_position);
        world.combat_units.row_by_slot_mut(slot).attack_cooldown_timer = timer;
        if fired {
            spawn_projectile(world, handle, position, target_handle, target_position, damage);
        }
    }

    let turret_cooldown_seconds = world.config.building_turret_cooldown_seconds;
    for slot in 0..world.buildings.count() {
        let building: &Building = world.buildings.row_by_slot(slot);
        if building.mortal.is_dead() || !building.power.may_operate() {
            continue;
        }
        let center = building.center(world.map_config.tile_size_px);
        let Some(target) = nearest_alive_zombie(world, center, building.turret_range) else {
            continue;
        };
        let Some(target_slot) = world.zombies.get_slot(target) else {
            continue;
        };
        let target_position = world.zombies.row_by_slot(target_slot).position;
        let (range, damage, handle) =
            (building.turret_range, building.turret_damage, world.buildings.get_handle(slot));

        let mut timer = building.turret_cooldown_timer;
        let fired = try_fire(&mut timer, turret_cooldown_seconds, ctx.delta_seconds, range, center, target_position);
        world.buildings.row_by_slot_mut(slot).turret_cooldown_timer = timer;
        if fired {
            spawn_projectile(world, handle, center, target, target_position, damage);
        }
    }
}

/// Applies a hit to a single zombie: mitigates by nothing (zombies carry no
/// armor stat), floors at `1`, and records the shooter as its `aggro_handle`
/// so zombie target re-acquisition (see [`crate::ai::zombie_state_transition`])
/// prefers whoever hit it last.
fn apply_hit(world: &mut World, slot: u32, raw_damage: Fixed64, source: Handle) {
    let zombie = world.zombies.row_by_slot_mut(slot);
    zombie.health -= max_fixed(raw_damage, Fixed64::ONE);
    zombie.aggro_handle = source;
}

/// Resolves a projectile's impact: single-target (damage minus armor, but
/// there is no armor on the victim table here — zombies are the only
/// projectile target — so this floors at `1`) or splash (linear falloff
/// from the impact point within `splash_radius`, each hit also floored at
/// `1`).
fn resolve_impact(world: &mut World, projectile_slot: u32) {
    let projectile = world.projectiles.row_by_slot(projectile_slot).clone();

    if !projectile.flags.has_splash_falloff() || projectile.splash_radius <= Fixed64::ZERO {
        if let Some(slot) = world.zombies.get_slot(projectile.target) {
            apply_hit(world, slot, projectile.damage, projectile.source);
        }
        return;
    }

    for slot in world.zombies.query_radius(projectile.position, projectile.splash_radius) {
        let zombie = world.zombies.row_by_slot(slot);
        if zombie.mortal.is_dead() {
            continue;
        }
        let dist = projectile.position.distance(zombie.position);
        if dist > projectile.splash_radius {
            continue;
        }
        let falloff = (projectile.splash_radius - dist) / projectile.splash_radius;
        let raw = projectile.damage * falloff;
        apply_hit(world, slot, raw, projectile.source);
    }
}

/// The `projectile` system (pipeline step 16): advances each projectile,
/// blending its heading toward a homing target, accumulates range, and
/// resolves an impact or expiry.
pub fn projectile(world: &mut World, ctx: &SimulationContext) {
    let hit_radius = world.config.projectile_hit_radius;
    let mut to_free = Vec::new();

    for slot in 0..world.projectiles.count() {
        let mut row = world.projectiles.row_by_slot(slot).clone();

        if row.flags.is_homing() {
            if let Some(target_slot) = world.zombies.get_slot(row.target) {
                let target_position = world.zombies.row_by_slot(target_slot).position;
                let desired = (target_position - row.position).normalized() * row.velocity.length();
                row.velocity = row.velocity.lerp(desired, row.homing_strength);
            }
        }

        let step = row.velocity * ctx.delta_seconds;
        row.position += step;
        row.distance_traveled += step.length();
        row.lifetime_frames -= 1;

        let expired = row.lifetime_frames <= 0 || row.distance_traveled >= row.max_range;
        let hit = world
            .zombies
            .get_slot(row.target)
            .is_some_and(|target_slot| {
                row.position.distance_squared(world.zombies.row_by_slot(target_slot).position)
                    <= hit_radius * hit_radius
            });

        *world.projectiles.row_by_slot_mut(slot) = row;

        if hit {
            resolve_impact(world, slot);
            to_free.push(slot);
        } else if expired {
            to_free.push(slot);
        }
    }

    to_free.sort_unstable_by(|a, b| b.cmp(a));
    for slot in to_free {
        world.projectiles.free_by_slot(slot);
    }
}

/// The `zombie_combat` system (pipeline step 15): a zombie in `Attack` state
/// deals its melee damage the instant its state timer counts down to `1`
/// (see [`crate::ai::zombie_state_transition`], which owns the countdown).
pub fn zombie_combat(world: &mut World, _ctx: &SimulationContext) {
    for slot in 0..world.zombies.count() {
        let zombie = world.zombies.row_by_slot(slot);
        if zombie.mortal.is_dead()
            || zombie.ai_state != crate::rows::ZombieState::Attack
            || zombie.state_timer != 1
        {
            continue;
        }
        let (target, kind, damage) = (zombie.target, zombie.target_kind, zombie.damage);

        match kind {
            TargetKind::Unit => {
                if let Some(unit_slot) = world.combat_units.get_slot(target) {
                    let unit = world.combat_units.row_by_slot_mut(unit_slot);
                    unit.health -= mitigated_damage(damage, unit.armor);
                }
            }
            TargetKind::Building => {
                if let Some(building_slot) = world.buildings.get_slot(target) {
                    let building = world.buildings.row_by_slot_mut(building_slot);
                    building.health -= mitigated_damage(damage, building.armor);
                }
            }
            TargetKind::None => {}
        }
    }
}
