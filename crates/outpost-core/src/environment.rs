// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The grid-maintenance systems: decay and rebuild the noise, threat, and
//! separation fields that [`crate::ai`] and [`crate::rvo`] read from, plus
//! the per-tick zombie velocity reset and flow-field cache invalidation.

use crate::math::{Fixed64, Fixed64Vec2};
use crate::rand;
use crate::scheduler::SimulationContext;
use crate::world::World;

const SALT_SEPARATION_FALLBACK: u32 = 201;

/// The `velocity_reset` system (pipeline step 2): zeroes every living
/// zombie's velocity before this frame's AI/movement systems recompute it,
/// so a zombie that stops issuing a direction this tick actually stops.
pub fn velocity_reset(world: &mut World, _ctx: &SimulationContext) {
    for zombie in world.zombies.iter_mut() {
        zombie.velocity = Fixed64Vec2::ZERO;
    }
}

/// The `flow_field_invalidation` system (pipeline step 3): flushes any
/// sector invalidations queued since the last tick (building placement,
/// building death) into the pathfinding service's caches.
pub fn flow_field_invalidation(world: &mut World, _ctx: &SimulationContext) {
    let terrain = world.terrain.clone();
    world.pathfinding.flush_pending_invalidations(&terrain);
}

/// The `noise_decay` system (pipeline step 4, interval 2 offset 0): decays
/// the noise grid toward zero.
pub fn noise_decay(world: &mut World, ctx: &SimulationContext) {
    let rate = world.config.noise_decay_rate_per_second;
    world.noise_grid.decay(rate, ctx.delta_seconds);
}

/// The `threat_grid_decay` system (pipeline step 4, interval 2 offset 1):
/// decays the threat grid's current and peak fields toward zero.
pub fn threat_grid_decay(world: &mut World, ctx: &SimulationContext) {
    let cfg = world.config;
    world.threat_grid.decay(
        cfg.threat_decay_rate_per_second,
        cfg.threat_peak_decay_rate_per_second,
        ctx.delta_seconds,
    );
}

/// The `threat_grid_update` system (pipeline step 5): deposits every living
/// combat unit's and building's noise/threat levels into their respective
/// grids, then spills noise into the threat field.
pub fn threat_grid_update(world: &mut World, _ctx: &SimulationContext) {
    for unit in world.combat_units.iter() {
        if unit.mortal.is_dead() {
            continue;
        }
        if unit.noise_level > Fixed64::ZERO {
            world.noise_grid.deposit(unit.position, unit.noise_level);
        }
        if unit.threat_level > Fixed64::ZERO {
            world.threat_grid.deposit_source(unit.position, unit.threat_level);
        }
    }

    for building in world.buildings.iter() {
        if building.mortal.is_dead() {
            continue;
        }
        let center = building.center(world.map_config.tile_size_px);
        if building.noise_level > Fixed64::ZERO {
            world.noise_grid.deposit(center, building.noise_level);
        }
        if building.threat_level > Fixed64::ZERO {
            world.threat_grid.deposit_source(center, building.threat_level);
        }
    }

    let spillover = world.config.noise_spillover_multiplier;
    let noise = world.noise_grid.clone();
    world.threat_grid.apply_noise_spillover(&noise, spillover);
}

/// The `separation` system (pipeline step 7): rebuilds the zombie crowd
/// density field from this tick's positions and folds its gradient (or a
/// deterministic fallback direction at a density peak) into each zombie's
/// smoothed separation vector.
pub fn separation(world: &mut World, ctx: &SimulationContext) {
    world.separation_field.clear();
    for zombie in world.zombies.iter() {
        if !zombie.mortal.is_dead() {
            world.separation_field.add_occupant(zombie.position);
        }
    }
    world.separation_field.blur();

    let min_density = world.config.separation_min_density_threshold;
    let alpha = world.config.separation_smoothing_alpha;

    for slot in 0..world.zombies.count() {
        let zombie = world.zombies.row_by_slot(slot).clone();
        if zombie.mortal.is_dead() {
            continue;
        }

        let (cx, cy) = world.separation_field.cell_of(zombie.position);
        let density = world.separation_field.density(cx, cy);
        let raw = if density < min_density {
            Fixed64Vec2::ZERO
        } else {
            let gradient = world.separation_field.gradient(cx, cy);
            if gradient == Fixed64Vec2::ZERO {
                let angle = rand::degrees_0_359(
                    ctx.session_seed,
                    ctx.current_frame,
                    slot as i32,
                    SALT_SEPARATION_FALLBACK,
                );
                #[allow(clippy::cast_sign_loss)]
                world.separation_field.perpendicular_spread(angle as u32)
            } else {
                gradient.normalized()
            }
        };

        let smoothed = zombie.smoothed_separation.lerp(raw, alpha);
        world.zombies.row_by_slot_mut(slot).smoothed_separation = smoothed;
    }
}
