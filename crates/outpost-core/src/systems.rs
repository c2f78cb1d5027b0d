// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Assembles the fixed, ordered [`SystemScheduler`] pipeline. The
//! registration order here *is* the simulation's dependency graph — see each
//! system's own doc comment for why it sits where it does.

use crate::scheduler::{SimulationContext, SystemScheduler};
use crate::world::World;
use crate::{ai, combat, environment, lifecycle, rvo, spawn};

/// Registers every simulation system onto `scheduler`, in pipeline order.
///
/// With the `dev-reload` feature disabled, `apply_scheduled_game_data_reload`
/// is not registered at all: a production build carries zero scheduling or
/// branch cost for it, rather than a step that runs and no-ops every frame.
pub fn register_all(scheduler: &mut SystemScheduler) {
    #[cfg(feature = "dev-reload")]
    scheduler.register("apply_scheduled_game_data_reload", 1, 0, apply_scheduled_game_data_reload);

    #[cfg(feature = "telemetry")]
    scheduler.register("telemetry_report", 150, 0, telemetry_report);

    scheduler.register("velocity_reset", 1, 0, environment::velocity_reset);
    scheduler.register("flow_field_invalidation", 1, 0, environment::flow_field_invalidation);
    scheduler.register("noise_decay", 2, 0, environment::noise_decay);
    scheduler.register("threat_grid_decay", 2, 1, environment::threat_grid_decay);
    scheduler.register("threat_grid_update", 1, 0, environment::threat_grid_update);
    scheduler.register("zombie_state_transition", 1, 0, ai::zombie_state_transition);
    scheduler.register("separation", 1, 0, environment::separation);
    scheduler.register("rvo", 1, 0, rvo::rvo);
    scheduler.register("noise_attraction_update", 1, 0, ai::noise_attraction_update);
    scheduler.register("zombie_movement", 1, 0, ai::zombie_movement);
    scheduler.register("move_command", 1, 0, lifecycle::move_command);
    scheduler.register("combat_unit_target_acquisition", 1, 0, combat::combat_unit_target_acquisition);
    scheduler.register("combat_unit_movement", 1, 0, lifecycle::combat_unit_movement);
    scheduler.register("combat_unit_combat", 1, 0, combat::combat_unit_combat);
    scheduler.register("zombie_combat", 1, 0, combat::zombie_combat);
    scheduler.register("projectile", 1, 0, combat::projectile);
    scheduler.register("moveable_apply_movement", 1, 0, moveable_apply_movement);
    scheduler.register("mortal_death", 1, 0, mortal_death_system);
    scheduler.register("building_death", 1, 0, building_death_system);
    scheduler.register("wave_management", 1, 0, spawn::wave_management);
    scheduler.register("enemy_spawn", 1, 0, spawn::enemy_spawn);
    scheduler.register("unit_spawn", 1, 0, spawn::unit_spawn);
    scheduler.register("building_placement", 1, 0, spawn::building_placement);
    scheduler.register("resource_node_spawn", 1, 0, spawn::resource_node_spawn);
}

/// Dev-only hot-reload hook for game-data content (unit stats, map config).
/// Compiled out entirely without the `dev-reload` feature; real file-watch
/// wiring lives in `outpost-cli`, which calls back into whatever this grows
/// into.
#[cfg(feature = "dev-reload")]
fn apply_scheduled_game_data_reload(_world: &mut World, _ctx: &SimulationContext) {}

/// Dev/ops diagnostic hook (every 150 frames, ~5s at 30Hz): emits this tick's
/// pathfinding flow-field cache hit/miss/eviction counts as a JSONL event.
/// Compiled out entirely without the `telemetry` feature.
#[cfg(feature = "telemetry")]
fn telemetry_report(world: &mut World, ctx: &SimulationContext) {
    crate::telemetry::pathfinding_cache_stats(ctx.current_frame, world.pathfinding.telemetry_snapshot());
}

/// The `moveable_apply_movement` system (pipeline step 17): integrates
/// position from velocity for both moveable tables, with terrain/occupancy
/// collision. Projectiles move freely and are advanced by [`combat::projectile`]
/// instead.
fn moveable_apply_movement(world: &mut World, ctx: &SimulationContext) {
    let tile_size = world.map_config.tile_size_px;
    let terrain = world.terrain.clone();
    lifecycle::apply_movement_with_collision(&mut world.combat_units, &terrain, tile_size, ctx.delta_seconds);
    lifecycle::apply_movement_with_collision(&mut world.zombies, &terrain, tile_size, ctx.delta_seconds);
}

/// The `mortal_death` system (pipeline step 18): thin field-splitting wrapper
/// around [`lifecycle::mortal_death`], which takes its tables explicitly
/// rather than a whole `&mut World`.
fn mortal_death_system(world: &mut World, ctx: &SimulationContext) {
    let unit_death_delay_frames = world.config.unit_death_delay_frames;
    let (combat_units, zombies, match_stats) = (&mut world.combat_units, &mut world.zombies, &mut world.match_stats);
    lifecycle::mortal_death(combat_units, zombies, match_stats, ctx.current_frame, unit_death_delay_frames);
}

/// The `building_death` system (pipeline step 19): thin field-splitting
/// wrapper around [`lifecycle::building_death`].
fn building_death_system(world: &mut World, ctx: &SimulationContext) {
    let sector_size_tiles = world.config.sector_size_tiles;
    let building_death_delay_frames = world.config.building_death_delay_frames;
    let (buildings, combat_units, terrain, pathfinding, match_stats) = (
        &mut world.buildings,
        &mut world.combat_units,
        &mut world.terrain,
        &mut world.pathfinding,
        &mut world.match_stats,
    );
    lifecycle::building_death(
        buildings,
        combat_units,
        terrain,
        pathfinding,
        match_stats,
        ctx.current_frame,
        sector_size_tiles,
        building_death_delay_frames,
    );
}
