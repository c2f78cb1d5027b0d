// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end scenario tests driving the full system pipeline through
//! [`outpost_dry_tests::run_scripted_frames`] or direct system calls, one
//! test per concrete scenario: two zombies melee-ing a single unit, a wall
//! forcing a pathfinding detour, a spawn burst beyond table capacity, and
//! swap-remove correctness under a mass death sweep.

use outpost_core::config::WorldConfig;
use outpost_core::math::{Fixed64, Fixed64Vec2};
use outpost_core::rows::{MortalFlags, TargetKind, ZombieState};
use outpost_core::scheduler::{SimulationContext, SystemScheduler};
use outpost_core::world::World;
use outpost_core::{lifecycle, query, spawn, systems};
use outpost_dry_tests::{run_scripted_frames, WorldBuilder};

fn ctx(frame: i32, session_seed: i32, delta_seconds: Fixed64) -> SimulationContext {
    SimulationContext { current_frame: frame, session_seed, delta_seconds }
}

/// Two zombies both in melee range of a single combat unit deal damage in
/// lockstep every `attack_cooldown_seconds`; over a two-second window both
/// land exactly two hits each.
#[test]
fn two_zombies_melee_one_unit_in_lockstep() {
    let mut world = WorldBuilder::new().with_small_capacities(8).build();

    let unit_position = Fixed64Vec2::ZERO;
    let unit = world.combat_units.allocate().unwrap();
    let unit_slot = world.combat_units.get_slot(unit).unwrap();
    {
        let row = world.combat_units.row_by_slot_mut(unit_slot);
        row.position = unit_position;
        row.health = Fixed64::from_int(1000);
        row.max_health = Fixed64::from_int(1000);
        row.armor = Fixed64::ZERO;
        // Disable the unit's own counter-fire so this test isolates zombie melee.
        row.attack_range = Fixed64::ZERO;
        row.threat_level = Fixed64::from_int(50);
        row.mortal = MortalFlags::active();
    }

    let zombie_damage = Fixed64::from_int(6);
    let attack_range = Fixed64::from_int(24);
    for offset in [Fixed64::from_int(20), Fixed64::from_int(-20)] {
        let handle = world.zombies.allocate().unwrap();
        let slot = world.zombies.get_slot(handle).unwrap();
        let row = world.zombies.row_by_slot_mut(slot);
        row.position = unit_position + Fixed64Vec2::new(offset, Fixed64::ZERO);
        row.health = Fixed64::from_int(40);
        row.max_health = Fixed64::from_int(40);
        row.damage = zombie_damage;
        row.attack_range = attack_range;
        row.threat_search_radius = Fixed64::from_int(1000);
        row.target = unit;
        row.target_kind = TargetKind::Unit;
        row.ai_state = ZombieState::Chase;
        row.mortal = MortalFlags::active();
    }

    // 60 ticks at 30Hz = a 2-second window; both zombies enter Attack on
    // frame 0 (already in range) and land hits on frames 29 and 59.
    run_scripted_frames(&mut world, 11, 60);

    let attacks_in_window = 2;
    let expected_damage = Fixed64::from_int(2) * zombie_damage * Fixed64::from_int(attacks_in_window);
    let unit = world.combat_units.row_by_slot(unit_slot);
    assert_eq!(unit.health, Fixed64::from_int(1000) - expected_damage);
}

/// A wall blocking the direct line between a chasing zombie and its target
/// forces the flow field to route around: the zombie's initial flow
/// direction isn't the naive straight-line one, and the path it actually
/// walks is longer than the straight-line distance it covers.
#[test]
fn wall_forces_zombie_to_detour() {
    let mut world = WorldBuilder::new()
        .with_small_capacities(8)
        .with_config(|cfg| {
            cfg.zombie_spawn_move_speed = Fixed64::from_int(200);
        })
        .build();

    let wall_row_tile_y = 50;
    for x in 10..20 {
        world.terrain.set_terrain_passable(x, wall_row_tile_y, false);
    }

    let zombie_start = Fixed64Vec2::from_ints(64, 1600);
    let unit_position = Fixed64Vec2::from_ints(640, 1600);

    let unit = world.combat_units.allocate().unwrap();
    let unit_slot = world.combat_units.get_slot(unit).unwrap();
    {
        let row = world.combat_units.row_by_slot_mut(unit_slot);
        row.position = unit_position;
        row.health = Fixed64::from_int(1000);
        row.max_health = Fixed64::from_int(1000);
        row.attack_range = Fixed64::ZERO;
        // Keeps the zombie's Chase state from lapsing back to Idle for lack
        // of nearby threat (zombie_state_transition's lost-interest check).
        row.threat_level = Fixed64::from_int(50);
        row.mortal = MortalFlags::active();
    }

    let zombie = world.zombies.allocate().unwrap();
    let zombie_slot = world.zombies.get_slot(zombie).unwrap();
    {
        let row = world.zombies.row_by_slot_mut(zombie_slot);
        row.position = zombie_start;
        row.health = Fixed64::from_int(40);
        row.max_health = Fixed64::from_int(40);
        row.move_speed = Fixed64::from_int(200);
        row.threat_search_radius = Fixed64::from_int(4000);
        row.target = unit;
        row.target_kind = TargetKind::Unit;
        row.ai_state = ZombieState::Chase;
        row.mortal = MortalFlags::active();
    }

    let tile_size = world.map_config.tile_size_px;
    let dest_tile =
        ((unit_position.x / Fixed64::from_int(tile_size)).to_int(), (unit_position.y / Fixed64::from_int(tile_size)).to_int());
    let terrain = world.terrain.clone();
    let start_direction = world.pathfinding.get_flow_direction(&terrain, zombie_start, tile_size, dest_tile, true);
    assert!(start_direction.x > Fixed64::ZERO, "flow must still make forward progress toward the target");
    assert_ne!(start_direction.y, Fixed64::ZERO, "a pure +X direction would walk straight into the wall");

    let mut scheduler = SystemScheduler::new();
    systems::register_all(&mut scheduler);
    let tick_rate_hz = world.config.tick_rate_hz;

    let mut path_length = Fixed64::ZERO;
    let mut previous_position = zombie_start;
    for _ in 0..60 {
        scheduler.tick(&mut world, 5, tick_rate_hz);
        let current_position = world.zombies.row_by_slot(zombie_slot).position;
        path_length += previous_position.distance(current_position);
        previous_position = current_position;
    }

    let end_position = world.zombies.row_by_slot(zombie_slot).position;
    assert_ne!(end_position, zombie_start, "the zombie must have actually moved");
    let straight_line = zombie_start.distance(end_position);
    assert!(
        path_length >= straight_line * Fixed64::from_float(1.1),
        "detouring around the wall must cost at least 10% over the straight-line distance covered"
    );
}

/// A spawn burst larger than the zombie table's capacity fills the table
/// exactly to capacity, leaves the overflow queued for a later tick, and
/// counts every skipped spawn.
#[test]
fn capacity_exhaustion_caps_spawn_burst_exactly() {
    let mut world = World::new(WorldConfig::default());
    assert_eq!(world.config.zombie_capacity, 50_000);

    world.wave_state.spawn_budget_this_tick = 60_000;
    world.wave_state.zombies_remaining_in_wave = 60_000;

    spawn::enemy_spawn(&mut world, &ctx(0, 1, Fixed64::ONE / Fixed64::from_int(30)));

    assert_eq!(world.zombies.count(), 50_000);
    assert_eq!(world.match_stats.capacity_exceeded_skips, 10_000);
    assert_eq!(world.wave_state.zombies_remaining_in_wave, 10_000);
}

/// Killing every third zombie (1-indexed) out of 1000 and sweeping past the
/// death delay leaves exactly the expected survivor count, with every dead
/// handle unresolvable and every surviving handle intact.
#[test]
fn swap_remove_is_correct_under_a_mass_death_sweep() {
    let mut cfg = WorldConfig::default();
    cfg.zombie_capacity = 1000;
    let mut world = World::new(cfg);

    let mut handles = Vec::with_capacity(1000);
    for i in 0..1000 {
        let handle = world.zombies.allocate().unwrap();
        let slot = world.zombies.get_slot(handle).unwrap();
        let row = world.zombies.row_by_slot_mut(slot);
        row.mortal = MortalFlags::active();
        row.health = Fixed64::from_int(40);
        handles.push((i + 1, handle));
    }

    let mut expected_dead = 0;
    for &(one_indexed, handle) in &handles {
        if one_indexed % 3 == 0 {
            let slot = world.zombies.get_slot(handle).unwrap();
            world.zombies.row_by_slot_mut(slot).health = Fixed64::ZERO;
            expected_dead += 1;
        }
    }
    assert_eq!(expected_dead, 333);

    let death_delay_frames = world.config.unit_death_delay_frames;
    for frame in 0..=death_delay_frames {
        lifecycle::mortal_death(&mut world.combat_units, &mut world.zombies, &mut world.match_stats, frame, death_delay_frames);
    }

    assert_eq!(world.zombies.count(), 667);

    let mut live = 0;
    let mut dead = 0;
    for &(one_indexed, handle) in &handles {
        match world.zombies.get_slot(handle) {
            Some(slot) => {
                live += 1;
                assert_ne!(one_indexed % 3, 0, "a marked-dead handle must not still resolve");
                assert_eq!(world.zombies.get_handle(slot), handle);
            }
            None => {
                dead += 1;
                assert_eq!(one_indexed % 3, 0, "only marked-dead handles may fail to resolve");
            }
        }
    }
    assert_eq!(live, 667);
    assert_eq!(dead, 333);

    // mark_newly_dead only fires once per row; re-running the sweep is idempotent.
    let _ = query::mark_newly_dead(&mut world.zombies, death_delay_frames);
}
