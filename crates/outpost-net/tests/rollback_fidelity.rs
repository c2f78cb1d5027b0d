// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rollback idempotence: restoring a snapshot and resimulating forward must
//! reproduce the exact same serialized bytes as simulating straight through.

use outpost_core::config::WorldConfig;
use outpost_core::scheduler::SystemScheduler;
use outpost_core::systems;
use outpost_core::world::World;
use outpost_net::snapshot;

fn build_world() -> (World, SystemScheduler) {
    let mut config = WorldConfig::default();
    config.combat_unit_capacity = 64;
    config.zombie_capacity = 64;
    config.building_capacity = 16;
    config.projectile_capacity = 64;
    config.resource_node_capacity = 8;

    let world = World::new(config);
    let mut scheduler = SystemScheduler::new();
    systems::register_all(&mut scheduler);
    (world, scheduler)
}

#[test]
fn restoring_a_snapshot_and_resimulating_reproduces_identical_bytes() {
    let session_seed = 99;
    let (mut world, mut scheduler) = build_world();
    let tick_rate_hz = world.config.tick_rate_hz;

    let mut snapshot_at_100 = None;
    for _ in 0..200 {
        scheduler.tick(&mut world, session_seed, tick_rate_hz);
        if scheduler.current_frame() == 100 {
            snapshot_at_100 = Some(snapshot::encode(100, session_seed, &world).unwrap());
        }
    }
    let expected_bytes = snapshot::encode(200, session_seed, &world).unwrap();

    let (mut restored_world, mut restored_scheduler) = build_world();
    let (frame, seed, body) = snapshot::decode(&snapshot_at_100.unwrap()).unwrap();
    assert_eq!(frame, 100);
    assert_eq!(seed, session_seed);
    restored_world.restore_from_snapshot(body);
    restored_world.rebuild_derived_state();
    restored_scheduler.set_current_frame(frame);

    while restored_scheduler.current_frame() < 200 {
        restored_scheduler.tick(&mut restored_world, session_seed, tick_rate_hz);
    }
    let actual_bytes = snapshot::encode(200, session_seed, &restored_world).unwrap();

    assert_eq!(actual_bytes, expected_bytes);
}
