// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Benchmark: single-destination flow field construction cost, as paid by
//! the first [`PathfindingService::get_flow_direction`] call for a zone that
//! hasn't cached a flow toward that destination yet.
//!
//! Throughput "elements" are tiles in the map (the Dijkstra sweep's cost
//! scales with the size of the connected zone, which scales with the map).

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use outpost_core::math::Fixed64Vec2;
use outpost_core::world::World;
use outpost_dry_tests::WorldBuilder;

fn scattered_wall_world(size: i32) -> World {
    let mut world = WorldBuilder::new()
        .with_small_capacities(1)
        .with_map_size(size, size)
        .build();
    for y in 0..size {
        for x in 0..size {
            if (x * 7 + y * 13) % 11 == 0 {
                world.terrain.set_terrain_passable(x, y, false);
            }
        }
    }
    world
}

fn bench_flow_field_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("flow_field_build");
    group
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(40);
    for &size in &[16i32, 32, 64, 128] {
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || scattered_wall_world(size),
                |mut world| {
                    let tile_size = world.map_config.tile_size_px;
                    let terrain = world.terrain.clone();
                    let start = Fixed64Vec2::ZERO;
                    let direction = world
                        .pathfinding
                        .get_flow_direction(&terrain, start, tile_size, (size - 1, size - 1), true);
                    criterion::black_box(direction);
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_flow_field_build);
criterion_main!(benches);
