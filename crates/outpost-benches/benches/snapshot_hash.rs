// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Benchmark: CBOR snapshot encoding plus the FNV-1a desync hash over the
//! encoded bytes, at increasing zombie counts.
//!
//! Throughput "elements" are live rows in the snapshotted world.

use std::time::Duration;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use outpost_core::math::Fixed64Vec2;
use outpost_core::rows::MortalFlags;
use outpost_net::snapshot;
use outpost_dry_tests::WorldBuilder;

fn world_with_zombies(n: usize) -> outpost_core::world::World {
    let mut world = WorldBuilder::new().with_small_capacities(n.max(1)).build();
    for i in 0..n {
        let handle = world.zombies.allocate().unwrap();
        let slot = world.zombies.get_slot(handle).unwrap();
        let row = world.zombies.row_by_slot_mut(slot);
        row.position = Fixed64Vec2::from_ints((i % 256) as i32, (i / 256) as i32);
        row.mortal = MortalFlags::active();
    }
    world
}

fn bench_snapshot_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_hash");
    group
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(40);
    for &n in &[10usize, 100, 1_000, 10_000, 50_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || world_with_zombies(n),
                |world| {
                    let encoded = snapshot::encode(0, 1, &world).expect("encode must succeed");
                    let bytes = Bytes::from(encoded);
                    let hash = outpost_net::desync::fnv1a_64(&bytes);
                    criterion::black_box(hash);
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snapshot_hash);
criterion_main!(benches);
