// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Benchmark: [`outpost_core::rvo::solve_agent`] against a neighbor list of
//! varying size, isolating the avoidance math from table iteration and
//! spatial-index query cost.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use outpost_core::math::{Fixed64, Fixed64Vec2};
use outpost_core::rvo::{self, RvoAgent, RvoConfig};

fn config() -> RvoConfig {
    RvoConfig {
        neighbor_radius: Fixed64::from_int(160),
        max_neighbors: 32,
        time_horizon: Fixed64::from_int(2),
        avoidance_weight: Fixed64::ONE,
        max_avoidance_force: Fixed64::from_int(200),
        smoothing_alpha: Fixed64::from_float(0.3),
        default_agent_radius: Fixed64::from_int(16),
    }
}

fn ring_of_neighbors(n: usize) -> Vec<RvoAgent> {
    (0..n)
        .map(|i| {
            let degrees = (i as i32 * 360 / n.max(1) as i32) % 360;
            let radians = Fixed64::from_int(degrees) * Fixed64::from_float(std::f64::consts::PI / 180.0);
            let (sin, cos) = radians.sin_cos();
            RvoAgent {
                position: Fixed64Vec2::new(cos * Fixed64::from_int(80), sin * Fixed64::from_int(80)),
                velocity: Fixed64Vec2::new(-cos, -sin),
                radius: Fixed64::from_int(16),
            }
        })
        .collect()
}

fn bench_rvo_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("rvo_solve");
    group
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(80);
    for &n in &[1usize, 4, 8, 16, 32] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let cfg = config();
            let agent = RvoAgent {
                position: Fixed64Vec2::ZERO,
                velocity: Fixed64Vec2::new(Fixed64::from_int(48), Fixed64::ZERO),
                radius: Fixed64::from_int(16),
            };
            let preferred = Fixed64Vec2::new(Fixed64::from_int(48), Fixed64::ZERO);
            let dt = Fixed64::ONE / Fixed64::from_int(30);
            b.iter_batched(
                || ring_of_neighbors(n),
                |neighbors| {
                    let result = rvo::solve_agent(
                        &cfg,
                        agent,
                        preferred,
                        Fixed64Vec2::ZERO,
                        &neighbors,
                        |_| Fixed64Vec2::new(Fixed64::ONE, Fixed64::ZERO),
                        dt,
                        Fixed64::from_int(200),
                    );
                    criterion::black_box(result);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rvo_solve);
criterion_main!(benches);
