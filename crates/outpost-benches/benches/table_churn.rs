// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Benchmark: allocate/free churn on a `Table<Zombie>`.
//!
//! Fills a table to capacity, then repeatedly frees and reallocates half its
//! rows, measuring the swap-remove/reuse cost in isolation from any system
//! logic. Throughput "elements" are allocate-then-free round trips.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use outpost_core::handle::Handle;
use outpost_core::ids::ZOMBIE;
use outpost_core::rows::Zombie;
use outpost_core::table::Table;

fn filled_table(capacity: usize) -> (Table<Zombie>, Vec<Handle>) {
    let mut table = Table::new(ZOMBIE, capacity);
    let handles: Vec<Handle> = (0..capacity).map(|_| table.allocate().unwrap()).collect();
    (table, handles)
}

fn bench_table_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_churn");
    group
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(60);
    for &n in &[100usize, 1_000, 10_000, 50_000] {
        group.throughput(Throughput::Elements(n as u64 / 2));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || filled_table(n),
                |(mut table, handles)| {
                    for handle in handles.iter().step_by(2) {
                        if let Some(slot) = table.get_slot(*handle) {
                            table.free_by_slot(slot);
                        }
                    }
                    for _ in (0..handles.len()).step_by(2) {
                        let handle = table.allocate().unwrap();
                        criterion::black_box(handle);
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_table_churn);
criterion_main!(benches);
