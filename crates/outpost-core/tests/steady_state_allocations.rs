// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Proves spec.md §8's "no allocations in steady state" claim for the
//! pathfinding service: once a destination's flow field is cached, repeated
//! queries against it hit the LRU and allocate nothing. Everything else in
//! this crate (spatial queries, table growth, snapshot export) is free to
//! allocate; this harness is scoped to the one path the spec makes an
//! explicit steady-state promise about.
//!
//! Needs its own `#[global_allocator]`, the one place in this workspace
//! `unsafe_code` is unavoidable — wrapping `System` to count bytes requires
//! implementing `GlobalAlloc` directly. No other file needs this allow.
#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use outpost_core::math::{Fixed64, Fixed64Vec2};
use outpost_core::pathfinding::{PathfindingConfig, PathfindingService, Terrain};

struct CountingAllocator;

static ALLOC_CALLS: AtomicUsize = AtomicUsize::new(0);
static ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        ALLOC_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOC_CALLS.fetch_add(1, Ordering::Relaxed);
        ALLOC_BYTES.fetch_add(new_size, Ordering::Relaxed);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

fn reset_counters() {
    ALLOC_CALLS.store(0, Ordering::Relaxed);
    ALLOC_BYTES.store(0, Ordering::Relaxed);
}

/// The allocator's counters are process-global; this file's two tests would
/// otherwise race each other under cargo's default parallel test threads.
static SERIAL: Mutex<()> = Mutex::new(());

fn config() -> PathfindingConfig {
    PathfindingConfig {
        sector_size_tiles: 16,
        recent_zone_paths_capacity: 8,
        multi_target_capacity: 4,
        single_dest_capacity: 4,
        target_set_capacity: 4,
        wall_cost_factor: Fixed64::from_int(8),
        min_magnitude: Fixed64::from_float(0.01),
        max_target_set_recursion: 4,
    }
}

#[test]
fn repeated_cache_hit_queries_allocate_nothing() {
    let _guard = SERIAL.lock().unwrap();
    let terrain = Terrain::new(32, 32);
    let mut service = PathfindingService::new(&terrain, config());
    // Start and destination tiles both fall inside sector (0,0) (tiles
    // 0..16 on each axis, given `sector_size_tiles: 16`): a single-zone
    // path, so the warmup call builds exactly one flow field.
    let from = Fixed64Vec2::from_ints(16, 16);
    let dest = (10, 10);

    // Cold call: builds and caches the flow field, necessarily allocates.
    let _ = service.get_flow_direction(&terrain, from, 32, dest, false);
    let after_warmup = service.telemetry_snapshot();
    assert_eq!(after_warmup.single_dest.misses, 1);

    // Every subsequent call from the same tile toward the same destination
    // is a pure cache hit: no field rebuild, no new allocation.
    reset_counters();
    for _ in 0..1_000 {
        let _ = service.get_flow_direction(&terrain, from, 32, dest, false);
    }

    let calls = ALLOC_CALLS.load(Ordering::Relaxed);
    let bytes = ALLOC_BYTES.load(Ordering::Relaxed);
    assert_eq!(
        calls, 0,
        "expected zero allocations across 1000 warm cache-hit queries, saw {calls} calls ({bytes} bytes)"
    );

    let after_hits = service.telemetry_snapshot();
    assert_eq!(after_hits.single_dest.hits, 1_000);
    assert_eq!(after_hits.single_dest.misses, 1);
}

#[test]
fn querying_different_tiles_within_an_already_cached_field_still_does_not_allocate() {
    let _guard = SERIAL.lock().unwrap();
    let terrain = Terrain::new(32, 32);
    let mut service = PathfindingService::new(&terrain, config());
    let dest = (10, 10);

    // Warm the field from one starting tile inside sector (0,0).
    let _ = service.get_flow_direction(&terrain, Fixed64Vec2::from_ints(0, 0), 32, dest, false);

    reset_counters();
    // Sampling other tiles in the same sector, toward the same destination,
    // reuses the already-built field: still a cache hit, still zero bytes.
    for (x, y) in [(4, 4), (10, 2), (2, 10), (15, 15), (0, 15), (15, 0)] {
        let position = Fixed64Vec2::from_ints(x * 32 + 16, y * 32 + 16);
        let _ = service.get_flow_direction(&terrain, position, 32, dest, false);
    }

    let calls = ALLOC_CALLS.load(Ordering::Relaxed);
    assert_eq!(calls, 0, "sampling a warm field from new tiles should not allocate, saw {calls} calls");
}
