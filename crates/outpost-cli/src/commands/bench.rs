// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `outpost-cli bench`: run a warmup window then report steady-state table
//! occupancy over a measured window, as a cheap sanity check for the "no
//! allocations in steady state" property without pulling in `criterion`.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use outpost_core::scheduler::SystemScheduler;
use outpost_core::systems;
use outpost_core::world::World;

use crate::config::ConfigSource;

/// Arguments for the `bench` subcommand.
#[derive(Args)]
pub struct BenchArgs {
    /// Optional TOML config file overriding `WorldConfig::default()`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Frames to run before measurement starts, letting spawn bursts settle.
    #[arg(long, default_value_t = 600)]
    warmup_frames: u32,
    /// Frames to measure after warmup.
    #[arg(long, default_value_t = 1800)]
    measure_frames: u32,
    /// Deterministic session seed handed to every system this run.
    #[arg(long, default_value_t = 1)]
    session_seed: i32,
}

/// Runs the `bench` subcommand.
///
/// # Errors
/// Returns an error if `--config` names a file that doesn't exist or
/// doesn't parse as a [`outpost_core::WorldConfig`].
pub fn run(args: &BenchArgs) -> Result<()> {
    let config = ConfigSource::load(args.config.as_deref())?;
    let tick_rate_hz = config.tick_rate_hz;
    let mut world = World::new(config);

    let mut scheduler = SystemScheduler::new();
    systems::register_all(&mut scheduler);

    for _ in 0..args.warmup_frames {
        scheduler.tick(&mut world, args.session_seed, tick_rate_hz);
    }

    let mut zombie_min = world.zombies.count();
    let mut zombie_max = zombie_min;
    let skips_before = world.match_stats.capacity_exceeded_skips;

    let started = Instant::now();
    for _ in 0..args.measure_frames {
        scheduler.tick(&mut world, args.session_seed, tick_rate_hz);
        let count = world.zombies.count();
        zombie_min = zombie_min.min(count);
        zombie_max = zombie_max.max(count);
    }
    let elapsed = started.elapsed();
    let skips_during_measure = world.match_stats.capacity_exceeded_skips - skips_before;

    let frames_per_second = f64::from(args.measure_frames) / elapsed.as_secs_f64();
    println!("warmup_frames:   {}", args.warmup_frames);
    println!("measure_frames:  {}", args.measure_frames);
    println!("elapsed:         {elapsed:?}");
    println!("frames_per_sec:  {frames_per_second:.1}");
    println!("zombie_count_min_during_measure: {zombie_min}");
    println!("zombie_count_max_during_measure: {zombie_max}");
    println!("capacity_exceeded_skips_during_measure: {skips_during_measure}");

    Ok(())
}
