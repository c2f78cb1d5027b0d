// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `outpost-cli tick`: drive a fresh world for a fixed number of frames and
//! print summary stats.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use outpost_core::scheduler::SystemScheduler;
use outpost_core::systems;
use outpost_core::world::World;

use crate::config::ConfigSource;

/// Arguments for the `tick` subcommand.
#[derive(Args)]
pub struct TickArgs {
    /// Optional TOML config file overriding `WorldConfig::default()`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 300)]
    frames: u32,
    /// Deterministic session seed handed to every system this run.
    #[arg(long, default_value_t = 1)]
    session_seed: i32,
}

/// Runs the `tick` subcommand.
///
/// # Errors
/// Returns an error if `--config` names a file that doesn't exist or
/// doesn't parse as a [`outpost_core::WorldConfig`].
pub fn run(args: &TickArgs) -> Result<()> {
    let config = ConfigSource::load(args.config.as_deref())?;
    let tick_rate_hz = config.tick_rate_hz;
    let mut world = World::new(config);

    let mut scheduler = SystemScheduler::new();
    systems::register_all(&mut scheduler);

    for _ in 0..args.frames {
        scheduler.tick(&mut world, args.session_seed, tick_rate_hz);
    }

    println!("simulated {} frames at {tick_rate_hz}Hz", args.frames);
    println!("combat_units: {}", world.combat_units.count());
    println!("zombies:      {}", world.zombies.count());
    println!("buildings:    {}", world.buildings.count());
    println!("projectiles:  {}", world.projectiles.count());
    println!("zombie_kills: {}", world.match_stats.zombie_kills);
    println!("unit_losses:  {}", world.match_stats.unit_losses);
    println!(
        "capacity_exceeded_skips: {}",
        world.match_stats.capacity_exceeded_skips
    );

    Ok(())
}
