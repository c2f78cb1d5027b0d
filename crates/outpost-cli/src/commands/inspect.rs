// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `outpost-cli inspect`: drive a fresh world for N frames, then pretty-print
//! its live `combat_units` and `zombies` rows as tables.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Table as DisplayTable, presets::UTF8_FULL};
use outpost_core::scheduler::SystemScheduler;
use outpost_core::systems;
use outpost_core::world::World;

use crate::config::ConfigSource;

/// Arguments for the `inspect` subcommand.
#[derive(Args)]
pub struct InspectArgs {
    /// Optional TOML config file overriding `WorldConfig::default()`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to simulate before printing.
    #[arg(long, default_value_t = 0)]
    frames: u32,
    /// Deterministic session seed handed to every system this run.
    #[arg(long, default_value_t = 1)]
    session_seed: i32,
    /// Print at most this many rows per table.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

/// Runs the `inspect` subcommand.
///
/// # Errors
/// Returns an error if `--config` names a file that doesn't exist or
/// doesn't parse as a [`outpost_core::WorldConfig`].
pub fn run(args: &InspectArgs) -> Result<()> {
    let config = ConfigSource::load(args.config.as_deref())?;
    let tick_rate_hz = config.tick_rate_hz;
    let mut world = World::new(config);

    let mut scheduler = SystemScheduler::new();
    systems::register_all(&mut scheduler);
    for _ in 0..args.frames {
        scheduler.tick(&mut world, args.session_seed, tick_rate_hz);
    }

    println!("frame {}", scheduler.current_frame());

    let mut units = DisplayTable::new();
    units.load_preset(UTF8_FULL);
    units.set_header(vec!["handle", "x", "y", "health", "max_health", "order"]);
    for (slot, row) in world.combat_units.iter().enumerate().take(args.limit) {
        let handle = world.combat_units.get_handle(slot as u32);
        units.add_row(vec![
            format!("{:?}", handle),
            row.position.x.to_int().to_string(),
            row.position.y.to_int().to_string(),
            row.health.to_int().to_string(),
            row.max_health.to_int().to_string(),
            format!("{:?}", row.order),
        ]);
    }
    println!("combat_units ({} live):", world.combat_units.count());
    println!("{units}");

    let mut zombies = DisplayTable::new();
    zombies.load_preset(UTF8_FULL);
    zombies.set_header(vec!["handle", "x", "y", "health", "ai_state", "target"]);
    for (slot, row) in world.zombies.iter().enumerate().take(args.limit) {
        let handle = world.zombies.get_handle(slot as u32);
        zombies.add_row(vec![
            format!("{:?}", handle),
            row.position.x.to_int().to_string(),
            row.position.y.to_int().to_string(),
            row.health.to_int().to_string(),
            format!("{:?}", row.ai_state),
            format!("{:?}", row.target),
        ]);
    }
    println!("zombies ({} live):", world.zombies.count());
    println!("{zombies}");

    Ok(())
}
