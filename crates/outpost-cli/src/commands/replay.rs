// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `outpost-cli replay`: load a snapshot file written by `outpost-net` and
//! re-simulate it forward.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use outpost_core::scheduler::SystemScheduler;
use outpost_core::systems;
use outpost_core::world::World;
use outpost_net::snapshot;

use crate::config::ConfigSource;

/// Arguments for the `replay` subcommand.
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to a snapshot file produced by `outpost_net::snapshot::encode`.
    #[arg(long)]
    snapshot: PathBuf,
    /// Optional TOML config file; must match the config the snapshot was
    /// taken under, since `WorldConfig` itself isn't part of the snapshot.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of additional frames to simulate past the snapshot.
    #[arg(long, default_value_t = 300)]
    frames: u32,
}

/// Runs the `replay` subcommand.
///
/// # Errors
/// Returns an error if the snapshot file can't be read, its header or body
/// fails to decode, or `--config` fails to load.
pub fn run(args: &ReplayArgs) -> Result<()> {
    let bytes = std::fs::read(&args.snapshot)
        .with_context(|| format!("failed to read snapshot file {}", args.snapshot.display()))?;
    let (frame, session_seed, body) =
        snapshot::decode(&bytes).context("failed to decode snapshot")?;

    let config = ConfigSource::load(args.config.as_deref())?;
    let tick_rate_hz = config.tick_rate_hz;
    let mut world = World::new(config);
    world.restore_from_snapshot(body);

    let mut scheduler = SystemScheduler::new();
    systems::register_all(&mut scheduler);
    scheduler.set_current_frame(frame);

    for _ in 0..args.frames {
        scheduler.tick(&mut world, session_seed, tick_rate_hz);
    }

    println!("replayed from frame {frame} (session_seed {session_seed})");
    println!("ran {} additional frames, now at frame {}", args.frames, scheduler.current_frame());
    println!("combat_units: {}", world.combat_units.count());
    println!("zombies:      {}", world.zombies.count());

    Ok(())
}
