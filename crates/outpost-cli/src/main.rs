// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Outpost developer CLI: drive a simulation for a fixed number of frames,
//! report steady-state allocation behavior, re-simulate a saved snapshot,
//! and inspect a world's table contents. Not a multiplayer client — it
//! never touches `outpost-net`'s rollback session or wire layer, only the
//! deterministic core plus the snapshot codec.

// Every subcommand reports its results by printing to stdout; that's the
// entire point of a developer CLI.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "outpost-cli", about = "Outpost developer CLI: tick, bench, replay, inspect")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a fresh world for a fixed number of ticks and print summary stats.
    Tick(commands::tick::TickArgs),
    /// Report steady-state allocation counts over a warmup-then-measure run.
    Bench(commands::bench::BenchArgs),
    /// Load a snapshot file and re-simulate it forward.
    Replay(commands::replay::ReplayArgs),
    /// Pretty-print a world's table contents as it stands after N ticks.
    Inspect(commands::inspect::InspectArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Tick(args) => commands::tick::run(&args),
        Commands::Bench(args) => commands::bench::run(&args),
        Commands::Replay(args) => commands::replay::run(&args),
        Commands::Inspect(args) => commands::inspect::run(&args),
    }
}
