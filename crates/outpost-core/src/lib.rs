// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic fixed-point simulation core for a real-time strategy game:
//! columnar entity storage, grid-based crowd/threat fields, hierarchical
//! flow-field pathfinding, and the ordered system pipeline that advances a
//! [`World`] one frame at a time.
//!
//! Every public type here is deterministic across platforms: all arithmetic
//! is fixed-point (see [`math`]), all randomness is seeded (see [`rand`]),
//! and iteration order is always slot order, never hash order.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(clippy::todo, clippy::unimplemented, clippy::dbg_macro)]
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod ai;
pub mod combat;
pub mod config;
pub mod environment;
pub mod error;
pub mod grid;
pub mod handle;
pub mod ids;
pub mod lifecycle;
pub mod math;
pub mod pathfinding;
pub mod query;
pub mod rand;
pub mod rows;
pub mod rvo;
pub mod scheduler;
pub mod spawn;
pub mod systems;
pub mod table;
pub mod world;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use config::WorldConfig;
pub use error::SimError;
pub use handle::Handle;
pub use world::World;
