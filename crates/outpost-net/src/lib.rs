// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rollback netcode for `outpost-core`: a dense per-frame input ring, a
//! snapshot ring used to resimulate on misprediction, and a desync detector
//! that hashes confirmed frames and exports a per-system diagnostic the
//! moment two peers disagree.
//!
//! This crate owns everything spec'd as "the protocol layer": it never reads
//! a socket and never frames bytes on a transport. It consumes already
//! decoded [`wire::Message`] values and produces them; carrying those bytes
//! between peers is an external collaborator's job.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(clippy::todo, clippy::unimplemented, clippy::dbg_macro)]
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod coordinator;
pub mod desync;
pub mod error;
pub mod input;
pub mod input_buffer;
pub mod rollback;
pub mod snapshot;
pub mod wire;

pub use coordinator::{RestartCoordinator, SessionRole};
pub use desync::{DesyncDetector, DesyncEvent};
pub use error::NetError;
pub use input::GameInput;
pub use input_buffer::{InputWrite, MultiPlayerInputBuffer};
pub use rollback::{RollbackSession, TickOutcome};
pub use snapshot::SnapshotRing;
pub use wire::Message;
