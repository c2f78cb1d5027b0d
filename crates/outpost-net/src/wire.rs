// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The wire message contract (spec.md §6): a small discriminated union,
//! little-endian on the wire. Framing and transport reliability are an
//! external collaborator's job — this module only defines the payloads and
//! their byte layout.

use crate::input::GameInput;

/// Up to this many contiguous prior frames ride along with the current
/// frame in an `Input` packet, per spec.md §4.12's redundancy scheme.
pub const MAX_REDUNDANT_FRAMES: usize = 3;

/// One player's input for one frame, as carried inside [`Message::Input`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestampedInput {
    /// The frame this input applies to.
    pub frame: i32,
    /// The input itself.
    pub input: GameInput,
}

/// The wire message contract. Reliable variants must be delivered in order
/// per-peer; `Input` is sent unreliably and relies on redundancy plus
/// dedup on the receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// A player's current frame of input plus up to
    /// [`MAX_REDUNDANT_FRAMES`] preceding contiguous frames, sent
    /// unreliably. The sender stops adding older frames at the first gap
    /// in its own buffer, so every packet is internally contiguous.
    Input {
        /// The player slot this input is from.
        sender_slot: u8,
        /// The frames carried in this packet, newest first.
        frames: Vec<TimestampedInput>,
    },
    /// A confirmed-frame hash, broadcast for desync comparison.
    SyncCheck {
        /// The sending peer's slot.
        slot: u8,
        /// The frame this hash covers.
        frame: i32,
        /// The 64-bit FNV-1a hash of that frame's serialized snapshot.
        hash: u64,
    },
    /// Broadcast the instant a peer's desync detector latches.
    DesyncNotify {
        /// The slot of the peer that detected the mismatch.
        slot: u8,
        /// The frame at which hashes diverged.
        frame: i32,
        /// The sender's own hash for `frame`.
        local_hash: u64,
        /// The conflicting hash the sender received for `frame`.
        remote_hash: u64,
    },
    /// A peer confirming it is ready to restart after a requested reset.
    RestartReady {
        /// The slot that is ready.
        slot: u8,
    },
    /// The coordinator's signal that every peer is ready; transition to the
    /// countdown presentation state.
    StartCountdown,
    /// Dev-only hot-reload broadcast naming the frame at which all peers
    /// should swap config tables. A no-op on builds without the
    /// `dev-reload` feature.
    GameDataReload {
        /// The frame at which the reload takes effect.
        target_frame: i32,
    },
}

impl Message {
    /// The wire discriminant byte for this message's variant. Stable across
    /// the lifetime of this format version; reordering variants below must
    /// not change these values.
    #[must_use]
    pub const fn discriminant(&self) -> u8 {
        match self {
            Self::Input { .. } => 0,
            Self::SyncCheck { .. } => 1,
            Self::DesyncNotify { .. } => 2,
            Self::RestartReady { .. } => 3,
            Self::StartCountdown => 4,
            Self::GameDataReload { .. } => 5,
        }
    }
}
