// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session-fatal error kinds. Unlike `outpost_core::error::SimError`, every
//! variant here ends the session: the tick loop's public entry point
//! returns `Result<TickOutcome, NetError>` and the caller is expected to
//! tear the session down on `Err`.

use thiserror::Error;

/// Errors that abort a rollback session.
#[derive(Debug, Error)]
pub enum NetError {
    /// Two peers reported different input values for the same
    /// `(frame, slot)`. This can only mean a protocol violation or a
    /// corrupted wire message; there is no recovery within the session.
    #[error("conflicting input for frame {frame}, slot {slot}")]
    InputProtocolMismatch {
        /// The frame the conflicting inputs were for.
        frame: i32,
        /// The player slot the conflicting inputs were for.
        slot: u8,
    },
    /// A rollback restore was requested for a frame no longer held by the
    /// snapshot ring.
    #[error("no snapshot held for frame {frame} (oldest retained is {oldest_retained})")]
    SnapshotMissing {
        /// The frame that was requested.
        frame: i32,
        /// The oldest frame still present in the ring, for diagnostics.
        oldest_retained: i32,
    },
    /// The desync detector latched a confirmed hash mismatch between peers.
    #[error("desync detected at frame {frame}: local hash {local_hash:016x} != remote hash {remote_hash:016x}")]
    DesyncDetected {
        /// The frame at which the hashes first diverged.
        frame: i32,
        /// This peer's own hash for `frame`.
        local_hash: u64,
        /// The hash the diverging peer reported for `frame`.
        remote_hash: u64,
    },
    /// Encoding a world snapshot into wire bytes failed.
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    /// Decoding wire bytes into a world snapshot failed.
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
}
