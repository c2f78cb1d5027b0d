// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire encoding for [`WorldSnapshot`] and the ring buffer that retains
//! recent snapshots for rollback.
//!
//! spec.md §6 describes the persisted format as a per-table column dump,
//! versioned and prefixed by `frame_number`/`session_seed`; it also notes
//! the format is "internal; not a stable file format". We keep the
//! externally-visible contract (version byte, frame/seed header, one entry
//! per table in a fixed order) but delegate the table bodies to
//! `ciborium`, the deterministic CBOR encoder our teacher's engine already
//! uses for this purpose — see `DESIGN.md`.

use outpost_core::world::{World, WorldSnapshot};

use crate::error::NetError;

/// Bumped whenever the on-wire layout of [`encode`]/[`decode`] changes.
const FORMAT_VERSION: u8 = 1;

/// Encodes `world`'s current state for frame `frame` under `session_seed`.
///
/// # Errors
/// Returns [`NetError::Encode`] if the CBOR body fails to serialize, which
/// only happens if a row type's `Serialize` impl itself fails (it doesn't,
/// for any type in `outpost_core::rows`).
pub fn encode(frame: i32, session_seed: i32, world: &World) -> Result<Vec<u8>, NetError> {
    let mut buf = Vec::with_capacity(4096);
    buf.push(FORMAT_VERSION);
    buf.extend_from_slice(&frame.to_le_bytes());
    buf.extend_from_slice(&session_seed.to_le_bytes());
    let body = world.to_snapshot();
    ciborium::into_writer(&body, &mut buf).map_err(|err| NetError::Encode(err.to_string()))?;
    Ok(buf)
}

/// Decodes bytes produced by [`encode`] back into `(frame, session_seed, WorldSnapshot)`.
///
/// # Errors
/// Returns [`NetError::Decode`] if the header is truncated, the version
/// byte is unrecognized, or the CBOR body doesn't parse.
pub fn decode(bytes: &[u8]) -> Result<(i32, i32, WorldSnapshot), NetError> {
    const HEADER_LEN: usize = 1 + 4 + 4;
    if bytes.len() < HEADER_LEN {
        return Err(NetError::Decode("snapshot shorter than header".to_string()));
    }
    let version = bytes[0];
    if version != FORMAT_VERSION {
        return Err(NetError::Decode(format!(
            "unsupported snapshot format version {version}"
        )));
    }
    let mut frame_bytes = [0u8; 4];
    frame_bytes.copy_from_slice(&bytes[1..5]);
    let mut seed_bytes = [0u8; 4];
    seed_bytes.copy_from_slice(&bytes[5..9]);
    let frame = i32::from_le_bytes(frame_bytes);
    let session_seed = i32::from_le_bytes(seed_bytes);
    let body: WorldSnapshot =
        ciborium::from_reader(&bytes[HEADER_LEN..]).map_err(|err| NetError::Decode(err.to_string()))?;
    Ok((frame, session_seed, body))
}

/// A circular buffer of `(frame, bytes)` pairs, the ring spec.md §4.12
/// calls "a circular buffer of N snapshots (default N = 8, covering
/// ~250 ms at 30 Hz)". Touched only by the main thread.
pub struct SnapshotRing {
    slots: Vec<Option<(i32, Vec<u8>)>>,
}

impl SnapshotRing {
    /// Builds a ring holding up to `capacity` snapshots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
        }
    }

    fn index(&self, frame: i32) -> usize {
        frame.rem_euclid(self.slots.len() as i32) as usize
    }

    /// Stores `bytes` as the snapshot for `frame`, evicting whatever
    /// previously occupied that ring slot.
    pub fn save(&mut self, frame: i32, bytes: Vec<u8>) {
        let index = self.index(frame);
        self.slots[index] = Some((frame, bytes));
    }

    /// Returns the bytes stored for `frame`, if that slot still holds data
    /// for exactly `frame` (the ring may have wrapped past it).
    #[must_use]
    pub fn try_restore(&self, frame: i32) -> Option<&[u8]> {
        let index = self.index(frame);
        self.slots[index]
            .as_ref()
            .filter(|(stored_frame, _)| *stored_frame == frame)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// The oldest frame number still guaranteed to be retrievable,
    /// for diagnostics in [`NetError::SnapshotMissing`].
    #[must_use]
    pub fn oldest_retained_frame(&self, current_frame: i32) -> i32 {
        (current_frame - self.slots.len() as i32 + 1).max(0)
    }

    /// The ring's fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_core::config::WorldConfig;

    #[test]
    fn encode_decode_roundtrips_frame_and_seed() {
        let world = World::new(WorldConfig::default());
        let bytes = encode(42, 7, &world).unwrap();
        let (frame, seed, _snapshot) = decode(&bytes).unwrap();
        assert_eq!(frame, 42);
        assert_eq!(seed, 7);
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let world = World::new(WorldConfig::default());
        let mut bytes = encode(1, 1, &world).unwrap();
        bytes[0] = 0xFF;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn ring_restores_only_most_recently_saved_frame_per_slot() {
        let mut ring = SnapshotRing::new(4);
        ring.save(0, vec![0]);
        ring.save(4, vec![4]);
        assert!(ring.try_restore(0).is_none());
        assert_eq!(ring.try_restore(4), Some(&[4][..]));
    }

    #[test]
    fn fresh_ring_has_no_snapshots() {
        let ring = SnapshotRing::new(8);
        assert!(ring.try_restore(0).is_none());
    }
}
