// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A dense `(frame, player_slot)` ring of received/predicted input.
//!
//! Per spec.md §5: "the input buffer accepts enqueues from the network
//! callback (on the network thread) and reads from the main thread". Each
//! cell is a [`crossbeam_utils::atomic::AtomicCell`], which gives us the
//! same lock-free single-writer/single-reader-per-cell contract the spec
//! asks for (a present flag published with a release store, read with
//! acquire) without reaching for `unsafe`.

use crossbeam_utils::atomic::AtomicCell;

use crate::error::NetError;

#[derive(Clone, Copy)]
struct Entry<Input> {
    frame: i32,
    value: Input,
    confirmed: bool,
}

/// The outcome of [`MultiPlayerInputBuffer::enqueue_input`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputWrite {
    /// No prior entry existed at this `(frame, slot)`; the value was stored.
    Fresh,
    /// An identical value was already stored; this call was a no-op.
    Unchanged,
    /// A predicted value was already stored and has now been overridden by
    /// a confirmed one. The caller must treat this as "resimulate from
    /// `frame` forward" per spec.md §4.12 step 4.
    RetroactiveOverride,
}

/// A dense 2D ring of input, indexed by `(frame, player_slot)`.
pub struct MultiPlayerInputBuffer<Input> {
    cells: Vec<AtomicCell<Option<Entry<Input>>>>,
    capacity_frames: usize,
    max_players: usize,
}

impl<Input: Copy + PartialEq> MultiPlayerInputBuffer<Input> {
    /// Builds a buffer holding `capacity_frames` frames of input for up to
    /// `max_players` players.
    #[must_use]
    pub fn new(capacity_frames: usize, max_players: usize) -> Self {
        let mut cells = Vec::with_capacity(capacity_frames * max_players);
        for _ in 0..(capacity_frames * max_players) {
            cells.push(AtomicCell::new(None));
        }
        Self {
            cells,
            capacity_frames,
            max_players,
        }
    }

    fn index(&self, frame: i32, slot: u8) -> usize {
        let row = frame.rem_euclid(self.capacity_frames as i32) as usize;
        row * self.max_players + slot as usize
    }

    /// Returns `true` if a value is currently stored for `(frame, slot)`.
    #[must_use]
    pub fn has_input(&self, frame: i32, slot: u8) -> bool {
        self.get_input(frame, slot).is_some()
    }

    /// Returns the stored value for `(frame, slot)`, if any. A cell whose
    /// stored frame doesn't match `frame` (the ring has wrapped past it) is
    /// treated as absent.
    #[must_use]
    pub fn get_input(&self, frame: i32, slot: u8) -> Option<Input> {
        let entry = self.cells[self.index(frame, slot)].load()?;
        (entry.frame == frame).then_some(entry.value)
    }

    /// Returns `true` if the stored value for `(frame, slot)` is a confirmed
    /// (not predicted) input.
    #[must_use]
    pub fn is_confirmed(&self, frame: i32, slot: u8) -> bool {
        self.cells[self.index(frame, slot)]
            .load()
            .is_some_and(|entry| entry.frame == frame && entry.confirmed)
    }

    /// Stores `value` for `(frame, slot)`.
    ///
    /// Idempotent: a duplicate insert of a bit-identical value is a no-op.
    /// A confirmed value may replace a previously predicted one for the
    /// same frame (the normal "retroactive correction" path); two
    /// *confirmed* values that disagree are a protocol error.
    pub fn enqueue_input(
        &self,
        frame: i32,
        slot: u8,
        value: Input,
        confirmed: bool,
    ) -> Result<InputWrite, NetError> {
        let index = self.index(frame, slot);
        let cell = &self.cells[index];
        let existing = cell.load().filter(|entry| entry.frame == frame);

        let outcome = match existing {
            None => InputWrite::Fresh,
            Some(entry) if entry.value == value => InputWrite::Unchanged,
            Some(entry) if !entry.confirmed => InputWrite::RetroactiveOverride,
            Some(_) => {
                return Err(NetError::InputProtocolMismatch { frame, slot });
            }
        };

        cell.store(Some(Entry { frame, value, confirmed }));
        Ok(outcome)
    }

    /// The number of frames this buffer can hold before wrapping.
    #[must_use]
    pub const fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_insert_then_identical_reinsert_is_idempotent() {
        let buf: MultiPlayerInputBuffer<u32> = MultiPlayerInputBuffer::new(16, 4);
        assert_eq!(buf.enqueue_input(5, 0, 42, true).unwrap(), InputWrite::Fresh);
        assert_eq!(buf.enqueue_input(5, 0, 42, true).unwrap(), InputWrite::Unchanged);
        assert_eq!(buf.get_input(5, 0), Some(42));
    }

    #[test]
    fn predicted_value_can_be_overridden_by_confirmed() {
        let buf: MultiPlayerInputBuffer<u32> = MultiPlayerInputBuffer::new(16, 4);
        buf.enqueue_input(5, 1, 1, false).unwrap();
        assert!(!buf.is_confirmed(5, 1));

        let outcome = buf.enqueue_input(5, 1, 2, true).unwrap();
        assert_eq!(outcome, InputWrite::RetroactiveOverride);
        assert_eq!(buf.get_input(5, 1), Some(2));
        assert!(buf.is_confirmed(5, 1));
    }

    #[test]
    fn conflicting_confirmed_values_are_a_protocol_error() {
        let buf: MultiPlayerInputBuffer<u32> = MultiPlayerInputBuffer::new(16, 4);
        buf.enqueue_input(5, 2, 10, true).unwrap();
        let err = buf.enqueue_input(5, 2, 11, true).unwrap_err();
        assert!(matches!(
            err,
            NetError::InputProtocolMismatch { frame: 5, slot: 2 }
        ));
    }

    #[test]
    fn wrapped_frame_reads_as_absent() {
        let buf: MultiPlayerInputBuffer<u32> = MultiPlayerInputBuffer::new(4, 2);
        buf.enqueue_input(0, 0, 7, true).unwrap();
        assert!(buf.has_input(0, 0));
        // Frame 4 lands on the same ring row as frame 0.
        assert!(!buf.has_input(4, 0));
        buf.enqueue_input(4, 0, 8, true).unwrap();
        assert!(!buf.has_input(0, 0));
        assert_eq!(buf.get_input(4, 0), Some(8));
    }
}
