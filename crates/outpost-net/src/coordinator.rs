// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Coordinator election and restart coordination (spec.md §4.12).
//!
//! A single peer is "coordinator" at any time: initially slot 0, then the
//! lowest connected slot on disconnect. The coordinator owns restart-seed
//! generation and any other single-writer task; every peer, coordinator or
//! not, runs the same election rule, so there is never a ballot to hold.

use crate::wire::Message;

/// Whether the local peer currently holds the single-writer role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRole {
    /// This peer is the coordinator.
    Coordinator,
    /// This peer defers to the coordinator for single-writer tasks.
    Peer,
}

/// Tracks coordinator election and the ready/restart handshake across a
/// fixed roster of player slots.
pub struct RestartCoordinator {
    local_slot: u8,
    connected: Vec<bool>,
    ready: Vec<bool>,
    coordinator_slot: u8,
    session_seed: i32,
}

impl RestartCoordinator {
    /// Builds a coordinator tracker for `max_players` slots, with slot 0
    /// coordinator by construction (spec.md §4.12: "Initially slot 0 is
    /// coordinator").
    #[must_use]
    pub fn new(local_slot: u8, max_players: u8, session_seed: i32) -> Self {
        let mut connected = vec![false; max_players as usize];
        connected[local_slot as usize] = true;
        Self {
            local_slot,
            connected,
            ready: vec![false; max_players as usize],
            coordinator_slot: 0,
            session_seed,
        }
    }

    /// This peer's current role.
    #[must_use]
    pub fn role(&self) -> SessionRole {
        if self.coordinator_slot == self.local_slot {
            SessionRole::Coordinator
        } else {
            SessionRole::Peer
        }
    }

    /// The slot currently elected as coordinator.
    #[must_use]
    pub const fn coordinator_slot(&self) -> u8 {
        self.coordinator_slot
    }

    /// The session seed currently in effect.
    #[must_use]
    pub const fn session_seed(&self) -> i32 {
        self.session_seed
    }

    /// Marks `slot`'s connection state, re-electing a coordinator ("lowest
    /// connected slot") if the outgoing coordinator just disconnected.
    pub fn set_connected(&mut self, slot: u8, connected: bool) {
        self.connected[slot as usize] = connected;
        if !connected && slot == self.coordinator_slot {
            self.elect_new_coordinator();
        }
    }

    fn elect_new_coordinator(&mut self) {
        self.coordinator_slot = self
            .connected
            .iter()
            .position(|&is_connected| is_connected)
            .map_or(self.local_slot, |index| index as u8);
    }

    /// Coordinator-only: starts a restart with a freshly generated seed,
    /// clearing every peer's ready bit and marking this peer ready.
    /// Returns `None` if called on a non-coordinator peer — the caller
    /// should only invoke this in response to a local "restart" request
    /// while holding the coordinator role.
    pub fn begin_restart(&mut self, new_seed: i32) -> Option<Message> {
        if self.role() != SessionRole::Coordinator {
            return None;
        }
        self.session_seed = new_seed;
        self.ready.iter_mut().for_each(|is_ready| *is_ready = false);
        self.ready[self.local_slot as usize] = true;
        Some(Message::RestartReady {
            slot: self.local_slot,
        })
    }

    /// Records that `slot` sent `RestartReady`. If every connected slot is
    /// now ready and this peer is the coordinator, returns the
    /// `StartCountdown` broadcast.
    pub fn mark_ready(&mut self, slot: u8) -> Option<Message> {
        self.ready[slot as usize] = true;
        if self.role() == SessionRole::Coordinator && self.all_connected_ready() {
            Some(Message::StartCountdown)
        } else {
            None
        }
    }

    fn all_connected_ready(&self) -> bool {
        self.connected
            .iter()
            .zip(self.ready.iter())
            .all(|(&is_connected, &is_ready)| !is_connected || is_ready)
    }
}
