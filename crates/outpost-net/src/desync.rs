// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Confirmed-frame hashing and first-mismatch desync detection.
//!
//! Every tick, once a frame's input is confirmed by every peer, its
//! serialized snapshot is hashed and compared against the same frame's hash
//! from every other peer. The first mismatch latches: the detector never
//! un-latches for the rest of the session, matching spec.md §4.13's
//! "subsequent ticks are no-ops for the detector".

use std::collections::HashMap;
use std::sync::mpsc::RecvTimeoutError;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use outpost_core::scheduler::SystemScheduler;
use outpost_core::world::World;

use crate::error::NetError;
use crate::snapshot;
use crate::wire::Message;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A 64-bit FNV-1a hash, the algorithm spec.md §4.13 names for sync-check
/// and desync comparison. Not cryptographic; chosen for speed and
/// cross-platform determinism over raw bytes.
#[must_use]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The frame and hashes recorded the moment two peers' confirmed state first
/// diverged. Latched: only the first disagreement is ever recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DesyncEvent {
    /// The frame at which the mismatch was observed.
    pub frame: i32,
    /// This peer's own hash for `frame`.
    pub local_hash: u64,
    /// The remote slot that reported the conflicting hash.
    pub remote_slot: u8,
    /// The conflicting hash reported by `remote_slot`.
    pub remote_hash: u64,
}

/// One entry in a per-system divergence trace, produced only by
/// [`DesyncDetector::export_trace`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemHashSample {
    /// The name of the system that just ran.
    pub system: &'static str,
    /// The world hash immediately after that system ran.
    pub hash: u64,
}

/// A completed per-system divergence trace: the desync frame plus the hash
/// recorded after each system ran during its re-simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesyncTrace {
    /// The frame that was re-simulated.
    pub frame: i32,
    /// One sample per system, in run order.
    pub samples: Vec<SystemHashSample>,
}

impl DesyncTrace {
    /// The name of the first system in this trace whose hash differs from
    /// the corresponding sample in `other`, if any. `None` means every
    /// sample matched (the trace itself did not reproduce the divergence,
    /// which is itself diagnostically interesting but is reported by the
    /// caller, not here).
    #[must_use]
    pub fn first_divergence<'a>(&'a self, other: &DesyncTrace) -> Option<&'a str> {
        self.samples
            .iter()
            .zip(other.samples.iter())
            .find(|(a, b)| a.hash != b.hash)
            .map(|(a, _)| a.system)
    }
}

/// A unit of work submitted to the background validator: a frame number
/// plus a rented buffer holding that frame's serialized snapshot bytes.
struct HashJob {
    frame: i32,
    bytes: Vec<u8>,
}

/// A computed hash handed back by the validator, ready to go out as a
/// `SyncCheck` on the next tick.
struct HashResult {
    frame: i32,
    hash: u64,
    /// The buffer is handed back so the caller can return it to its pool
    /// instead of allocating a fresh one for the next job.
    bytes: Vec<u8>,
}

/// Runs confirmed-frame hashing on a dedicated worker thread so the main
/// tick loop never blocks on it. Never touches the live simulation world —
/// only byte blobs of already-confirmed snapshots, per spec.md §5.
struct Validator {
    jobs_tx: Sender<HashJob>,
    results_rx: Receiver<HashResult>,
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Validator {
    fn spawn(queue_capacity: usize) -> Self {
        let (jobs_tx, jobs_rx) = crossbeam_channel::bounded::<HashJob>(queue_capacity);
        let (results_tx, results_rx) = crossbeam_channel::bounded::<HashResult>(queue_capacity);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("outpost-desync-validator".to_string())
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(jobs_rx) -> job => {
                        match job {
                            Ok(job) => {
                                let hash = fnv1a_64(&job.bytes);
                                let result = HashResult { frame: job.frame, hash, bytes: job.bytes };
                                // The main thread may have stopped polling; dropping
                                // a stale result is harmless.
                                let _ = results_tx.send(result);
                            }
                            Err(_) => break,
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            })
            .map(Some)
            .unwrap_or_else(|_| {
                tracing::error!("failed to spawn desync validator thread");
                None
            });

        Self {
            jobs_tx,
            results_rx,
            shutdown_tx,
            handle,
        }
    }

    fn submit(&self, frame: i32, bytes: Vec<u8>) {
        match self.jobs_tx.try_send(HashJob { frame, bytes }) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(frame = job.frame, "desync validator queue full, dropping job");
            }
        }
    }

    fn drain_results(&self) -> Vec<(i32, u64)> {
        self.results_rx
            .try_iter()
            .map(|result| (result.frame, result.hash))
            .collect()
    }

    fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            // Cooperative shutdown with a bounded wait, per spec.md §5's 2s join timeout.
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            let waiter = std::thread::spawn(move || {
                let _ = handle.join();
                let _ = done_tx.send(());
            });
            match done_rx.recv_timeout(Duration::from_secs(2)) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) => {
                    tracing::error!("desync validator did not shut down within 2s");
                }
            }
            drop(waiter);
        }
    }
}

impl Drop for Validator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Confirmed-frame hash comparison and first-mismatch latch.
pub struct DesyncDetector {
    local_hashes: HashMap<i32, u64>,
    pending_remote: HashMap<i32, (u8, u64)>,
    detected: Option<DesyncEvent>,
    validator: Option<Validator>,
    pending_sync_checks: Vec<(i32, u64)>,
    notify_pending: bool,
    pending_export_frame: Option<i32>,
}

impl DesyncDetector {
    /// Builds a detector with a background validator thread whose queue
    /// holds up to `queue_capacity` pending jobs/results.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            local_hashes: HashMap::new(),
            pending_remote: HashMap::new(),
            detected: None,
            validator: Some(Validator::spawn(queue_capacity)),
            pending_sync_checks: Vec::new(),
            notify_pending: false,
            pending_export_frame: None,
        }
    }

    /// Builds a detector with no background thread; all hashing happens
    /// inline on the caller. Suited to latency-sensitive small snapshots or
    /// to tests that want fully synchronous behavior.
    #[must_use]
    pub fn new_inline() -> Self {
        Self {
            local_hashes: HashMap::new(),
            pending_remote: HashMap::new(),
            detected: None,
            validator: None,
            pending_sync_checks: Vec::new(),
            notify_pending: false,
            pending_export_frame: None,
        }
    }

    /// Returns the latched desync event, if any has occurred this session.
    #[must_use]
    pub const fn detected(&self) -> Option<&DesyncEvent> {
        self.detected.as_ref()
    }

    /// Submits `frame`'s serialized snapshot bytes for hashing. Uses the
    /// background validator if one is running, otherwise hashes inline.
    /// Once latched, this is a no-op: per spec.md §4.13, "subsequent ticks
    /// are no-ops for the detector".
    pub fn submit_local(&mut self, frame: i32, bytes: Vec<u8>) {
        if self.detected.is_some() {
            return;
        }
        match &self.validator {
            Some(validator) => validator.submit(frame, bytes),
            None => {
                let hash = fnv1a_64(&bytes);
                self.record_local_hash(frame, hash);
            }
        }
    }

    /// Pulls any hashes the background validator has finished computing
    /// since the last call and folds them into the local-hash map, checking
    /// each against any already-stashed remote hash for that frame.
    pub fn poll_validator(&mut self) {
        if self.detected.is_some() {
            return;
        }
        let Some(validator) = &self.validator else {
            return;
        };
        for (frame, hash) in validator.drain_results() {
            self.record_local_hash(frame, hash);
            if self.detected.is_some() {
                return;
            }
        }
    }

    fn record_local_hash(&mut self, frame: i32, hash: u64) {
        if self.detected.is_some() {
            return;
        }
        self.local_hashes.insert(frame, hash);
        self.pending_sync_checks.push((frame, hash));
        if let Some((remote_slot, remote_hash)) = self.pending_remote.remove(&frame) {
            self.compare(frame, hash, remote_slot, remote_hash);
        }
    }

    /// Drains every confirmed-frame hash recorded since the last call, as
    /// outgoing [`Message::SyncCheck`]s for `local_slot` to broadcast. Per
    /// spec.md §4.13, every confirmed frame's hash goes out to peers, not
    /// just the ones a caller happens to compare locally.
    #[must_use]
    pub fn drain_outgoing_sync_checks(&mut self, local_slot: u8) -> Vec<Message> {
        self.pending_sync_checks
            .drain(..)
            .map(|(frame, hash)| Message::SyncCheck { slot: local_slot, frame, hash })
            .collect()
    }

    /// Records a remote peer's reported hash for `frame`. If the local hash
    /// for that frame is already known, compares immediately; otherwise
    /// stashes it until [`DesyncDetector::submit_local`]/
    /// [`DesyncDetector::poll_validator`] supplies the local side.
    pub fn record_remote_hash(&mut self, remote_slot: u8, frame: i32, remote_hash: u64) {
        if self.detected.is_some() {
            return;
        }
        if let Some(&local_hash) = self.local_hashes.get(&frame) {
            self.compare(frame, local_hash, remote_slot, remote_hash);
        } else {
            self.pending_remote.insert(frame, (remote_slot, remote_hash));
        }
    }

    fn compare(&mut self, frame: i32, local_hash: u64, remote_slot: u8, remote_hash: u64) {
        if local_hash != remote_hash {
            tracing::error!(frame, local_hash, remote_hash, remote_slot, "desync detected");
            self.detected = Some(DesyncEvent {
                frame,
                local_hash,
                remote_slot,
                remote_hash,
            });
            self.notify_pending = true;
            self.pending_export_frame = Some(frame);
        }
    }

    /// Returns the [`Message::DesyncNotify`] to broadcast, exactly once, the
    /// tick after this detector's first mismatch latches. `None` before
    /// latching and on every call after the first.
    #[must_use]
    pub fn take_pending_notify(&mut self, local_slot: u8) -> Option<Message> {
        if !self.notify_pending {
            return None;
        }
        self.notify_pending = false;
        let event = self.detected?;
        Some(Message::DesyncNotify {
            slot: local_slot,
            frame: event.frame,
            local_hash: event.local_hash,
            remote_hash: event.remote_hash,
        })
    }

    /// The frame awaiting a divergence-trace export, queued once on first
    /// latch per spec.md §7's "queue an export handed off to the main
    /// thread" — [`DesyncDetector::export_trace`] needs a `World` and
    /// `SystemScheduler` this detector doesn't own. Taken exactly once.
    #[must_use]
    pub fn take_pending_export_frame(&mut self) -> Option<i32> {
        self.pending_export_frame.take()
    }

    /// Re-simulates `frame` from the snapshot captured at `frame - 1`,
    /// hashing the world after each system runs. Used only on export, after
    /// [`DesyncDetector::detected`] has latched, to pinpoint the first
    /// system whose output diverged between peers.
    pub fn export_trace(
        pre_frame_snapshot: &[u8],
        scheduler: &mut SystemScheduler,
        world: &mut World,
        session_seed: i32,
        tick_rate_hz: u32,
    ) -> Result<DesyncTrace, NetError> {
        let (frame, seed, body) = snapshot::decode(pre_frame_snapshot)?;
        debug_assert_eq!(seed, session_seed, "export trace replayed with a different seed");
        world.restore_from_snapshot(body);
        scheduler.set_current_frame(frame);

        let mut samples = Vec::new();
        scheduler.tick_with_trace(world, session_seed, tick_rate_hz, |name, world_after| {
            let bytes = snapshot::encode(frame + 1, session_seed, world_after)
                .unwrap_or_default();
            samples.push(SystemHashSample {
                system: name,
                hash: fnv1a_64(&bytes),
            });
        });

        Ok(DesyncTrace {
            frame: frame + 1,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_is_stable_for_known_input() {
        // FNV-1a of the empty string is the offset basis.
        assert_eq!(fnv1a_64(&[]), FNV_OFFSET_BASIS);
    }

    #[test]
    fn matching_hashes_do_not_latch() {
        let mut detector = DesyncDetector::new_inline();
        detector.submit_local(10, vec![1, 2, 3]);
        let hash = fnv1a_64(&[1, 2, 3]);
        detector.record_remote_hash(1, 10, hash);
        assert!(detector.detected().is_none());
    }

    #[test]
    fn mismatched_hashes_latch_on_first_disagreement() {
        let mut detector = DesyncDetector::new_inline();
        detector.submit_local(10, vec![1, 2, 3]);
        detector.record_remote_hash(1, 10, 0xDEAD_BEEF);
        let event = detector.detected().expect("desync should have latched");
        assert_eq!(event.frame, 10);
        assert_eq!(event.remote_slot, 1);
        assert_eq!(event.remote_hash, 0xDEAD_BEEF);
    }

    #[test]
    fn remote_hash_arriving_before_local_is_stashed_then_compared() {
        let mut detector = DesyncDetector::new_inline();
        detector.record_remote_hash(2, 7, 0xABCD);
        assert!(detector.detected().is_none());
        detector.submit_local(7, vec![9, 9, 9]);
        let event = detector.detected().expect("stashed remote hash should now compare");
        assert_eq!(event.frame, 7);
    }

    #[test]
    fn drain_outgoing_sync_checks_surfaces_every_confirmed_local_hash() {
        let mut detector = DesyncDetector::new_inline();
        detector.submit_local(10, vec![1, 2, 3]);
        detector.submit_local(11, vec![4, 5, 6]);

        let messages = detector.drain_outgoing_sync_checks(2);
        assert_eq!(
            messages,
            vec![
                Message::SyncCheck { slot: 2, frame: 10, hash: fnv1a_64(&[1, 2, 3]) },
                Message::SyncCheck { slot: 2, frame: 11, hash: fnv1a_64(&[4, 5, 6]) },
            ]
        );

        // Already drained: a second call with nothing new queued is empty.
        assert!(detector.drain_outgoing_sync_checks(2).is_empty());
    }

    #[test]
    fn mismatch_queues_a_desync_notify_and_an_export_request_exactly_once() {
        let mut detector = DesyncDetector::new_inline();
        detector.submit_local(10, vec![1, 2, 3]);
        detector.record_remote_hash(1, 10, 0xDEAD_BEEF);

        assert_eq!(detector.take_pending_export_frame(), Some(10));
        assert_eq!(detector.take_pending_export_frame(), None);

        let notify = detector.take_pending_notify(0).expect("first latch should queue a notify");
        assert_eq!(
            notify,
            Message::DesyncNotify {
                slot: 0,
                frame: 10,
                local_hash: fnv1a_64(&[1, 2, 3]),
                remote_hash: 0xDEAD_BEEF,
            }
        );
        assert_eq!(detector.take_pending_notify(0), None);
    }

    #[test]
    fn latch_is_sticky_and_ignores_further_mismatches() {
        let mut detector = DesyncDetector::new_inline();
        detector.submit_local(1, vec![1]);
        detector.record_remote_hash(1, 1, 0xBAD);
        let first = *detector.detected().expect("first mismatch should latch");

        detector.submit_local(2, vec![2]);
        detector.record_remote_hash(1, 2, 0xBAD_AGAIN);
        assert_eq!(detector.detected(), Some(&first));
    }
}
