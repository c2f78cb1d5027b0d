// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The rollback session: drains input, stalls when too far ahead of
//! confirmed state, resimulates on misprediction, and otherwise advances
//! `outpost-core`'s `World` one frame at a time (spec.md §4.12).

use outpost_core::config::WorldConfig;
use outpost_core::lifecycle::PlacementRequest;
use outpost_core::math::Fixed64;
use outpost_core::rows::{MoveCommand, MAX_PLAYERS};
use outpost_core::scheduler::SystemScheduler;
use outpost_core::world::World;

use crate::coordinator::RestartCoordinator;
use crate::desync::{DesyncDetector, DesyncTrace};
use crate::error::NetError;
use crate::input::GameInput;
use crate::input_buffer::MultiPlayerInputBuffer;
use crate::snapshot::{self, SnapshotRing};
use crate::wire::{Message, TimestampedInput, MAX_REDUNDANT_FRAMES};

/// What happened during one call to [`RollbackSession::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The sim was more than `rollback_max_frames_ahead_of_confirmed` frames
    /// ahead of the oldest unconfirmed input; no frame advanced.
    Stalled,
    /// A frame advanced normally; no correction was needed this tick.
    Advanced {
        /// The frame number that was just simulated.
        frame: i32,
    },
    /// A misprediction was detected: frames `resimulated_from..frame` were
    /// replayed from a prior snapshot with corrected input before `frame`
    /// itself advanced.
    Corrected {
        /// The first frame that had to be replayed.
        resimulated_from: i32,
        /// The frame number that was just (re-)simulated.
        frame: i32,
    },
}

/// Drives a deterministic [`World`] under rollback netcode: buffers input
/// per `(frame, slot)`, predicts absent input by repeating the last known
/// value, and resimulates from the first retroactively-corrected frame
/// whenever a prediction turns out to have been wrong.
pub struct RollbackSession {
    world: World,
    scheduler: SystemScheduler,
    tick_rate_hz: u32,
    session_seed: i32,
    local_slot: u8,
    max_players: u8,
    max_frames_ahead: i32,

    input_buffer: MultiPlayerInputBuffer<GameInput>,
    last_known_input: Vec<GameInput>,
    confirmed_through: Vec<i32>,
    connected: Vec<bool>,
    pending_retro_floor: Option<i32>,

    snapshots: SnapshotRing,

    /// Confirmed-frame hash comparison; public so callers can poll
    /// [`DesyncDetector::detected`] directly if they need more than
    /// [`RollbackSession::drain_outgoing_messages`] surfaces.
    pub desync: DesyncDetector,
    /// Coordinator election and restart handshake state.
    pub coordinator: RestartCoordinator,
}

impl RollbackSession {
    /// Builds a session for `local_slot` out of `max_players` possible
    /// slots, driving `world` under `config`'s rollback parameters.
    #[must_use]
    pub fn new(world: World, config: &WorldConfig, local_slot: u8, max_players: u8, session_seed: i32) -> Self {
        let max_players = max_players.max(1).min(MAX_PLAYERS as u8);
        let mut connected = vec![false; max_players as usize];
        connected[local_slot as usize] = true;

        let mut scheduler = SystemScheduler::new();
        outpost_core::systems::register_all(&mut scheduler);

        // Frame -1 is the pristine, pre-simulation world: the anchor a
        // misprediction of frame 0 itself resimulates from.
        let mut snapshots = SnapshotRing::new(config.rollback_snapshot_ring_capacity);
        let initial_bytes = snapshot::encode(-1, session_seed, &world).unwrap_or_default();
        snapshots.save(-1, initial_bytes);

        Self {
            world,
            scheduler,
            tick_rate_hz: config.tick_rate_hz,
            session_seed,
            local_slot,
            max_players,
            max_frames_ahead: config.rollback_max_frames_ahead_of_confirmed,
            input_buffer: MultiPlayerInputBuffer::new(
                config.rollback_snapshot_ring_capacity.max(64),
                max_players as usize,
            ),
            last_known_input: vec![GameInput::default(); max_players as usize],
            confirmed_through: vec![-1; max_players as usize],
            connected,
            pending_retro_floor: None,
            snapshots,
            desync: DesyncDetector::new(32),
            coordinator: RestartCoordinator::new(local_slot, max_players, session_seed),
        }
    }

    /// The frame about to be (or currently being) simulated.
    #[must_use]
    pub fn current_frame(&self) -> i32 {
        self.scheduler.current_frame()
    }

    /// Read-only access to the driven world, e.g. for a presentation layer
    /// to render the latest confirmed/predicted state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Marks `slot`'s connection state, updating both confirmation tracking
    /// and coordinator election.
    pub fn set_connected(&mut self, slot: u8, connected: bool) {
        self.connected[slot as usize] = connected;
        self.coordinator.set_connected(slot, connected);
    }

    /// Enqueues the local player's input for the current frame, as
    /// confirmed (we always know our own input immediately).
    ///
    /// # Errors
    /// Returns [`NetError::InputProtocolMismatch`] only if called twice for
    /// the same frame with two different values, which indicates a caller
    /// bug.
    pub fn submit_local_input(&mut self, input: GameInput) -> Result<(), NetError> {
        let frame = self.scheduler.current_frame();
        self.input_buffer
            .enqueue_input(frame, self.local_slot, input, true)?;
        self.last_known_input[self.local_slot as usize] = input;
        self.advance_confirmed(self.local_slot);
        Ok(())
    }

    /// Builds the redundant `Input` packet to send for the local player's
    /// `current_frame`, per spec.md §4.12: the current frame plus up to
    /// [`MAX_REDUNDANT_FRAMES`] previous contiguous frames, newest first.
    /// Walking backward stops at the first gap in the local buffer, so a
    /// caller who has only just joined (and has no history yet) still gets a
    /// valid one-frame packet.
    #[must_use]
    pub fn build_input_packet(&self, current_frame: i32) -> Message {
        let mut frames = Vec::with_capacity(MAX_REDUNDANT_FRAMES + 1);
        for frame in (current_frame - MAX_REDUNDANT_FRAMES as i32..=current_frame).rev() {
            let Some(input) = self.input_buffer.get_input(frame, self.local_slot) else {
                break;
            };
            frames.push(TimestampedInput { frame, input });
        }
        Message::Input { sender_slot: self.local_slot, frames }
    }

    /// Processes one incoming wire message, returning a message to
    /// broadcast in response, if any (e.g. `StartCountdown` once every peer
    /// has sent `RestartReady`).
    ///
    /// # Errors
    /// Returns [`NetError::InputProtocolMismatch`] if an `Input` message
    /// disagrees with an already-confirmed value for the same
    /// `(frame, slot)`.
    pub fn receive_message(&mut self, message: Message) -> Result<Option<Message>, NetError> {
        match message {
            Message::Input { sender_slot, frames } => {
                for timestamped in frames {
                    let outcome = self.input_buffer.enqueue_input(
                        timestamped.frame,
                        sender_slot,
                        timestamped.input,
                        true,
                    )?;
                    if outcome == crate::input_buffer::InputWrite::RetroactiveOverride {
                        self.pending_retro_floor = Some(
                            self.pending_retro_floor
                                .map_or(timestamped.frame, |floor| floor.min(timestamped.frame)),
                        );
                    }
                    self.last_known_input[sender_slot as usize] = timestamped.input;
                }
                self.advance_confirmed(sender_slot);
                Ok(None)
            }
            Message::SyncCheck { slot, frame, hash } => {
                self.desync.record_remote_hash(slot, frame, hash);
                Ok(None)
            }
            Message::DesyncNotify { slot, frame, local_hash, remote_hash } => {
                tracing::error!(slot, frame, local_hash, remote_hash, "peer reported desync");
                Ok(None)
            }
            Message::RestartReady { slot } => Ok(self.coordinator.mark_ready(slot)),
            Message::StartCountdown => {
                self.reset_for_seed(self.coordinator.session_seed());
                Ok(None)
            }
            Message::GameDataReload { .. } => Ok(None),
        }
    }

    fn advance_confirmed(&mut self, slot: u8) {
        let index = slot as usize;
        let mut frame = self.confirmed_through[index] + 1;
        while self.input_buffer.is_confirmed(frame, slot) {
            self.confirmed_through[index] = frame;
            frame += 1;
        }
    }

    fn oldest_unconfirmed(&self) -> i32 {
        self.connected
            .iter()
            .enumerate()
            .filter(|(_, &is_connected)| is_connected)
            .map(|(slot, _)| self.confirmed_through[slot] + 1)
            .min()
            .unwrap_or_else(|| self.scheduler.current_frame())
    }

    /// Advances the session by one logical tick: drains no new input itself
    /// (callers feed input via [`RollbackSession::submit_local_input`] and
    /// [`RollbackSession::receive_message`] as it arrives), stalls if too
    /// far ahead of confirmed state, resimulates from the earliest
    /// retroactively-corrected frame if one is pending, then simulates the
    /// current frame.
    ///
    /// # Errors
    /// Returns [`NetError::SnapshotMissing`] if a pending correction needs a
    /// snapshot the ring no longer holds, or any encode/decode error from
    /// the snapshot codec.
    pub fn tick(&mut self) -> Result<TickOutcome, NetError> {
        let frame_before_correction = self.scheduler.current_frame();
        let oldest_unconfirmed = self.oldest_unconfirmed();
        if frame_before_correction - oldest_unconfirmed + 1 > self.max_frames_ahead {
            return Ok(TickOutcome::Stalled);
        }

        let resimulated_from = match self.pending_retro_floor.take() {
            Some(floor) => {
                self.resimulate_from(floor, frame_before_correction)?;
                Some(floor)
            }
            None => None,
        };

        let frame = self.scheduler.current_frame();
        self.simulate_one_frame()?;
        self.desync.poll_validator();

        Ok(match resimulated_from {
            Some(from) => TickOutcome::Corrected { resimulated_from: from, frame },
            None => TickOutcome::Advanced { frame },
        })
    }

    /// Drains every message this session needs to broadcast since the last
    /// call: one [`Message::SyncCheck`] per confirmed-frame hash computed
    /// this tick, plus a [`Message::DesyncNotify`] the tick this session's
    /// desync detector first latches. Callers should call this once per
    /// tick, after [`RollbackSession::tick`], and send whatever comes back
    /// to every peer.
    #[must_use]
    pub fn drain_outgoing_messages(&mut self) -> Vec<Message> {
        let mut messages = self.desync.drain_outgoing_sync_checks(self.local_slot);
        if let Some(notify) = self.desync.take_pending_notify(self.local_slot) {
            messages.push(notify);
        }
        messages
    }

    /// The frame awaiting a divergence-trace export, if this session's
    /// desync detector just latched. `None` otherwise, and on every call
    /// after the first following a latch.
    #[must_use]
    pub fn take_desync_export_request(&mut self) -> Option<i32> {
        self.desync.take_pending_export_frame()
    }

    /// Re-simulates `frame` from its prior snapshot, producing a per-system
    /// hash trace for diagnosing exactly where a desync diverged. Intended
    /// to be called once, after [`RollbackSession::take_desync_export_request`]
    /// returns a frame; it overwrites this session's own world and scheduler
    /// state, which is fine only because by this point the session is
    /// already desynced and is being torn down for diagnosis.
    ///
    /// # Errors
    /// Returns [`NetError::SnapshotMissing`] if the ring no longer holds the
    /// snapshot just before `frame`, or any decode error from the snapshot
    /// codec.
    pub fn export_desync_trace(&mut self, frame: i32) -> Result<DesyncTrace, NetError> {
        let oldest_retained = self.snapshots.oldest_retained_frame(frame);
        let pre_bytes = self
            .snapshots
            .try_restore(frame - 1)
            .ok_or(NetError::SnapshotMissing { frame: frame - 1, oldest_retained })?
            .to_vec();
        DesyncDetector::export_trace(
            &pre_bytes,
            &mut self.scheduler,
            &mut self.world,
            self.session_seed,
            self.tick_rate_hz,
        )
    }

    fn resimulate_from(&mut self, floor: i32, stop_before: i32) -> Result<(), NetError> {
        let oldest_retained = self.snapshots.oldest_retained_frame(stop_before);
        let pre_bytes = self
            .snapshots
            .try_restore(floor - 1)
            .ok_or(NetError::SnapshotMissing { frame: floor - 1, oldest_retained })?
            .to_vec();
        let (_, _, body) = snapshot::decode(&pre_bytes)?;
        self.world.restore_from_snapshot(body);
        self.scheduler.set_current_frame(floor);

        while self.scheduler.current_frame() < stop_before {
            self.simulate_one_frame()?;
        }
        Ok(())
    }

    fn simulate_one_frame(&mut self) -> Result<(), NetError> {
        let frame = self.scheduler.current_frame();
        for slot in 0..self.max_players {
            let input = self.resolve_input(frame, slot);
            apply_input(&mut self.world, frame, slot, &input);
        }

        self.scheduler.tick(&mut self.world, self.session_seed, self.tick_rate_hz);

        let bytes = snapshot::encode(frame, self.session_seed, &self.world)?;
        self.desync.submit_local(frame, bytes.clone());
        self.snapshots.save(frame, bytes);
        Ok(())
    }

    /// Resolves the input to use for `(frame, slot)`: the buffered value if
    /// one arrived, otherwise the most recently known value for that slot
    /// (duplicate-last-input prediction), recorded as unconfirmed so a
    /// later confirmed arrival is detected as a retroactive override.
    fn resolve_input(&mut self, frame: i32, slot: u8) -> GameInput {
        if let Some(value) = self.input_buffer.get_input(frame, slot) {
            self.last_known_input[slot as usize] = value;
            return value;
        }
        let predicted = self.last_known_input[slot as usize];
        let _ = self.input_buffer.enqueue_input(frame, slot, predicted, false);
        predicted
    }

    fn reset_for_seed(&mut self, new_seed: i32) {
        self.session_seed = new_seed;
        self.pending_retro_floor = None;
        self.confirmed_through.iter_mut().for_each(|f| *f = -1);
    }
}

/// Translates one player's decoded input into world mutations: camera
/// tracking is a pure state copy, move/placement commands are queued for
/// the `move_command`/`building_placement` systems to consume this frame.
fn apply_input(world: &mut World, frame: i32, slot: u8, input: &GameInput) {
    if let Some(player) = world.players.get_mut(slot as usize) {
        player.camera_pos = input.camera_pos;
    }

    if input.has_move_command {
        let tile_size = Fixed64::from_int(world.map_config.tile_size_px);
        let target_tile = (
            (input.move_target.x / tile_size).to_int(),
            (input.move_target.y / tile_size).to_int(),
        );
        world.move_commands.enqueue(MoveCommand {
            group_id: u32::from(slot),
            owner_slot: slot,
            target_tile,
            issued_frame: frame,
            is_attack_move: input.modifier_alt,
        });
    }

    if input.has_placement {
        world.pending_placements.push(PlacementRequest {
            tile_x: input.placement_tile.0,
            tile_y: input.placement_tile.1,
            width: 1,
            height: 1,
            type_id: input.placement_type_id,
            owner: slot,
            max_health: Fixed64::from_int(100),
            armor: Fixed64::ZERO,
            requires_power: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_core::math::Fixed64Vec2;

    fn small_config() -> WorldConfig {
        let mut config = WorldConfig::default();
        config.combat_unit_capacity = 16;
        config.zombie_capacity = 16;
        config.building_capacity = 16;
        config.projectile_capacity = 16;
        config.resource_node_capacity = 4;
        config.rollback_snapshot_ring_capacity = 8;
        config
    }

    #[test]
    fn single_player_session_never_stalls() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 1, 7);
        for _ in 0..20 {
            session.submit_local_input(GameInput::default()).unwrap();
            let outcome = session.tick().unwrap();
            assert!(matches!(outcome, TickOutcome::Advanced { .. }));
        }
        assert_eq!(session.current_frame(), 20);
    }

    #[test]
    fn two_player_session_stalls_when_peer_input_is_missing() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 2, 7);
        session.set_connected(1, true);

        for _ in 0..(config.rollback_max_frames_ahead_of_confirmed as usize + 2) {
            session.submit_local_input(GameInput::default()).unwrap();
            session.tick().unwrap();
        }

        let outcome = session.tick().unwrap();
        assert_eq!(outcome, TickOutcome::Stalled);
    }

    #[test]
    fn retroactive_correction_is_detected_and_resimulated() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 2, 7);
        session.set_connected(1, true);

        // Peer 1's real input for frame 0 never arrives before we simulate it,
        // so frame 0 is predicted as GameInput::default().
        session.submit_local_input(GameInput::default()).unwrap();
        session.tick().unwrap();

        // Now the real input for frame 0 arrives and it differs from the
        // prediction: this must be flagged as a retroactive override.
        let real_input = GameInput { modifier_shift: true, ..GameInput::default() };
        let outcome = session.receive_message(Message::Input {
            sender_slot: 1,
            frames: vec![crate::wire::TimestampedInput { frame: 0, input: real_input }],
        });
        assert!(outcome.is_ok());

        session.submit_local_input(GameInput::default()).unwrap();
        let tick_outcome = session.tick().unwrap();
        assert!(matches!(tick_outcome, TickOutcome::Corrected { resimulated_from: 0, .. }));
    }

    #[test]
    fn build_input_packet_carries_current_plus_contiguous_prior_frames() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 1, 7);
        for _ in 0..5 {
            session.submit_local_input(GameInput::default()).unwrap();
            session.tick().unwrap();
        }
        session.submit_local_input(GameInput::default()).unwrap();

        let packet = session.build_input_packet(5);
        let Message::Input { sender_slot, frames } = packet else {
            panic!("expected an Input message");
        };
        assert_eq!(sender_slot, 0);
        let packet_frames: Vec<i32> = frames.iter().map(|f| f.frame).collect();
        assert_eq!(packet_frames, vec![5, 4, 3, 2]);
        assert_eq!(frames.len(), MAX_REDUNDANT_FRAMES + 1);
    }

    #[test]
    fn build_input_packet_stops_at_the_first_gap() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 1, 7);

        // Frame 0 only: frame 1's local input is never enqueued, leaving a
        // gap before frame 2.
        session.submit_local_input(GameInput::default()).unwrap();
        session.tick().unwrap();
        session.input_buffer.enqueue_input(2, 0, GameInput::default(), true).unwrap();

        let packet = session.build_input_packet(2);
        let Message::Input { frames, .. } = packet else {
            panic!("expected an Input message");
        };
        let packet_frames: Vec<i32> = frames.iter().map(|f| f.frame).collect();
        assert_eq!(packet_frames, vec![2]);
    }

    #[test]
    fn drain_outgoing_messages_surfaces_sync_checks_each_tick() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 1, 7);
        session.submit_local_input(GameInput::default()).unwrap();
        session.tick().unwrap();

        // The session's desync detector hashes on its background validator
        // thread (see `DesyncDetector::new`), so the result may land a beat
        // after `tick` returns; poll until it does rather than assume it is
        // already there.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        let mut messages = Vec::new();
        while messages.is_empty() && std::time::Instant::now() < deadline {
            session.desync.poll_validator();
            messages = session.drain_outgoing_messages();
            if messages.is_empty() {
                std::thread::yield_now();
            }
        }

        assert_eq!(messages.len(), 1);
        assert!(matches!(
            messages[0],
            Message::SyncCheck { slot: 0, frame: 0, .. }
        ));

        // Already drained: nothing new queued until the next tick.
        assert!(session.drain_outgoing_messages().is_empty());
    }

    #[test]
    fn move_command_input_enqueues_a_move_command() {
        let config = small_config();
        let mut session = RollbackSession::new(World::new(config.clone()), &config, 0, 1, 1);
        let input = GameInput {
            has_move_command: true,
            move_target: Fixed64Vec2::from_ints(64, 64),
            ..GameInput::default()
        };
        session.submit_local_input(input).unwrap();
        session.tick().unwrap();
        assert_eq!(session.world().move_commands.iter().count(), 1);
    }
}
