// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Drivers that turn a [`ScriptedInputSource`] (or none, for pure-simulation
//! tests) into a fixed number of ticks against a bare `World` or a full
//! `RollbackSession`.

use outpost_core::scheduler::SystemScheduler;
use outpost_core::world::World;
use outpost_net::wire::{Message, TimestampedInput};
use outpost_net::{RollbackSession, TickOutcome};

use crate::input::ScriptedInputSource;

/// Registers the full system pipeline on `world` and runs `frame_count`
/// ticks under `session_seed`, with no player input at all. For scenario
/// tests that only care about AI/physics determinism (spec.md §8 scenarios
/// like "two zombies chase one unit" or "wall forces a detour"), where
/// there is no net layer involved.
pub fn run_scripted_frames(world: &mut World, session_seed: i32, frame_count: i32) -> SystemScheduler {
    let mut scheduler = SystemScheduler::new();
    outpost_core::systems::register_all(&mut scheduler);
    let tick_rate_hz = world.config.tick_rate_hz;
    for _ in 0..frame_count {
        scheduler.tick(world, session_seed, tick_rate_hz);
    }
    scheduler
}

/// Drives `session` through `frame_count` ticks, feeding every slot's
/// scripted input as confirmed for that frame before each tick: the local
/// slot via [`RollbackSession::submit_local_input`], every other slot via a
/// synthesized [`Message::Input`]. This is a "god view" driver — it knows
/// every player's true input up front, so it never predicts or
/// resimulates — useful for asserting end-to-end determinism of the
/// simulation-plus-input-application path without standing up two peers.
///
/// Returns the outcome of every tick, in order.
pub fn run_scripted_session(
    session: &mut RollbackSession,
    local_slot: u8,
    scripts: &[(u8, ScriptedInputSource)],
    frame_count: i32,
) -> Vec<TickOutcome> {
    let mut outcomes = Vec::with_capacity(frame_count.max(0) as usize);
    for _ in 0..frame_count {
        let frame = session.current_frame();
        for (slot, script) in scripts {
            let input = script.input_for_frame(frame);
            if *slot == local_slot {
                let _ = session.submit_local_input(input);
            } else {
                let _ = session.receive_message(Message::Input {
                    sender_slot: *slot,
                    frames: vec![TimestampedInput { frame, input }],
                });
            }
        }
        if let Ok(outcome) = session.tick() {
            outcomes.push(outcome);
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldBuilder;

    #[test]
    fn scripted_frames_advance_the_scheduler_by_exactly_frame_count() {
        let mut world = WorldBuilder::new().with_small_capacities(8).build();
        let scheduler = run_scripted_frames(&mut world, 1, 10);
        assert_eq!(scheduler.current_frame(), 10);
    }

    #[test]
    fn scripted_session_never_stalls_when_every_slot_is_scripted() {
        let builder = WorldBuilder::new().with_small_capacities(8);
        let config = *builder.config();
        let mut session = RollbackSession::new(builder.build(), &config, 0, 1, 1);
        let scripts = vec![(0, ScriptedInputSource::new())];
        let outcomes = run_scripted_session(&mut session, 0, &scripts, 16);
        assert_eq!(outcomes.len(), 16);
        assert!(outcomes.iter().all(|o| matches!(o, TickOutcome::Advanced { .. })));
    }
}
