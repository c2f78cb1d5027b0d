// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The fixed, ordered system scheduler.
//!
//! Systems run in exactly the order they were registered, every tick,
//! filtered by an `interval`/`offset` phase. There is no dynamic reordering,
//! no priority queue: the order *is* the simulation's dependency graph, laid
//! out once at `World` construction.

use crate::math::Fixed64;
use crate::world::World;

/// Per-tick context handed to every system.
#[derive(Clone, Copy, Debug)]
pub struct SimulationContext {
    /// The frame number about to be (or being) simulated.
    pub current_frame: i32,
    /// The session's deterministic seed, shared by every peer.
    pub session_seed: i32,
    /// `1 / (tick_rate_hz / interval)` — the effective delta for a system
    /// that only runs every `interval` frames.
    pub delta_seconds: Fixed64,
}

/// A named tick function plus its phase filter.
struct SystemEntry {
    name: &'static str,
    interval: i32,
    offset: i32,
    run: Box<dyn FnMut(&mut World, &SimulationContext)>,
}

/// An ordered, fixed list of systems run once per tick under a phase filter.
pub struct SystemScheduler {
    current_frame: i32,
    systems: Vec<SystemEntry>,
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemScheduler {
    /// Constructs an empty scheduler at frame 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_frame: 0,
            systems: Vec::new(),
        }
    }

    /// The next frame number to be ticked.
    #[must_use]
    pub const fn current_frame(&self) -> i32 {
        self.current_frame
    }

    /// Resets the frame counter, e.g. after a rollback restore.
    pub fn set_current_frame(&mut self, frame: i32) {
        self.current_frame = frame;
    }

    /// Registers a system at the end of the ordered list.
    ///
    /// `interval` must be `>= 1`; the system runs on frames where
    /// `frame % interval == offset`.
    pub fn register(
        &mut self,
        name: &'static str,
        interval: i32,
        offset: i32,
        run: impl FnMut(&mut World, &SimulationContext) + 'static,
    ) {
        debug_assert!(interval >= 1, "system interval must be at least 1");
        self.systems.push(SystemEntry {
            name,
            interval: interval.max(1),
            offset: offset.rem_euclid(interval.max(1)),
            run: Box::new(run),
        });
    }

    /// Names of registered systems, in run order. Diagnostic use only.
    #[must_use]
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name).collect()
    }

    /// Advances one frame: bumps `current_frame`, then runs every system
    /// whose phase filter matches this frame, in registration order.
    pub fn tick(&mut self, world: &mut World, session_seed: i32, tick_rate_hz: u32) {
        self.tick_with_trace(world, session_seed, tick_rate_hz, |_, _| {});
    }

    /// Advances one frame like [`SystemScheduler::tick`], but invokes
    /// `after_each(name, world)` immediately after every system that ran this
    /// frame. Used by the desync-export path (spec.md §4.13) to re-simulate
    /// a divergent frame and hash the world after each system, pinpointing
    /// the first one whose output differs between peers.
    pub fn tick_with_trace(
        &mut self,
        world: &mut World,
        session_seed: i32,
        tick_rate_hz: u32,
        mut after_each: impl FnMut(&'static str, &mut World),
    ) {
        let frame = self.current_frame;
        for system in &mut self.systems {
            if frame.rem_euclid(system.interval) != system.offset {
                continue;
            }
            let delta_seconds =
                Fixed64::from_int(system.interval) / Fixed64::from_int(tick_rate_hz as i32);
            let ctx = SimulationContext {
                current_frame: frame,
                session_seed,
                delta_seconds,
            };
            (system.run)(world, &ctx);
            after_each(system.name, world);
        }
        self.current_frame += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systems_run_in_registration_order() {
        let mut scheduler = SystemScheduler::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let o1 = order.clone();
        scheduler.register("a", 1, 0, move |_w, _c| o1.borrow_mut().push("a"));
        let o2 = order.clone();
        scheduler.register("b", 1, 0, move |_w, _c| o2.borrow_mut().push("b"));

        let mut world = World::new(crate::config::WorldConfig::default());
        scheduler.tick(&mut world, 0, 30);

        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn interval_offset_filters_correctly() {
        let mut scheduler = SystemScheduler::new();
        let runs = std::rc::Rc::new(std::cell::RefCell::new(0));
        let r = runs.clone();
        scheduler.register("every_other_odd", 2, 1, move |_w, _c| *r.borrow_mut() += 1);

        let mut world = World::new(crate::config::WorldConfig::default());
        for _ in 0..4 {
            scheduler.tick(&mut world, 0, 30);
        }
        // Frames 0,1,2,3 -> offset 1 matches frames 1 and 3.
        assert_eq!(*runs.borrow(), 2);
    }
}
