// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Capability queries: multi-table iteration over a named set of required
//! columns, independent of which concrete row type provides them.
//!
//! The World's table set is fixed and named (not a dynamic registry), so a
//! "capability" here is simply a trait a row type implements; a query is a
//! helper that visits every table implementing it, tables visited in
//! ascending [`crate::ids`] order, each table's rows visited `0..count`
//! (or backwards, when the visitor may swap-remove).

use crate::rows::MortalFlags;

/// The `IMortal` capability: rows that can take damage, die, and be reaped
/// after a death delay.
pub trait Mortal {
    /// Current health.
    fn health(&self) -> crate::math::Fixed64;
    /// Mutable access to the mortality flags.
    fn mortal_flags_mut(&mut self) -> &mut MortalFlags;
    /// Read access to the mortality flags.
    fn mortal_flags(&self) -> MortalFlags;
    /// Frame the row was marked dead, or `-1` if still alive.
    fn death_frame(&self) -> i32;
    /// Stamps the death frame.
    fn set_death_frame(&mut self, frame: i32);
}

impl Mortal for crate::rows::CombatUnit {
    fn health(&self) -> crate::math::Fixed64 {
        self.health
    }
    fn mortal_flags_mut(&mut self) -> &mut MortalFlags {
        &mut self.mortal
    }
    fn mortal_flags(&self) -> MortalFlags {
        self.mortal
    }
    fn death_frame(&self) -> i32 {
        self.death_frame
    }
    fn set_death_frame(&mut self, frame: i32) {
        self.death_frame = frame;
    }
}

impl Mortal for crate::rows::Zombie {
    fn health(&self) -> crate::math::Fixed64 {
        self.health
    }
    fn mortal_flags_mut(&mut self) -> &mut MortalFlags {
        &mut self.mortal
    }
    fn mortal_flags(&self) -> MortalFlags {
        self.mortal
    }
    fn death_frame(&self) -> i32 {
        self.death_frame
    }
    fn set_death_frame(&mut self, frame: i32) {
        self.death_frame = frame;
    }
}

/// Scans a mortal-capable table forward, marking newly-zero-health rows
/// dead at `current_frame`. Returns the count newly marked dead.
pub fn mark_newly_dead<R: Mortal>(table: &mut crate::table::Table<R>, current_frame: i32) -> u32 {
    let mut marked = 0;
    for slot in 0..table.count() {
        let row = table.row_by_slot_mut(slot);
        if row.health() <= crate::math::Fixed64::ZERO && !row.mortal_flags().is_dead() {
            row.mortal_flags_mut().mark_dead();
            row.set_death_frame(current_frame);
            marked += 1;
        }
    }
    marked
}

/// Sweeps a mortal-capable table backwards, freeing every row marked dead
/// at least `death_delay_frames` ago. Backward iteration keeps swap-remove
/// safe: a swapped-in tail row at a lower slot has already been visited.
pub fn sweep_expired_dead<R: Mortal>(
    table: &mut crate::table::Table<R>,
    current_frame: i32,
    death_delay_frames: i32,
) {
    let mut slot = table.count();
    while slot > 0 {
        slot -= 1;
        let row = table.row_by_slot(slot);
        if row.mortal_flags().is_dead() && current_frame - row.death_frame() >= death_delay_frames {
            table.free_by_slot(slot);
        }
    }
}
