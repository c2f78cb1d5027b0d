// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generational, columnar, swap-remove entity table.

use std::collections::HashMap;

use crate::error::SimError;
use crate::handle::Handle;
use crate::math::{Fixed64, Fixed64Vec2};

const FREE: u32 = u32::MAX;

/// A row type that exposes a world-space position, required to build a
/// [`Table`]'s spatial cell index.
pub trait Positioned {
    /// Returns the row's current world-space position in pixels.
    fn position(&self) -> Fixed64Vec2;
}

/// A reusable generational slot-indirection core, shared by every [`Table`].
///
/// This isolates the allocate/free/swap-remove bookkeeping (the part with
/// real invariants to uphold) from the row storage itself.
#[derive(Debug)]
struct Indirection {
    /// `slot -> raw_id`, dense, one entry per live row.
    slot_to_raw: Vec<u32>,
    /// `raw_id -> slot`, or `FREE` if the raw id is not currently live.
    raw_to_slot: Vec<u32>,
    /// `raw_id -> generation`. Bumped on every free.
    generation: Vec<u16>,
    /// Freed raw ids available for reuse, most-recently-freed last.
    free_list: Vec<u32>,
}

impl Indirection {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slot_to_raw: Vec::with_capacity(capacity),
            raw_to_slot: Vec::with_capacity(capacity),
            generation: Vec::with_capacity(capacity),
            free_list: Vec::new(),
        }
    }

    fn count(&self) -> usize {
        self.slot_to_raw.len()
    }

    fn allocate_raw_id(&mut self, capacity: usize) -> Result<u32, SimError> {
        if let Some(raw_id) = self.free_list.pop() {
            return Ok(raw_id);
        }
        let next = self.raw_to_slot.len();
        if next >= capacity {
            return Err(SimError::CapacityExceeded);
        }
        self.raw_to_slot.push(FREE);
        self.generation.push(0);
        Ok(next as u32)
    }

    /// Validates `handle` against current generation and returns its slot.
    fn slot_of(&self, handle: Handle) -> Option<u32> {
        let raw_id = handle.raw_id();
        let gen = *self.generation.get(raw_id as usize)?;
        if gen != handle.generation() {
            return None;
        }
        let slot = *self.raw_to_slot.get(raw_id as usize)?;
        (slot != FREE).then_some(slot)
    }

    fn handle_of(&self, table_id: u16, slot: u32) -> Handle {
        let raw_id = self.slot_to_raw[slot as usize];
        Handle::new(table_id, raw_id, self.generation[raw_id as usize])
    }
}

/// A uniform-grid spatial index over a table's live rows.
///
/// Cells are keyed by integer `(cell_x, cell_y)`; each cell holds a sorted
/// list of slots whose position falls inside it. The index is a point-in-time
/// snapshot: callers rebuild it via [`Table::spatial_sort`] after bulk
/// mutation, matching the "rebuilt on demand" contract.
#[derive(Debug, Default)]
struct SpatialIndex {
    cell_size: Fixed64,
    cells: HashMap<(i32, i32), Vec<u32>>,
}

impl SpatialIndex {
    fn cell_of(&self, position: Fixed64Vec2) -> (i32, i32) {
        let cx = (position.x / self.cell_size).to_int();
        let cy = (position.y / self.cell_size).to_int();
        (cx, cy)
    }
}

/// A structure-of-arrays table of rows of type `R`, addressed by
/// generational [`Handle`]s.
#[derive(Debug)]
pub struct Table<R> {
    table_id: u16,
    capacity: usize,
    rows: Vec<R>,
    indirection: Indirection,
    structural_version: u64,
    spatial: Option<SpatialIndex>,
}

/// A captured copy of a [`Table`]'s rows and indirection state, suitable for
/// a rollback snapshot.
///
/// Capturing indirection alongside rows (not just the dense row array) is
/// what keeps handles taken before the snapshot valid after restoring it:
/// `raw_id -> slot` and generations must come back exactly as they were, or a
/// handle minted pre-restore could resolve to the wrong row (or none at all)
/// post-restore.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableSnapshot<R> {
    rows: Vec<R>,
    slot_to_raw: Vec<u32>,
    raw_to_slot: Vec<u32>,
    generation: Vec<u16>,
    free_list: Vec<u32>,
    structural_version: u64,
}

impl<R: Default + Clone> Table<R> {
    /// Constructs an empty table with a fixed maximum row capacity.
    #[must_use]
    pub fn new(table_id: u16, capacity: usize) -> Self {
        Self {
            table_id,
            capacity,
            rows: Vec::with_capacity(capacity),
            indirection: Indirection::with_capacity(capacity),
            structural_version: 0,
            spatial: None,
        }
    }

    /// Enables a spatial cell index with the given cell size, in pixels.
    pub fn enable_spatial_index(&mut self, cell_size: Fixed64) {
        self.spatial = Some(SpatialIndex {
            cell_size,
            cells: HashMap::new(),
        });
    }

    /// This table's compile-time-assigned id.
    #[must_use]
    pub const fn table_id_const(&self) -> u16 {
        self.table_id
    }

    /// Number of currently live rows.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.indirection.count() as u32
    }

    /// The table's maximum row capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Monotonically increasing counter bumped on every allocate/free.
    #[must_use]
    pub const fn structural_version(&self) -> u64 {
        self.structural_version
    }

    /// Allocates a new zeroed row and returns its handle.
    ///
    /// # Errors
    /// Returns [`SimError::CapacityExceeded`] if the table is full.
    pub fn allocate(&mut self) -> Result<Handle, SimError> {
        let raw_id = self.indirection.allocate_raw_id(self.capacity)?;
        let slot = self.rows.len() as u32;
        self.rows.push(R::default());
        self.indirection.slot_to_raw.push(raw_id);
        self.indirection.raw_to_slot[raw_id as usize] = slot;
        self.structural_version += 1;
        Ok(self.indirection.handle_of(self.table_id, slot))
    }

    /// Frees the row referenced by `handle` via swap-remove.
    ///
    /// # Errors
    /// Returns [`SimError::StaleHandle`] (and no-ops) if `handle` no longer
    /// refers to a live row.
    pub fn free(&mut self, handle: Handle) -> Result<(), SimError> {
        let Some(slot) = self.indirection.slot_of(handle) else {
            return Err(SimError::StaleHandle);
        };
        let raw_id = handle.raw_id();
        let last_slot = self.rows.len() as u32 - 1;

        if slot != last_slot {
            self.rows.swap(slot as usize, last_slot as usize);
            self.indirection.slot_to_raw.swap(slot as usize, last_slot as usize);
            let moved_raw = self.indirection.slot_to_raw[slot as usize];
            self.indirection.raw_to_slot[moved_raw as usize] = slot;
        }

        self.rows.pop();
        self.indirection.slot_to_raw.pop();
        self.indirection.raw_to_slot[raw_id as usize] = FREE;
        self.indirection.generation[raw_id as usize] =
            self.indirection.generation[raw_id as usize].wrapping_add(1);
        self.indirection.free_list.push(raw_id);
        self.structural_version += 1;
        Ok(())
    }

    /// Returns the live slot for `handle`, or `None` if stale.
    #[must_use]
    pub fn get_slot(&self, handle: Handle) -> Option<u32> {
        self.indirection.slot_of(handle)
    }

    /// Returns the current handle addressing the row at `slot`.
    #[must_use]
    pub fn get_handle(&self, slot: u32) -> Handle {
        self.indirection.handle_of(self.table_id, slot)
    }

    /// Bounds-checked row borrow.
    #[must_use]
    pub fn try_get_row(&self, slot: u32) -> Option<&R> {
        self.rows.get(slot as usize)
    }

    /// Bounds-checked mutable row borrow.
    #[must_use]
    pub fn try_get_row_mut(&mut self, slot: u32) -> Option<&mut R> {
        self.rows.get_mut(slot as usize)
    }

    /// Unchecked-in-release row borrow; bounds-checked in debug builds.
    #[must_use]
    pub fn row_by_slot(&self, slot: u32) -> &R {
        debug_assert!((slot as usize) < self.rows.len(), "slot out of range");
        &self.rows[slot as usize]
    }

    /// Unchecked-in-release mutable row borrow; bounds-checked in debug builds.
    #[must_use]
    pub fn row_by_slot_mut(&mut self, slot: u32) -> &mut R {
        debug_assert!((slot as usize) < self.rows.len(), "slot out of range");
        &mut self.rows[slot as usize]
    }

    /// Resolves a handle directly to its row, if still live.
    #[must_use]
    pub fn try_get_row_by_handle(&self, handle: Handle) -> Option<&R> {
        self.get_slot(handle).map(|slot| self.row_by_slot(slot))
    }

    /// Iterates all live rows in slot order, `0..count`.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.iter()
    }

    /// Iterates all live rows mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.rows.iter_mut()
    }

    /// Frees the row at `slot` directly, without a handle round-trip.
    ///
    /// Used by backward-iterating systems (the death sweep, capability
    /// queries) that already hold the slot and need swap-remove safety
    /// during iteration.
    pub fn free_by_slot(&mut self, slot: u32) {
        let handle = self.get_handle(slot);
        // Row is known live (caller obtained `slot` from `0..count`), so
        // staleness here would indicate a logic bug upstream; ignore the
        // (unreachable in practice) error rather than panic.
        let _ = self.free(handle);
    }

    /// Captures this table's rows and indirection state for a rollback
    /// snapshot. The spatial index, if any, is not included: it is a derived
    /// cache, rebuilt via [`Table::spatial_sort`] after a restore.
    #[must_use]
    pub fn to_snapshot(&self) -> TableSnapshot<R> {
        TableSnapshot {
            rows: self.rows.clone(),
            slot_to_raw: self.indirection.slot_to_raw.clone(),
            raw_to_slot: self.indirection.raw_to_slot.clone(),
            generation: self.indirection.generation.clone(),
            free_list: self.indirection.free_list.clone(),
            structural_version: self.structural_version,
        }
    }

    /// Restores rows and indirection exactly as captured by
    /// [`Table::to_snapshot`]. Capacity and table id are unchanged; any
    /// spatial index is cleared (callers rebuild it via
    /// [`Table::spatial_sort`] before the next query).
    pub fn restore_from_snapshot(&mut self, snapshot: TableSnapshot<R>) {
        self.rows = snapshot.rows;
        self.indirection.slot_to_raw = snapshot.slot_to_raw;
        self.indirection.raw_to_slot = snapshot.raw_to_slot;
        self.indirection.generation = snapshot.generation;
        self.indirection.free_list = snapshot.free_list;
        self.structural_version = snapshot.structural_version;
        if let Some(spatial) = self.spatial.as_mut() {
            spatial.cells.clear();
        }
    }
}

impl<R: Default + Clone + Positioned> Table<R> {
    /// Rebuilds the spatial cell index from current row positions.
    ///
    /// No-op if [`Table::enable_spatial_index`] was never called.
    pub fn spatial_sort(&mut self) {
        let Some(spatial) = self.spatial.as_mut() else {
            return;
        };
        spatial.cells.clear();
        for (slot, row) in self.rows.iter().enumerate() {
            let cell = spatial.cell_of(row.position());
            spatial.cells.entry(cell).or_default().push(slot as u32);
        }
        for bucket in spatial.cells.values_mut() {
            bucket.sort_unstable();
        }
    }

    /// Returns the slots of all live rows whose cell intersects a
    /// `radius`-sized square around `position`.
    ///
    /// Callers must still perform an exact distance check: this only
    /// narrows by cell, matching the contract in the spec.
    #[must_use]
    pub fn query_radius(&self, position: Fixed64Vec2, radius: Fixed64) -> Vec<u32> {
        let Some(spatial) = self.spatial.as_ref() else {
            return (0..self.rows.len() as u32).collect();
        };
        let cell_size = spatial.cell_size;
        let span = (radius / cell_size).to_int().max(0) + 1;
        let (cx, cy) = spatial.cell_of(position);

        let mut out = Vec::new();
        for dy in -span..=span {
            for dx in -span..=span {
                if let Some(bucket) = spatial.cells.get(&(cx + dx, cy + dy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone)]
    struct TestRow {
        value: i32,
    }

    #[test]
    fn allocate_free_swap_remove_stability() {
        let mut table: Table<TestRow> = Table::new(0, 8);
        let handles: Vec<Handle> = (0..5).map(|_| table.allocate().unwrap()).collect();
        table.free(handles[1]).unwrap();

        assert_eq!(table.count(), 4);
        assert!(table.get_slot(handles[1]).is_none());
        for (i, h) in handles.iter().enumerate() {
            if i == 1 {
                continue;
            }
            let slot = table.get_slot(*h).expect("handle should remain live");
            assert_eq!(table.get_handle(slot), *h);
        }
    }

    #[test]
    fn allocate_past_capacity_errors() {
        let mut table: Table<TestRow> = Table::new(0, 2);
        table.allocate().unwrap();
        table.allocate().unwrap();
        assert_eq!(table.allocate(), Err(SimError::CapacityExceeded));
    }

    #[test]
    fn free_stale_handle_is_noop_error() {
        let mut table: Table<TestRow> = Table::new(0, 2);
        let h = table.allocate().unwrap();
        table.free(h).unwrap();
        assert_eq!(table.free(h), Err(SimError::StaleHandle));
    }

    #[test]
    fn raw_id_reused_with_incremented_generation() {
        let mut table: Table<TestRow> = Table::new(0, 2);
        let h1 = table.allocate().unwrap();
        table.free(h1).unwrap();
        let h2 = table.allocate().unwrap();
        assert_eq!(h1.raw_id(), h2.raw_id());
        assert_ne!(h1.generation(), h2.generation());
        assert!(table.get_slot(h1).is_none());
        assert!(table.get_slot(h2).is_some());
    }

    #[derive(Default, Clone)]
    struct PositionedRow {
        pos: Fixed64Vec2,
    }

    impl Positioned for PositionedRow {
        fn position(&self) -> Fixed64Vec2 {
            self.pos
        }
    }

    #[test]
    fn snapshot_roundtrip_preserves_handles_and_order() {
        let mut table: Table<TestRow> = Table::new(0, 8);
        let handles: Vec<Handle> = (0..5).map(|_| table.allocate().unwrap()).collect();
        table.free(handles[1]).unwrap();
        for (i, h) in handles.iter().enumerate() {
            if i != 1 {
                if let Some(slot) = table.get_slot(*h) {
                    table.row_by_slot_mut(slot).value = i as i32;
                }
            }
        }

        let snapshot = table.to_snapshot();
        let mut restored: Table<TestRow> = Table::new(0, 8);
        restored.restore_from_snapshot(snapshot);

        assert_eq!(restored.count(), table.count());
        assert!(restored.get_slot(handles[1]).is_none());
        for (i, h) in handles.iter().enumerate() {
            if i == 1 {
                continue;
            }
            let slot = restored.get_slot(*h).expect("handle should survive snapshot restore");
            assert_eq!(restored.row_by_slot(slot).value, i as i32);
        }

        // A fresh allocation after restore must reuse the freed raw id with
        // the generation the snapshot captured, not a fresh one from zero.
        let new_handle = restored.allocate().unwrap();
        assert_eq!(new_handle.raw_id(), handles[1].raw_id());
        assert_eq!(new_handle.generation(), handles[1].generation().wrapping_add(1));
    }

    #[test]
    fn query_radius_finds_nearby_rows() {
        let mut table: Table<PositionedRow> = Table::new(0, 16);
        table.enable_spatial_index(Fixed64::from_int(32));
        let near = table.allocate().unwrap();
        let far = table.allocate().unwrap();
        table.row_by_slot_mut(table.get_slot(near).unwrap()).pos = Fixed64Vec2::from_ints(0, 0);
        table.row_by_slot_mut(table.get_slot(far).unwrap()).pos = Fixed64Vec2::from_ints(5000, 5000);
        table.spatial_sort();

        let hits = table.query_radius(Fixed64Vec2::ZERO, Fixed64::from_int(64));
        assert!(hits.contains(&table.get_slot(near).unwrap()));
        assert!(!hits.contains(&table.get_slot(far).unwrap()));
    }
}
