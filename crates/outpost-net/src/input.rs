// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `GameInput`: the external contract at the simulation boundary.
//!
//! A fixed, blittable record copied bit-for-bit across the wire. The
//! simulation only ever reads a `GameInput` it is handed for the current
//! frame; it never reads a mouse, a keyboard, or any other device directly.

use outpost_core::handle::Handle;
use outpost_core::math::{Fixed64, Fixed64Vec2};

/// One frame's worth of a single player's intent, as decoded at the
/// simulation boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GameInput {
    /// Camera pan position.
    pub camera_pos: Fixed64Vec2,
    /// Camera zoom level.
    pub camera_zoom: Fixed64,

    /// World-space target tile for a move order.
    pub move_target: Fixed64Vec2,
    /// Whether `move_target` carries a move command this frame.
    pub has_move_command: bool,

    /// Drag-select rectangle start corner.
    pub selection_start: Fixed64Vec2,
    /// Drag-select rectangle end corner.
    pub selection_end: Fixed64Vec2,
    /// Whether a drag-select is in progress this frame.
    pub is_selecting: bool,
    /// The entity under the cursor at the moment of a click, if any.
    pub clicked_entity: Handle,

    /// Tile coordinates for a pending building placement.
    pub placement_tile: (i32, i32),
    /// The building type id to place.
    pub placement_type_id: u16,
    /// Whether `placement_tile`/`placement_type_id` carry a placement this frame.
    pub has_placement: bool,

    /// Shift modifier held.
    pub modifier_shift: bool,
    /// Ctrl modifier held.
    pub modifier_ctrl: bool,
    /// Alt modifier held.
    pub modifier_alt: bool,

    /// Cancel/escape pressed this frame.
    pub cancel: bool,
}

impl GameInput {
    /// Encodes this input into its canonical little-endian byte form, the
    /// same bytes that travel on the wire inside `Message::Input` and that
    /// feed the FNV-1a hash used for equality checks and caching.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.camera_pos.x.raw().to_le_bytes());
        out.extend_from_slice(&self.camera_pos.y.raw().to_le_bytes());
        out.extend_from_slice(&self.camera_zoom.raw().to_le_bytes());

        out.extend_from_slice(&self.move_target.x.raw().to_le_bytes());
        out.extend_from_slice(&self.move_target.y.raw().to_le_bytes());
        out.push(u8::from(self.has_move_command));

        out.extend_from_slice(&self.selection_start.x.raw().to_le_bytes());
        out.extend_from_slice(&self.selection_start.y.raw().to_le_bytes());
        out.extend_from_slice(&self.selection_end.x.raw().to_le_bytes());
        out.extend_from_slice(&self.selection_end.y.raw().to_le_bytes());
        out.push(u8::from(self.is_selecting));
        out.extend_from_slice(&self.clicked_entity.table_id().to_le_bytes());
        out.extend_from_slice(&self.clicked_entity.raw_id().to_le_bytes());
        out.extend_from_slice(&self.clicked_entity.generation().to_le_bytes());

        out.extend_from_slice(&self.placement_tile.0.to_le_bytes());
        out.extend_from_slice(&self.placement_tile.1.to_le_bytes());
        out.extend_from_slice(&self.placement_type_id.to_le_bytes());
        out.push(u8::from(self.has_placement));

        out.push(u8::from(self.modifier_shift));
        out.push(u8::from(self.modifier_ctrl));
        out.push(u8::from(self.modifier_alt));
        out.push(u8::from(self.cancel));
    }

    /// The fixed size in bytes of [`GameInput::encode`]'s output: three
    /// `Fixed64` camera fields, two `Fixed64Vec2` + flag move fields, two
    /// `Fixed64Vec2` + flag + handle selection fields, a tile + type id +
    /// flag placement, and four single-byte modifier/cancel flags.
    pub const ENCODED_SIZE: usize = 97;

    /// A 64-bit FNV-1a hash over [`GameInput::encode`]'s output. Two inputs
    /// that hash differently are guaranteed to be byte-unequal; this is the
    /// cheap check `MultiPlayerInputBuffer` uses before falling back to a
    /// full equality comparison.
    #[must_use]
    pub fn hash64(&self) -> u64 {
        let mut bytes = Vec::with_capacity(64);
        self.encode(&mut bytes);
        crate::desync::fnv1a_64(&bytes)
    }
}
