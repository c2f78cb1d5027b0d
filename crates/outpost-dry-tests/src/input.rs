// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ergonomic [`GameInput`] construction and scripted per-frame input
//! sequences, so a test can say "move to (10, 4) on frame 3" instead of
//! hand-filling every field of the struct.

use std::collections::HashMap;

use outpost_core::math::Fixed64Vec2;
use outpost_net::GameInput;

/// Builder for one frame's [`GameInput`], defaulting every field to its
/// idle value (`GameInput::default()`).
#[derive(Clone, Copy, Debug, Default)]
pub struct GameInputBuilder {
    input: GameInput,
}

impl GameInputBuilder {
    /// Starts from an idle input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a move order to the tile under `(x, y)` world-space units.
    #[must_use]
    pub fn move_to(mut self, x: i32, y: i32) -> Self {
        self.input.move_target = Fixed64Vec2::from_ints(x, y);
        self.input.has_move_command = true;
        self
    }

    /// Queues a building placement of `type_id` at tile `(tile_x, tile_y)`.
    #[must_use]
    pub const fn place_building(mut self, tile_x: i32, tile_y: i32, type_id: u16) -> Self {
        self.input.placement_tile = (tile_x, tile_y);
        self.input.placement_type_id = type_id;
        self.input.has_placement = true;
        self
    }

    /// Sets the alt modifier, e.g. for an attack-move order.
    #[must_use]
    pub const fn with_alt_modifier(mut self, held: bool) -> Self {
        self.input.modifier_alt = held;
        self
    }

    /// Sets the shift modifier, e.g. for additive unit selection.
    #[must_use]
    pub const fn with_shift_modifier(mut self, held: bool) -> Self {
        self.input.modifier_shift = held;
        self
    }

    /// Finishes the input.
    #[must_use]
    pub const fn build(self) -> GameInput {
        self.input
    }
}

/// A fixed script of `(frame, input)` pairs for one player slot, used to
/// drive deterministic scenario tests: "on frame 0 do nothing, on frame 10
/// move to (5, 5)", with every unlisted frame repeating the prior input.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInputSource {
    changes: HashMap<i32, GameInput>,
}

impl ScriptedInputSource {
    /// Builds an empty script (every frame is idle input).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `input` takes effect starting at `frame` and holds until
    /// the next scripted change.
    #[must_use]
    pub fn at(mut self, frame: i32, input: GameInput) -> Self {
        self.changes.insert(frame, input);
        self
    }

    /// Resolves the input in effect for `frame`: the most recent scripted
    /// change at or before `frame`, or idle input if none has occurred yet.
    #[must_use]
    pub fn input_for_frame(&self, frame: i32) -> GameInput {
        self.changes
            .iter()
            .filter(|(&change_frame, _)| change_frame <= frame)
            .max_by_key(|(&change_frame, _)| change_frame)
            .map_or_else(GameInput::default, |(_, input)| *input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_move_command_with_target() {
        let input = GameInputBuilder::new().move_to(64, 128).build();
        assert!(input.has_move_command);
        assert_eq!(input.move_target, Fixed64Vec2::from_ints(64, 128));
    }

    #[test]
    fn script_holds_last_value_until_the_next_change() {
        let move_input = GameInputBuilder::new().move_to(1, 1).build();
        let script = ScriptedInputSource::new().at(5, move_input);

        assert_eq!(script.input_for_frame(0), GameInput::default());
        assert_eq!(script.input_for_frame(4), GameInput::default());
        assert_eq!(script.input_for_frame(5), move_input);
        assert_eq!(script.input_for_frame(100), move_input);
    }
}
