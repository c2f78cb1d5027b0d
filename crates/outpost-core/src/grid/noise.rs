// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The noise grid: a coarse 32x32 field that combat units and buildings
//! write into, and zombies read from to home in on activity.

use crate::math::{Fixed64, Fixed64Vec2};

/// A square grid of [`Fixed64`] noise magnitudes.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoiseGrid {
    size: i32,
    cell_size_px: i32,
    cells: Vec<Fixed64>,
}

impl NoiseGrid {
    /// Builds a `size x size` grid where each cell covers `cell_size_px` pixels.
    #[must_use]
    pub fn new(size: i32, cell_size_px: i32) -> Self {
        Self {
            size,
            cell_size_px,
            cells: vec![Fixed64::ZERO; (size * size) as usize],
        }
    }

    fn index(&self, cx: i32, cy: i32) -> Option<usize> {
        if cx < 0 || cy < 0 || cx >= self.size || cy >= self.size {
            None
        } else {
            Some((cy * self.size + cx) as usize)
        }
    }

    /// The grid's side length in cells.
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// The cell size in pixels.
    #[must_use]
    pub const fn cell_size_px(&self) -> i32 {
        self.cell_size_px
    }

    /// Converts a world-space position to cell coordinates.
    #[must_use]
    pub fn cell_of(&self, position: Fixed64Vec2) -> (i32, i32) {
        let cell_size = Fixed64::from_int(self.cell_size_px);
        ((position.x / cell_size).to_int(), (position.y / cell_size).to_int())
    }

    /// Reads a cell's value, or zero if out of bounds.
    #[must_use]
    pub fn get(&self, cx: i32, cy: i32) -> Fixed64 {
        self.index(cx, cy).map_or(Fixed64::ZERO, |i| self.cells[i])
    }

    /// Non-accumulating write: the cell becomes `max(current, value)`.
    pub fn deposit(&mut self, position: Fixed64Vec2, value: Fixed64) {
        let (cx, cy) = self.cell_of(position);
        if let Some(i) = self.index(cx, cy) {
            if value > self.cells[i] {
                self.cells[i] = value;
            }
        }
    }

    /// Decays every cell toward zero by `decay_rate_per_second * dt`.
    pub fn decay(&mut self, decay_rate_per_second: Fixed64, dt: Fixed64) {
        let step = decay_rate_per_second * dt;
        for cell in &mut self.cells {
            *cell = (*cell - step).clamp(Fixed64::ZERO, Fixed64::MAX_VALUE);
        }
    }

    /// Finds the highest-noise cell within `radius` of `position`.
    ///
    /// Returns `(cell_coords, magnitude, direction_toward)`, or `None` if
    /// every cell in range is zero.
    #[must_use]
    pub fn find_highest_noise_nearby(
        &self,
        position: Fixed64Vec2,
        radius: Fixed64,
    ) -> Option<((i32, i32), Fixed64, Fixed64Vec2)> {
        let cell_size = Fixed64::from_int(self.cell_size_px);
        let span = (radius / cell_size).to_int().max(0) + 1;
        let (cx, cy) = self.cell_of(position);

        let mut best: Option<((i32, i32), Fixed64)> = None;
        for dy in -span..=span {
            for dx in -span..=span {
                let (x, y) = (cx + dx, cy + dy);
                let Some(i) = self.index(x, y) else {
                    continue;
                };
                let v = self.cells[i];
                if v <= Fixed64::ZERO {
                    continue;
                }
                match best {
                    Some((_, best_v)) if best_v >= v => {}
                    _ => best = Some(((x, y), v)),
                }
            }
        }

        best.map(|((x, y), magnitude)| {
            let cell_center = Fixed64Vec2::new(
                Fixed64::from_int(x * self.cell_size_px + self.cell_size_px / 2),
                Fixed64::from_int(y * self.cell_size_px + self.cell_size_px / 2),
            );
            let direction = (cell_center - position).normalized();
            ((x, y), magnitude, direction)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_is_max_not_sum() {
        let mut grid = NoiseGrid::new(4, 256);
        let pos = Fixed64Vec2::from_ints(10, 10);
        grid.deposit(pos, Fixed64::from_int(5));
        grid.deposit(pos, Fixed64::from_int(3));
        let (cx, cy) = grid.cell_of(pos);
        assert_eq!(grid.get(cx, cy).to_int(), 5);
    }

    #[test]
    fn decay_converges_to_zero() {
        let mut grid = NoiseGrid::new(4, 256);
        grid.deposit(Fixed64Vec2::ZERO, Fixed64::from_int(100));
        let dt = Fixed64::ONE / Fixed64::from_int(30);
        for _ in 0..1000 {
            grid.decay(Fixed64::from_int(10), dt);
        }
        assert_eq!(grid.get(0, 0), Fixed64::ZERO);
    }

    #[test]
    fn find_highest_noise_returns_none_when_empty() {
        let grid = NoiseGrid::new(4, 256);
        assert!(grid
            .find_highest_noise_nearby(Fixed64Vec2::ZERO, Fixed64::from_int(1000))
            .is_none());
    }
}
