// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Crowd-density separation field for zombies: a coarse occupancy count,
//! blurred, whose gradient pushes zombies apart in dense clumps.

use crate::math::{Fixed64, Fixed64Vec2};

/// A dense integer occupancy grid with a blurred density buffer.
#[derive(Clone, Debug)]
pub struct SeparationField {
    size: i32,
    cell_size_px: i32,
    counts: Vec<u32>,
    blurred: Vec<Fixed64>,
}

/// 3x3 Gaussian blur kernel, `[1,2,1; 2,4,2; 1,2,1] / 16`.
const KERNEL: [[i32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];
const KERNEL_SUM: i32 = 16;

impl SeparationField {
    /// Builds a `size x size` grid where each cell covers `cell_size_px` pixels.
    #[must_use]
    pub fn new(size: i32, cell_size_px: i32) -> Self {
        let n = (size * size) as usize;
        Self {
            size,
            cell_size_px,
            counts: vec![0; n],
            blurred: vec![Fixed64::ZERO; n],
        }
    }

    fn index(&self, cx: i32, cy: i32) -> Option<usize> {
        if cx < 0 || cy < 0 || cx >= self.size || cy >= self.size {
            None
        } else {
            Some((cy * self.size + cx) as usize)
        }
    }

    fn clamp_index(&self, cx: i32, cy: i32) -> (i32, i32) {
        (cx.clamp(0, self.size - 1), cy.clamp(0, self.size - 1))
    }

    /// Converts a world-space position to cell coordinates.
    #[must_use]
    pub fn cell_of(&self, position: Fixed64Vec2) -> (i32, i32) {
        let cell_size = Fixed64::from_int(self.cell_size_px);
        ((position.x / cell_size).to_int(), (position.y / cell_size).to_int())
    }

    /// Clears all occupancy counts. Call once per tick before [`Self::add_occupant`].
    pub fn clear(&mut self) {
        self.counts.fill(0);
    }

    /// Increments the occupant count in the cell containing `position`.
    pub fn add_occupant(&mut self, position: Fixed64Vec2) {
        let (cx, cy) = self.cell_of(position);
        if let Some(i) = self.index(cx, cy) {
            self.counts[i] += 1;
        }
    }

    /// Applies the 3x3 blur kernel to the occupancy counts into the density buffer.
    /// Call once per tick after all [`Self::add_occupant`] calls for this frame.
    pub fn blur(&mut self) {
        for cy in 0..self.size {
            for cx in 0..self.size {
                let mut acc: i64 = 0;
                for (ky, row) in KERNEL.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        let sx = cx + kx as i32 - 1;
                        let sy = cy + ky as i32 - 1;
                        let (sx, sy) = self.clamp_index(sx, sy);
                        if let Some(i) = self.index(sx, sy) {
                            acc += i64::from(self.counts[i]) * i64::from(*weight);
                        }
                    }
                }
                let Some(out_i) = self.index(cx, cy) else {
                    continue;
                };
                #[allow(clippy::cast_possible_truncation)]
                let averaged = Fixed64::from_int((acc / i64::from(KERNEL_SUM)) as i32);
                self.blurred[out_i] = averaged;
            }
        }
    }

    /// Density at a cell after blurring, or zero if out of bounds.
    #[must_use]
    pub fn density(&self, cx: i32, cy: i32) -> Fixed64 {
        self.index(cx, cy).map_or(Fixed64::ZERO, |i| self.blurred[i])
    }

    /// Two-point finite-difference gradient at a cell: `(left - right, up - down)`.
    #[must_use]
    pub fn gradient(&self, cx: i32, cy: i32) -> Fixed64Vec2 {
        let left = self.density(cx - 1, cy);
        let right = self.density(cx + 1, cy);
        let up = self.density(cx, cy - 1);
        let down = self.density(cx, cy + 1);
        Fixed64Vec2::new(left - right, up - down)
    }

    /// Computes a deterministic fallback push direction for a zombie sitting
    /// exactly on a density peak (zero gradient), derived from a hash of its
    /// sub-cell position so overlapping zombies don't all push the same way.
    #[must_use]
    pub fn perpendicular_spread(&self, subcell_hash: u32) -> Fixed64Vec2 {
        let angle_deg = (subcell_hash % 360) as i32;
        let theta = Fixed64::from_int(angle_deg) * Fixed64::from_float(std::f64::consts::PI / 180.0);
        let (sin, cos) = theta.sin_cos();
        Fixed64Vec2::new(cos, sin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_spreads_a_single_occupant() {
        let mut field = SeparationField::new(5, 32);
        field.clear();
        field.add_occupant(Fixed64Vec2::from_ints(32 * 2, 32 * 2));
        field.blur();
        assert!(field.density(2, 2) > Fixed64::ZERO);
        assert!(field.density(1, 2) > Fixed64::ZERO);
        assert_eq!(field.density(0, 0), Fixed64::ZERO);
    }

    #[test]
    fn gradient_points_away_from_density_peak() {
        let mut field = SeparationField::new(5, 32);
        field.clear();
        for _ in 0..10 {
            field.add_occupant(Fixed64Vec2::from_ints(32 * 2, 32 * 2));
        }
        field.blur();
        let grad = field.gradient(1, 2);
        // density at x=2 (peak) > density at x=0, so left(1)-ish should exceed right.
        assert!(grad.x != Fixed64::ZERO || grad.y != Fixed64::ZERO);
    }
}
