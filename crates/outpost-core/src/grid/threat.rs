// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The threat grid: a finer 64x64 field with a `current` value (decays
//! quickly) and a `peak` value (decays slowly, giving zombies memory of
//! recent activity after it has moved on).

use crate::math::{Fixed64, Fixed64Vec2};

/// Paired current/peak threat fields over the same grid.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreatGrid {
    size: i32,
    cell_size_px: i32,
    current: Vec<Fixed64>,
    peak: Vec<Fixed64>,
}

impl ThreatGrid {
    /// Builds a `size x size` grid where each cell covers `cell_size_px` pixels.
    #[must_use]
    pub fn new(size: i32, cell_size_px: i32) -> Self {
        let n = (size * size) as usize;
        Self {
            size,
            cell_size_px,
            current: vec![Fixed64::ZERO; n],
            peak: vec![Fixed64::ZERO; n],
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

    /// Current-field value at a cell, or zero if out of bounds.
    #[must_use]
    pub fn current(&self, cx: i32, cy: i32) -> Fixed64 {
        self.index(cx, cy).map_or(Fixed64::ZERO, |i| self.current[i])
    }

    /// Peak-field value at a cell, or zero if out of bounds.
    #[must_use]
    pub fn peak(&self, cx: i32, cy: i32) -> Fixed64 {
        self.index(cx, cy).map_or(Fixed64::ZERO, |i| self.peak[i])
    }

    /// Set-max write into the `current` field from a source entity; bumps
    /// `peak` when it raises `current`.
    pub fn deposit_source(&mut self, position: Fixed64Vec2, threat_level: Fixed64) {
        let (cx, cy) = self.cell_of(position);
        self.raise_current(cx, cy, threat_level);
    }

    fn raise_current(&mut self, cx: i32, cy: i32, value: Fixed64) {
        let Some(i) = self.index(cx, cy) else {
            return;
        };
        if value > self.current[i] {
            self.current[i] = value;
            if value > self.peak[i] {
                self.peak[i] = value;
            }
        }
    }

    /// Spills noise into threat: each noise cell covers a 2x2 block of
    /// threat cells (noise grid is coarser), contributing
    /// `noise_value * spillover_multiplier` as a set-max.
    pub fn apply_noise_spillover(
        &mut self,
        noise: &super::NoiseGrid,
        spillover_multiplier: Fixed64,
    ) {
        let noise_cell_size = noise.cell_size_px();
        let threat_cell_size = self.cell_size_px;
        let ratio = (noise_cell_size / threat_cell_size).max(1);

        for ny in 0..noise.size() {
            for nx in 0..noise.size() {
                let noise_value = noise.get(nx, ny);
                if noise_value <= Fixed64::ZERO {
                    continue;
                }
                let spilled = noise_value * spillover_multiplier;
                let base_x = nx * ratio;
                let base_y = ny * ratio;
                for dy in 0..ratio {
                    for dx in 0..ratio {
                        self.raise_current(base_x + dx, base_y + dy, spilled);
                    }
                }
            }
        }
    }

    /// Decays `current` at `decay_rate` and `peak` at `peak_decay_rate`
    /// (strictly slower), clamped at zero.
    pub fn decay(
        &mut self,
        decay_rate_per_second: Fixed64,
        peak_decay_rate_per_second: Fixed64,
        dt: Fixed64,
    ) {
        let current_step = decay_rate_per_second * dt;
        let peak_step = peak_decay_rate_per_second * dt;
        for v in &mut self.current {
            *v = (*v - current_step).clamp(Fixed64::ZERO, Fixed64::MAX_VALUE);
        }
        for v in &mut self.peak {
            *v = (*v - peak_step).clamp(Fixed64::ZERO, Fixed64::MAX_VALUE);
        }
    }

    /// Finds the highest-`current`-threat cell within `radius` of `position`.
    ///
    /// Returns `(cell, magnitude, cell_position)`.
    #[must_use]
    pub fn find_highest_threat_nearby(
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
                let v = self.current[i];
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
            let pos = Fixed64Vec2::new(
                Fixed64::from_int(x * self.cell_size_px + self.cell_size_px / 2),
                Fixed64::from_int(y * self.cell_size_px + self.cell_size_px / 2),
            );
            ((x, y), magnitude, pos)
        })
    }
}
