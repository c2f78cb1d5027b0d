// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic 2D vector over [`Fixed64`].

use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use super::fixed::Fixed64;

/// A pair of [`Fixed64`] scalars, `(x, y)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixed64Vec2 {
    /// Horizontal component.
    pub x: Fixed64,
    /// Vertical component.
    pub y: Fixed64,
}

impl Fixed64Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
    };

    /// Constructs a vector from its components.
    #[must_use]
    pub const fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    /// Constructs a vector from integer components.
    #[must_use]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: Fixed64::from_int(x),
            y: Fixed64::from_int(y),
        }
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed64 {
        self.x * other.x + self.y * other.y
    }

    /// Squared length, avoiding a `sqrt`.
    #[must_use]
    pub fn length_squared(self) -> Fixed64 {
        self.dot(self)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> Fixed64 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector in the same direction, or `ZERO` if `self` is `ZERO`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == Fixed64::ZERO {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Rotates 90 degrees counter-clockwise: `(x, y) -> (-y, x)`.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Component-wise linear interpolation.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed64) -> Self {
        Self::new(self.x.lerp(other.x, t), self.y.lerp(other.y, t))
    }

    /// Scales `self` so its length does not exceed `max_length`.
    #[must_use]
    pub fn clamp_length(self, max_length: Fixed64) -> Self {
        let len = self.length();
        if len <= max_length || len == Fixed64::ZERO {
            self
        } else {
            let scale = max_length / len;
            Self::new(self.x * scale, self.y * scale)
        }
    }

    /// Squared distance between two points.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed64 {
        (self - other).length_squared()
    }

    /// Distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed64 {
        (self - other).length()
    }
}

impl Add for Fixed64Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Fixed64Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fixed64Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Fixed64Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<Fixed64> for Fixed64Vec2 {
    type Output = Self;
    fn mul(self, rhs: Fixed64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Fixed64Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}
