// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic Q32.32 fixed-point scalar.
//!
//! The representation is an `i64` storing an integer scaled by `2^32`:
//! `real_value = raw / 2^32`. All arithmetic is performed in integer space
//! with saturating overflow so that behavior is identical bit-for-bit across
//! every platform the simulation runs on — no two CPUs may disagree about
//! what a frame looks like.
//!
//! Determinism contract
//! - Every operation here is pure and total for all `i64` inputs.
//! - Multiplication and division round to nearest, ties-to-even, in 128-bit
//!   intermediate space before saturating back into `i64`.
//! - `sqrt` is a fixed-iteration-count Newton's method: no data-dependent
//!   loop bound, so it always costs the same number of steps.
//! - `sin`/`cos` never call a platform transcendental; they use the
//!   quarter-wave lookup table in [`super::trig`].
//! - [`Fixed64::from_float`] is `const fn` and therefore only usable with
//!   compile-time literals — it is not a replacement for `to_f32`/reading a
//!   runtime `f32` and is forbidden at simulation call sites by convention
//!   (reading the raw `i64` via [`Fixed64::raw`] is allowed; converting a
//!   *runtime* float into simulation state is not, since floats are not
//!   guaranteed bit-identical across platforms).

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use super::trig;

/// Number of fractional bits in the Q32.32 encoding.
const FRAC_BITS: u32 = 32;

/// The raw integer value corresponding to `1.0`.
const ONE_RAW: i64 = 1_i64 << FRAC_BITS;

fn saturate_i128_to_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or_else(|_| {
        if value.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

fn saturating_add_raw(a: i64, b: i64) -> i64 {
    saturate_i128_to_i64(i128::from(a) + i128::from(b))
}

fn saturating_sub_raw(a: i64, b: i64) -> i64 {
    saturate_i128_to_i64(i128::from(a) - i128::from(b))
}

fn saturating_neg_raw(a: i64) -> i64 {
    if a == i64::MIN {
        i64::MAX
    } else {
        -a
    }
}

fn mul_raw(a: i64, b: i64) -> i64 {
    let prod = i128::from(a) * i128::from(b);
    let abs: u128 = prod.unsigned_abs();
    let q = abs >> FRAC_BITS;
    let r = abs & ((1_u128 << FRAC_BITS) - 1);
    let half = 1_u128 << (FRAC_BITS - 1);

    let mut rounded = q;
    if r > half || (r == half && (q & 1) == 1) {
        rounded = rounded.saturating_add(1);
    }

    let rounded_i128 = i128::try_from(rounded).map_or(i128::MAX, |v| v);
    let signed = if prod.is_negative() {
        -rounded_i128
    } else {
        rounded_i128
    };
    saturate_i128_to_i64(signed)
}

fn div_raw(a: i64, b: i64) -> i64 {
    if b == 0 {
        if a == 0 {
            // 0/0 -> 0, not NaN: fixed-point has no NaN representation.
            return 0;
        }
        return if a.is_negative() { i64::MIN } else { i64::MAX };
    }

    let num = i128::from(a) << FRAC_BITS;
    let den = i128::from(b);

    let abs_num: u128 = num.unsigned_abs();
    let abs_den: u128 = den.unsigned_abs();

    let q = abs_num / abs_den;
    let r = abs_num % abs_den;

    let mut rounded = q;
    let twice_r = r.saturating_mul(2);
    if twice_r > abs_den || (twice_r == abs_den && (q & 1) == 1) {
        rounded = rounded.saturating_add(1);
    }

    let rounded_i128 = i128::try_from(rounded).map_or(i128::MAX, |v| v);
    let signed = if (a < 0) ^ (b < 0) {
        -rounded_i128
    } else {
        rounded_i128
    };
    saturate_i128_to_i64(signed)
}

/// Fixed iteration count for [`Fixed64::sqrt`]'s Newton's method.
///
/// Chosen so that the method converges for the full `i64` domain of this
/// encoding; the bound is a compile-time constant, not data-dependent, so
/// every platform performs exactly this many steps regardless of input.
const SQRT_ITERATIONS: u32 = 24;

/// Deterministic signed 64-bit fixed-point scalar (Q32.32).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixed64 {
    raw: i64,
}

impl Fixed64 {
    /// The additive identity.
    pub const ZERO: Self = Self { raw: 0 };
    /// The multiplicative identity.
    pub const ONE: Self = Self { raw: ONE_RAW };
    /// The largest finite value representable in this encoding.
    pub const MAX_VALUE: Self = Self { raw: i64::MAX };
    /// The smallest finite value representable in this encoding.
    pub const MIN_VALUE: Self = Self { raw: i64::MIN };

    /// Constructs a value from a raw Q32.32 integer. Exact, no rounding.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self { raw }
    }

    /// Returns the underlying Q32.32 raw storage value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.raw
    }

    /// Constructs a value from an integer, exactly.
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        Self {
            raw: (value as i64) << FRAC_BITS,
        }
    }

    /// Truncates toward zero to the nearest integer.
    #[must_use]
    pub const fn to_int(self) -> i32 {
        let truncated = self.raw >> FRAC_BITS;
        if truncated > i32::MAX as i64 {
            i32::MAX
        } else if truncated < i32::MIN as i64 {
            i32::MIN
        } else {
            truncated as i32
        }
    }

    /// Compile-time-only conversion from a float literal.
    ///
    /// Not for runtime float ingestion: simulation systems must never read a
    /// live `f32`/`f64` into state. Use this only for constructing constants
    /// (e.g. `Fixed64::from_float(0.5)`).
    #[must_use]
    pub const fn from_float(value: f64) -> Self {
        let scaled = value * (ONE_RAW as f64);
        Self {
            raw: scaled as i64,
        }
    }

    /// Clamps `self` to the inclusive range `[min, max]`.
    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        debug_assert!(min.raw <= max.raw, "clamp bounds must be ordered");
        if self.raw < min.raw {
            min
        } else if self.raw > max.raw {
            max
        } else {
            self
        }
    }

    /// Returns the absolute value, saturating at `MAX_VALUE` for `MIN_VALUE`.
    #[must_use]
    pub fn abs(self) -> Self {
        Self::from_raw(if self.raw == i64::MIN {
            i64::MAX
        } else {
            self.raw.abs()
        })
    }

    /// Returns `true` if the value is strictly negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.raw < 0
    }

    /// Deterministic integer-domain square root via fixed-iteration Newton's method.
    ///
    /// Negative inputs return `ZERO` (the simulation never needs complex
    /// results, and a silent zero is safer than a saturating sentinel here).
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.raw <= 0 {
            return Self::ZERO;
        }
        // Work in raw*2^32 space: sqrt(x) in Q32.32 satisfies
        // guess_raw^2 / 2^32 ~= x_raw * 2^32, i.e. we seek sqrt(x_raw << 32).
        let target = (self.raw as u128) << FRAC_BITS;
        let mut guess: u128 = 1_u128 << ((128 - target.leading_zeros()) / 2).max(1);
        if guess == 0 {
            guess = 1;
        }
        for _ in 0..SQRT_ITERATIONS {
            if guess == 0 {
                break;
            }
            guess = (guess + target / guess) / 2;
        }
        Self::from_raw(saturate_i128_to_i64(i128::try_from(guess).unwrap_or(i128::MAX)))
    }

    /// Linearly interpolates between `self` and `other` by `t` (expected `[0, 1]`).
    #[must_use]
    pub fn lerp(self, other: Self, t: Self) -> Self {
        self + (other - self) * t
    }

    /// Returns the sine of `self` interpreted as radians.
    #[must_use]
    pub fn sin(self) -> Self {
        trig::sin_cos(self).0
    }

    /// Returns the cosine of `self` interpreted as radians.
    #[must_use]
    pub fn cos(self) -> Self {
        trig::sin_cos(self).1
    }

    /// Returns `(sin(self), cos(self))`, sharing range reduction work.
    #[must_use]
    pub fn sin_cos(self) -> (Self, Self) {
        trig::sin_cos(self)
    }
}

impl fmt::Debug for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed64({:.6})", f64::from(self.raw) / f64::from(ONE_RAW as u32))
    }
}

impl Add for Fixed64 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::from_raw(saturating_add_raw(self.raw, rhs.raw))
    }
}

impl AddAssign for Fixed64 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fixed64 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::from_raw(saturating_sub_raw(self.raw, rhs.raw))
    }
}

impl SubAssign for Fixed64 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Fixed64 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::from_raw(mul_raw(self.raw, rhs.raw))
    }
}

impl Div for Fixed64 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Self::from_raw(div_raw(self.raw, rhs.raw))
    }
}

impl Neg for Fixed64 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::from_raw(saturating_neg_raw(self.raw))
    }
}
