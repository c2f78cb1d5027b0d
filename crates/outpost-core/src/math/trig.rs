// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic sine/cosine via quarter-wave lookup + linear interpolation.
//!
//! No platform transcendental is ever called: two machines running different
//! libm implementations must produce bit-identical results, so we quantize
//! angles into a fixed-size table built once at compile time and interpolate
//! linearly between samples.

use super::fixed::Fixed64;

/// Number of samples across the first quarter-wave, `[0, π/2]`.
const QTR_SEGMENTS: usize = 256;

/// `2π` as a Q32.32 constant.
const TAU: Fixed64 = Fixed64::from_float(std::f64::consts::TAU);
/// `π` as a Q32.32 constant.
const PI: Fixed64 = Fixed64::from_float(std::f64::consts::PI);
/// `π/2` as a Q32.32 constant.
const HALF_PI: Fixed64 = Fixed64::from_float(std::f64::consts::FRAC_PI_2);

/// Quarter-wave sine samples, `sin(i * (π/2) / QTR_SEGMENTS)` for `i in 0..=QTR_SEGMENTS`.
///
/// Generated once via [`build_quarter_wave_table`]; stored as raw Q32.32
/// integers rather than computed at `const` time because `f64::sin` is not
/// available in a `const fn` context on stable Rust.
fn quarter_wave_table() -> &'static [i64; QTR_SEGMENTS + 1] {
    use std::sync::OnceLock;
    static TABLE: OnceLock<[i64; QTR_SEGMENTS + 1]> = OnceLock::new();
    TABLE.get_or_init(build_quarter_wave_table)
}

fn build_quarter_wave_table() -> [i64; QTR_SEGMENTS + 1] {
    let mut table = [0_i64; QTR_SEGMENTS + 1];
    for (i, slot) in table.iter_mut().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let theta = (i as f64) * std::f64::consts::FRAC_PI_2 / (QTR_SEGMENTS as f64);
        *slot = Fixed64::from_float(theta.sin()).raw();
    }
    table
}

/// Samples the quarter-wave table at a fractional index with linear interpolation.
///
/// `index_q` is a Q32.32 value in `[0, QTR_SEGMENTS]`.
fn sample_quarter_wave(index_q: Fixed64) -> Fixed64 {
    let table = quarter_wave_table();
    let clamped = index_q.clamp(Fixed64::ZERO, Fixed64::from_int(QTR_SEGMENTS as i32));
    let lo = clamped.to_int().clamp(0, QTR_SEGMENTS as i32 - 1) as usize;
    let hi = (lo + 1).min(QTR_SEGMENTS);
    let frac = clamped - Fixed64::from_int(lo as i32);
    let a = Fixed64::from_raw(table[lo]);
    let b = Fixed64::from_raw(table[hi]);
    a.lerp(b, frac)
}

/// Reduces `theta` into `[0, 2π)` without using a floating-point modulo.
fn wrap_to_tau(theta: Fixed64) -> Fixed64 {
    let mut t = theta;
    // Bounded loop: callers pass small multiples of tau in practice (frame
    // angles), and a data-independent cap keeps this deterministic and
    // allocation-free even for pathological inputs.
    for _ in 0..64 {
        if t.raw() >= 0 && t.raw() < TAU.raw() {
            break;
        }
        if t.is_negative() {
            t += TAU;
        } else {
            t -= TAU;
        }
    }
    t.clamp(Fixed64::ZERO, TAU)
}

/// Returns `(sin(theta), cos(theta))` for `theta` in radians, any finite range.
#[must_use]
pub fn sin_cos(theta: Fixed64) -> (Fixed64, Fixed64) {
    let wrapped = wrap_to_tau(theta);

    // Reduce to the first quadrant and track the sign/swap needed to map
    // back, following the standard quarter-wave reconstruction:
    // quadrant 0: [0, π/2)      sin = +S(t),        cos = +S(π/2 - t)
    // quadrant 1: [π/2, π)      sin = +S(π - t),     cos = -S(t - π/2)
    // quadrant 2: [π, 3π/2)     sin = -S(t - π),     cos = -S(3π/2 - t)
    // quadrant 3: [3π/2, 2π)    sin = -S(2π - t),    cos = +S(t - 3π/2)
    let scale = Fixed64::from_int(QTR_SEGMENTS as i32) / HALF_PI;

    let (sin_arg, sin_neg, cos_arg, cos_neg) = if wrapped < HALF_PI {
        (wrapped, false, HALF_PI - wrapped, false)
    } else if wrapped < PI {
        (PI - wrapped, false, wrapped - HALF_PI, true)
    } else if wrapped < HALF_PI + PI {
        (wrapped - PI, true, HALF_PI + PI - wrapped, true)
    } else {
        (TAU - wrapped, true, wrapped - (HALF_PI + PI), false)
    };

    let sin_sample = sample_quarter_wave(sin_arg * scale);
    let cos_sample = sample_quarter_wave(cos_arg * scale);

    let sin_v = if sin_neg { -sin_sample } else { sin_sample };
    let cos_v = if cos_neg { -cos_sample } else { cos_sample };
    (sin_v, cos_v)
}
