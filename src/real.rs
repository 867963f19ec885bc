//! Arbitrary-precision shadow number.
//!
//! Thin wrapper over [`rug::Float`] at a fixed precision, round-to-nearest.
//! Everything here is pure aside from allocation; an allocation failure is
//! the one place this crate aborts the process rather than returning an
//! error, since there is no way to apply back-pressure from inside a host
//! instruction (see the design's error-handling section).

use rug::float::Round;
use rug::ops::PowAssignRound;
use rug::{Assign, Float};
use std::cmp::Ordering;
use std::fmt;

/// High-precision companion value for a host float.
#[derive(Clone)]
pub struct Real(Float);

impl fmt::Debug for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Real({})", self.0)
    }
}

impl Real {
    /// Build a [`Real`] from a host double at the given precision.
    pub fn from_f64(x: f64, precision: u32) -> Self {
        let mut r = Float::new(precision);
        r.assign(x);
        Self(r)
    }

    /// Build a [`Real`] from a host single at the given precision.
    ///
    /// `f32 -> f64` is an exact-valued promotion, so this is equivalent to
    /// widening the bits before handing them to MPFR.
    pub fn from_f32(x: f32, precision: u32) -> Self {
        Self::from_f64(x as f64, precision)
    }

    /// Zero at the given precision.
    pub fn zero(precision: u32) -> Self {
        let mut r = Float::new(precision);
        r.assign(0.0);
        Self(r)
    }

    /// Precision, in bits, of this value.
    pub fn precision(&self) -> u32 {
        self.0.prec()
    }

    /// Re-round this value to `precision` bits, round-to-nearest.
    pub fn set_precision(&mut self, precision: u32) {
        let rounded = Float::with_val(precision, &self.0);
        self.0 = rounded;
    }

    /// Lossy projection back down to a host double.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64()
    }

    /// Lossy projection back down to a host single.
    pub fn to_f32(&self) -> f32 {
        self.0.to_f32()
    }

    /// True if this value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True if this value is NaN.
    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    /// True if this value is an infinity.
    pub fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }

    fn binop(a: &Real, b: &Real, precision: u32, f: impl FnOnce(&Float, &Float) -> Float) -> Real {
        let mut r = f(&a.0, &b.0);
        r.set_prec_round(precision, Round::Nearest);
        Real(r)
    }

    /// `a + b`.
    pub fn add(a: &Real, b: &Real, precision: u32) -> Real {
        Self::binop(a, b, precision, |x, y| x.clone() + y)
    }

    /// `a - b`.
    pub fn sub(a: &Real, b: &Real, precision: u32) -> Real {
        Self::binop(a, b, precision, |x, y| x.clone() - y)
    }

    /// `a * b`.
    pub fn mul(a: &Real, b: &Real, precision: u32) -> Real {
        Self::binop(a, b, precision, |x, y| x.clone() * y)
    }

    /// `a / b`.
    ///
    /// Division by a real zero is not short-circuited here; callers (the
    /// executor) are responsible for detecting it and substituting the
    /// sentinel described in the design before this ever runs, since MPFR
    /// happily produces `inf`/`nan` honestly and that's also a valid path
    /// when the host's concrete divisor was itself a genuine zero.
    pub fn div(a: &Real, b: &Real, precision: u32) -> Real {
        Self::binop(a, b, precision, |x, y| x.clone() / y)
    }

    /// `-a`.
    pub fn neg(a: &Real, precision: u32) -> Real {
        let mut r = Float::with_val(precision, -&a.0);
        r.set_prec_round(precision, Round::Nearest);
        Real(r)
    }

    /// `|a|`.
    pub fn abs(a: &Real, precision: u32) -> Real {
        let mut r = Float::with_val(precision, &*a.0.as_abs());
        r.set_prec_round(precision, Round::Nearest);
        Real(r)
    }

    /// `sqrt(a)`.
    pub fn sqrt(a: &Real, precision: u32) -> Real {
        let mut r = Float::with_val(precision, a.0.clone());
        r.sqrt_round(Round::Nearest);
        Real(r)
    }

    /// `a ^ b` for integer-valued `b` (used by power-of opcodes).
    pub fn pow(a: &Real, b: &Real, precision: u32) -> Real {
        let mut r = Float::with_val(precision, a.0.clone());
        r.pow_assign_round(&b.0, Round::Nearest);
        r.set_prec_round(precision, Round::Nearest);
        Real(r)
    }

    /// Bits of disagreement between `self` and the concrete double `host`.
    ///
    /// Computed as the distance, in ULPs-at-double-precision, between
    /// `self` rounded to a double and `host`, expressed as `log2`. Returns
    /// `0.0` when the two agree exactly (including both being the same
    /// kind of NaN/Inf by bit pattern).
    pub fn bit_error_vs_f64(&self, host: f64) -> f64 {
        let rounded = self.to_f64();
        if rounded.to_bits() == host.to_bits() {
            return 0.0;
        }
        if rounded.is_nan() && host.is_nan() {
            return 0.0;
        }
        if rounded == host {
            return 0.0;
        }

        let diff = (rounded - host).abs();
        if diff == 0.0 || !diff.is_finite() {
            return f64::from(f64::MANTISSA_DIGITS);
        }

        let scale = rounded.abs().max(host.abs()).max(f64::MIN_POSITIVE);
        let rel = diff / scale;
        if rel == 0.0 {
            0.0
        } else {
            (-rel.log2()).max(0.0)
        }
    }
}

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_f64() {
        let r = Real::from_f64(1.5, 64);
        assert_eq!(r.to_f64(), 1.5);
    }

    #[test]
    fn arithmetic_matches_host_when_exact() {
        let p = 128;
        let a = Real::from_f64(1.0, p);
        let b = Real::from_f64(2.0, p);
        assert_eq!(Real::add(&a, &b, p).to_f64(), 3.0);
        assert_eq!(Real::mul(&a, &b, p).to_f64(), 2.0);
        assert_eq!(Real::sub(&a, &b, p).to_f64(), -1.0);
        assert_eq!(Real::div(&b, &a, p).to_f64(), 2.0);
    }

    #[test]
    fn bit_error_is_zero_for_exact_agreement() {
        let r = Real::from_f64(0.1, 200);
        assert_eq!(r.bit_error_vs_f64(0.1), 0.0);
    }

    #[test]
    fn bit_error_detects_cancellation() {
        // (1e16 + 1) - 1e16 loses all mantissa bits in f64 but not at high precision.
        let p = 200;
        let x = Real::from_f64(1e16, p);
        let one = Real::from_f64(1.0, p);
        let sum = Real::add(&x, &one, p);
        let diff = Real::sub(&sum, &x, p);
        let host_diff = (1e16_f64 + 1.0) - 1e16_f64;
        let err = diff.bit_error_vs_f64(host_diff);
        assert!(err > 40.0, "expected large cancellation error, got {err}");
    }
}
