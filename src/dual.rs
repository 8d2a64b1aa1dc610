//! Forward-mode dual numbers.
//!
//! A [`Dual`] carries `f(x)` together with `df/dx` for a single seeded
//! variable. Every operation applies the chain rule exactly; there is no
//! finite-difference approximation anywhere in this module.
//!
//! Arithmetic breakdowns (division by an exact zero, non-positive base of a
//! dual power) produce NaN in both components instead of panicking, so that a
//! caller evaluating a whole cycle can detect the failure once at the end.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

#[derive(Clone, Copy, Debug, Default)]
pub struct Dual {
    pub val: f64,
    pub der: f64,
}

impl Dual {
    pub const fn new(val: f64, der: f64) -> Self {
        Self { val, der }
    }

    /// A quantity that does not depend on the seeded variable.
    pub const fn constant(val: f64) -> Self {
        Self { val, der: 0.0 }
    }

    /// The seeded (independent) variable itself.
    pub const fn variable(val: f64) -> Self {
        Self { val, der: 1.0 }
    }

    fn nan() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub fn is_finite(self) -> bool {
        self.val.is_finite() && self.der.is_finite()
    }

    /// `a^n` for integer `n`.
    pub fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Self::constant(1.0);
        }
        if self.der == 0.0 {
            return Self::constant(self.val.powi(n));
        }
        Self::new(self.val.powi(n), f64::from(n) * self.val.powi(n - 1) * self.der)
    }

    /// `a^r` for a plain real exponent.
    pub fn powf(self, r: f64) -> Self {
        if self.der == 0.0 {
            return Self::constant(self.val.powf(r));
        }
        Self::new(self.val.powf(r), r * self.val.powf(r - 1.0) * self.der)
    }

    /// `a^b` with both operands dual. Requires `a > 0`.
    pub fn pow(self, b: Dual) -> Self {
        if !(self.val > 0.0) {
            return Self::nan();
        }
        let v = self.val.powf(b.val);
        Self::new(v, v * (b.val * self.der / self.val + self.val.ln() * b.der))
    }

    pub fn sqrt(self) -> Self {
        let s = self.val.sqrt();
        if self.der == 0.0 {
            return Self::constant(s);
        }
        Self::new(s, self.der / (2.0 * s))
    }

    pub fn exp(self) -> Self {
        let e = self.val.exp();
        Self::new(e, e * self.der)
    }

    pub fn ln(self) -> Self {
        Self::new(self.val.ln(), self.der / self.val)
    }

    pub fn sin(self) -> Self {
        Self::new(self.val.sin(), self.val.cos() * self.der)
    }

    pub fn cos(self) -> Self {
        Self::new(self.val.cos(), -self.val.sin() * self.der)
    }

    /// `|a|`. The derivative uses `sign(a)` with `sign(0) = +1`; at the kink
    /// this is a convention, not a derivative.
    pub fn abs(self) -> Self {
        let sign = if self.val >= 0.0 { 1.0 } else { -1.0 };
        Self::new(self.val.abs(), sign * self.der)
    }

    /// Returns whichever operand has the larger value, derivative included.
    /// Ties keep `self`.
    pub fn max(self, other: Dual) -> Self {
        if other.val > self.val {
            other
        } else {
            self
        }
    }

    /// Returns whichever operand has the smaller value, derivative included.
    /// Ties keep `self`.
    pub fn min(self, other: Dual) -> Self {
        if other.val < self.val {
            other
        } else {
            self
        }
    }
}

impl From<f64> for Dual {
    fn from(val: f64) -> Self {
        Self::constant(val)
    }
}

// Equality and ordering look at the value component only.
impl PartialEq for Dual {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.val.partial_cmp(&other.val)
    }
}

impl PartialEq<f64> for Dual {
    fn eq(&self, other: &f64) -> bool {
        self.val == *other
    }
}

impl PartialOrd<f64> for Dual {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.val.partial_cmp(other)
    }
}

impl Neg for Dual {
    type Output = Dual;

    fn neg(self) -> Dual {
        Dual::new(-self.val, -self.der)
    }
}

impl Add for Dual {
    type Output = Dual;

    fn add(self, rhs: Dual) -> Dual {
        Dual::new(self.val + rhs.val, self.der + rhs.der)
    }
}

impl Sub for Dual {
    type Output = Dual;

    fn sub(self, rhs: Dual) -> Dual {
        Dual::new(self.val - rhs.val, self.der - rhs.der)
    }
}

impl Mul for Dual {
    type Output = Dual;

    fn mul(self, rhs: Dual) -> Dual {
        Dual::new(self.val * rhs.val, self.val * rhs.der + self.der * rhs.val)
    }
}

impl Div for Dual {
    type Output = Dual;

    fn div(self, rhs: Dual) -> Dual {
        if rhs.val == 0.0 {
            return Dual::nan();
        }
        Dual::new(
            self.val / rhs.val,
            (rhs.val * self.der - self.val * rhs.der) / (rhs.val * rhs.val),
        )
    }
}

// Mixed dual/scalar forms. The scalar is a constant, so these reduce to the
// dual-dual rules with a zero derivative on the scalar side.
macro_rules! scalar_ops {
    ($($trait:ident $method:ident),*) => {$(
        impl $trait<f64> for Dual {
            type Output = Dual;

            fn $method(self, rhs: f64) -> Dual {
                $trait::$method(self, Dual::constant(rhs))
            }
        }

        impl $trait<Dual> for f64 {
            type Output = Dual;

            fn $method(self, rhs: Dual) -> Dual {
                $trait::$method(Dual::constant(self), rhs)
            }
        }
    )*};
}

scalar_ops!(Add add, Sub sub, Mul mul, Div div);

impl AddAssign for Dual {
    fn add_assign(&mut self, rhs: Dual) {
        *self = *self + rhs;
    }
}

impl SubAssign for Dual {
    fn sub_assign(&mut self, rhs: Dual) {
        *self = *self - rhs;
    }
}

impl MulAssign for Dual {
    fn mul_assign(&mut self, rhs: Dual) {
        *self = *self * rhs;
    }
}

/// Arithmetic shared by plain `f64` and [`Dual`], so that a relation can be
/// written once and evaluated either way.
pub trait Scalar:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + PartialOrd<f64>
{
    fn lift(v: f64) -> Self;
    fn value(self) -> f64;
    fn powf(self, r: f64) -> Self;
    fn sqrt(self) -> Self;
}

impl Scalar for f64 {
    fn lift(v: f64) -> Self {
        v
    }

    fn value(self) -> f64 {
        self
    }

    fn powf(self, r: f64) -> Self {
        f64::powf(self, r)
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
}

impl Scalar for Dual {
    fn lift(v: f64) -> Self {
        Dual::constant(v)
    }

    fn value(self) -> f64 {
        self.val
    }

    fn powf(self, r: f64) -> Self {
        Dual::powf(self, r)
    }

    fn sqrt(self) -> Self {
        Dual::sqrt(self)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn product_rule_matches_finite_difference(x in 0.5_f64..5.0, y in 0.5_f64..5.0) {
            // f(x) = x * (x + y) / sqrt(x), derivative checked by central difference
            let f = |v: f64| v * (v + y) / v.sqrt();
            let d = {
                let xv = Dual::variable(x);
                xv * (xv + y) / xv.sqrt()
            };
            let h = 1e-6 * x;
            let fd = (f(x + h) - f(x - h)) / (2.0 * h);
            prop_assert!((d.der - fd).abs() <= 1e-5 * fd.abs().max(1.0));
        }

        #[test]
        fn exp_ln_roundtrip_derivative_is_one(x in 0.1_f64..10.0) {
            let d = Dual::variable(x).ln().exp();
            prop_assert!((d.val - x).abs() < 1e-9 * x);
            prop_assert!((d.der - 1.0).abs() < 1e-9);
        }
    }
}
