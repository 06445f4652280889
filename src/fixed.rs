// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! 24.8 signed fixed-point arithmetic
//!
//! All glyph-outline coordinates and every intermediate hinting computation
//! use this type rather than `f32`/`f64` so that two runs of the engine on
//! the same input produce byte-identical output regardless of platform
//! floating-point rounding. One unit equals `1/256` of an em-unit.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A 24.8 signed fixed-point number, stored as `value * 256` in an `i32`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(pub i32);

/// Number of fractional bits.
pub const FIXED_SHIFT: i32 = 8;
/// `1.0` in 24.8 fixed-point.
pub const FIXED_ONE: Fixed = Fixed(1 << FIXED_SHIFT);
/// `2.0` in 24.8 fixed-point.
pub const FIXED_TWO: Fixed = Fixed(2 << FIXED_SHIFT);
/// `0.5` in 24.8 fixed-point.
pub const FIXED_HALF: Fixed = Fixed(1 << (FIXED_SHIFT - 1));

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    /// Build a `Fixed` from an integer number of units (`n << 8`).
    #[inline]
    pub const fn from_int(n: i32) -> Fixed {
        Fixed(n << FIXED_SHIFT)
    }

    /// Build a `Fixed` from a floating-point value, for reporting / parsing
    /// bez-format decimals. Not used in the hinting hot path.
    #[inline]
    pub fn from_f64(f: f64) -> Fixed {
        Fixed((f * 256.0).round() as i32)
    }

    /// Convert to `f64`, for reporting only.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 256.0
    }

    #[inline]
    pub fn abs(self) -> Fixed {
        Fixed(self.0.abs())
    }

    /// Truncate toward zero to a whole number of units (the integer part,
    /// dropping the fraction — matches the source's `FTrunc`).
    #[inline]
    pub fn trunc(self) -> i32 {
        self.0 / 256
    }

    /// Round to the nearest whole unit.
    ///
    /// For positive `x` this is `(x + 128) >> 8`; for negative `x` it is the
    /// symmetric operation (`floor(x + 0.5)` with ties away from zero on the
    /// negative side), matching `FRnd` in the source.
    #[inline]
    pub fn round_nearest(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + 128) >> 8
        } else {
            -(((-self.0) + 128) >> 8)
        }
    }

    /// Half of this value, rounded down to a whole unit (`FHalfRnd`).
    #[inline]
    pub fn half_round(self) -> Fixed {
        Fixed((self.0 + (1 << 7)) & !0xFF)
    }

    /// Checked multiply using a 64-bit intermediate to avoid overflow; the
    /// source multiplies four coordinate deltas together in pair evaluation,
    /// so a 32-bit intermediate is not safe.
    #[inline]
    pub fn mul(self, rhs: Fixed) -> Fixed {
        let v = (self.0 as i64 * rhs.0 as i64) >> FIXED_SHIFT;
        Fixed(v as i32)
    }

    #[inline]
    pub fn div(self, rhs: Fixed) -> Fixed {
        debug_assert!(rhs.0 != 0, "division by zero Fixed");
        let v = ((self.0 as i64) << FIXED_SHIFT) / rhs.0 as i64;
        Fixed(v as i32)
    }

    #[inline]
    pub fn min(self, rhs: Fixed) -> Fixed {
        if self.0 <= rhs.0 { self } else { rhs }
    }

    #[inline]
    pub fn max(self, rhs: Fixed) -> Fixed {
        if self.0 >= rhs.0 { self } else { rhs }
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}
impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 += rhs.0;
    }
}
impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}
impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, rhs: Fixed) {
        self.0 -= rhs.0;
    }
}
impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}
/// `Mul`/`Div` via operators forward to the checked 64-bit helpers above.
impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed::mul(self, rhs)
    }
}
impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed::div(self, rhs)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}
impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

/// A point in glyph space.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct Point {
    pub x: Fixed,
    pub y: Fixed,
}

impl Point {
    pub const ZERO: Point = Point {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    #[inline]
    pub fn new(x: Fixed, y: Fixed) -> Point {
        Point { x, y }
    }
}

/// An axis-aligned bounding box in glyph space; `is_empty` distinguishes the
/// not-yet-initialized state from a (legally) zero-area box.
#[derive(Clone, Copy, Debug)]
pub struct BBox {
    pub ll: Point,
    pub ur: Point,
    empty: bool,
}

impl Default for BBox {
    fn default() -> Self {
        BBox::empty()
    }
}

impl BBox {
    pub fn empty() -> BBox {
        BBox {
            ll: Point::new(Fixed(i32::MAX), Fixed(i32::MAX)),
            ur: Point::new(Fixed(i32::MIN), Fixed(i32::MIN)),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn add_point(&mut self, p: Point) {
        if self.empty {
            self.ll = p;
            self.ur = p;
            self.empty = false;
            return;
        }
        self.ll.x = self.ll.x.min(p.x);
        self.ll.y = self.ll.y.min(p.y);
        self.ur.x = self.ur.x.max(p.x);
        self.ur.y = self.ur.y.max(p.y);
    }

    pub fn union(&mut self, other: &BBox) {
        if other.empty {
            return;
        }
        self.add_point(other.ll);
        self.add_point(other.ur);
    }

    /// Does `self` fully contain `other` (inclusive)?
    pub fn contains(&self, other: &BBox) -> bool {
        if self.empty || other.empty {
            return false;
        }
        self.ll.x <= other.ll.x
            && self.ll.y <= other.ll.y
            && self.ur.x >= other.ur.x
            && self.ur.y >= other.ur.y
    }

    pub fn width(&self) -> Fixed {
        self.ur.x - self.ll.x
    }
    pub fn height(&self) -> Fixed {
        self.ur.y - self.ll.y
    }
}

/// Total order used when sorting segments/values by location: compares
/// `Fixed` values directly (they are already `Ord`), this helper just
/// documents the intent at call sites that sort tuples of `Fixed`.
#[inline]
pub fn cmp_fixed(a: Fixed, b: Fixed) -> Ordering {
    a.cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_nearest_matches_symmetric_half_up() {
        assert_eq!(Fixed::from_int(3).round_nearest(), 3);
        assert_eq!(Fixed(3 * 256 + 128).round_nearest(), 4);
        assert_eq!(Fixed(3 * 256 + 127).round_nearest(), 3);
        assert_eq!(Fixed(-(3 * 256 + 128)).round_nearest(), -4);
        assert_eq!(Fixed(-(3 * 256 + 127)).round_nearest(), -3);
    }

    #[test]
    fn mul_uses_64_bit_intermediate() {
        let big = Fixed::from_int(20_000);
        let r = big.mul(big);
        assert_eq!(r, Fixed::from_int(400_000_000));
    }

    #[test]
    fn bbox_contains() {
        let mut outer = BBox::empty();
        outer.add_point(Point::new(Fixed::from_int(0), Fixed::from_int(0)));
        outer.add_point(Point::new(Fixed::from_int(100), Fixed::from_int(100)));
        let mut inner = BBox::empty();
        inner.add_point(Point::new(Fixed::from_int(10), Fixed::from_int(10)));
        inner.add_point(Point::new(Fixed::from_int(20), Fixed::from_int(20)));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }
}
