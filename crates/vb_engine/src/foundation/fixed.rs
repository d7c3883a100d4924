//! Fixed-point arithmetic
//!
//! Spatial math runs on integers with an implicit binary point. The canonical
//! precision for coordinates is [`Fixed`] (19.13). [`FixedExt`] keeps the same
//! binary point on a 64-bit carrier so products and squared lengths do not
//! overflow. [`Fix7_9`] carries trigonometry and scale factors, [`Fix10_6`]
//! the coarse precision some hardware parameters use.
//!
//! # Conversions
//!
//! - Integer to fixed is a left shift, fixed to integer an arithmetic right shift.
//! - Float to fixed scales by `2^f` and rounds half up (`floor(x + 0.5)`).
//! - Precision changes are plain shifts.
//! - Products widen to the next larger integer before shifting down.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Errors raised by fixed-point operations
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedError {
    /// The divisor was zero
    #[error("fixed-point division by zero")]
    DivisionByZero,
}

macro_rules! fixed_point {
    ($(#[$meta:meta])* $name:ident, $raw:ty, $wide:ty, $bits:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $raw);

        impl $name {
            /// Number of fractional bits
            pub const FRACTION_BITS: u32 = $bits;
            /// Zero
            pub const ZERO: Self = Self(0);
            /// One
            pub const ONE: Self = Self(1 << $bits);

            /// Wrap a raw value
            #[must_use]
            pub const fn from_raw(raw: $raw) -> Self {
                Self(raw)
            }

            /// Raw integer representation
            #[must_use]
            pub const fn raw(self) -> $raw {
                self.0
            }

            /// Convert an integer
            #[must_use]
            pub const fn from_int(value: i32) -> Self {
                Self(((value as $wide) << $bits) as $raw)
            }

            /// Convert a float, rounding half up
            #[must_use]
            pub fn from_f32(value: f32) -> Self {
                let scaled = f64::from(value) * (1_i64 << $bits) as f64;
                Self((scaled + 0.5).floor() as $raw)
            }

            /// Integer part (arithmetic shift)
            #[must_use]
            pub const fn to_int(self) -> i32 {
                (self.0 >> $bits) as i32
            }

            /// Convert to float
            #[must_use]
            pub fn to_f32(self) -> f32 {
                (self.0 as f64 / (1_i64 << $bits) as f64) as f32
            }

            /// Multiply through a widened intermediate
            #[must_use]
            pub const fn multiply(self, rhs: Self) -> Self {
                Self(((self.0 as $wide * rhs.0 as $wide) >> $bits) as $raw)
            }

            /// Divide through a widened intermediate
            ///
            /// # Errors
            ///
            /// [`FixedError::DivisionByZero`] when `rhs` is zero.
            pub fn divide(self, rhs: Self) -> Result<Self, FixedError> {
                if 0 == rhs.0 {
                    return Err(FixedError::DivisionByZero);
                }

                Ok(Self((((self.0 as $wide) << $bits) / rhs.0 as $wide) as $raw))
            }

            /// Absolute value
            #[must_use]
            pub const fn abs(self) -> Self {
                Self(self.0.wrapping_abs())
            }

            /// Half of the value
            #[must_use]
            pub const fn half(self) -> Self {
                Self(self.0 >> 1)
            }

            /// Whether the value is exactly zero
            #[must_use]
            pub const fn is_zero(self) -> bool {
                0 == self.0
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0.wrapping_add(rhs.0))
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0.wrapping_sub(rhs.0))
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(self.0.wrapping_neg())
            }
        }

        impl Mul for $name {
            type Output = Self;

            fn mul(self, rhs: Self) -> Self {
                self.multiply(rhs)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                *self = *self + rhs;
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                *self = *self - rhs;
            }
        }
    };
}

fixed_point!(
    /// Canonical coordinate precision: 19 integer bits, 13 fractional bits
    Fixed, i32, i64, 13
);

fixed_point!(
    /// 64-bit carrier with the canonical binary point, for products and sums of products
    FixedExt, i64, i128, 13
);

fixed_point!(
    /// 7.9 precision used by the sine table and scale factors
    Fix7_9, i16, i32, 9
);

fixed_point!(
    /// 10.6 precision
    Fix10_6, i16, i32, 6
);

/// Largest representable canonical value
pub const FIXED_INFINITY: Fixed = Fixed(0x7FFF_FFFF);

/// Pixels per meter as a power of two
pub const PIXELS_PER_METER_2_POWER: u32 = 4;

/// Convert screen pixels to world units
#[must_use]
pub const fn pixels_to_meters(pixels: i32) -> Fixed {
    Fixed(pixels << (Fixed::FRACTION_BITS - PIXELS_PER_METER_2_POWER))
}

/// Convert world units to screen pixels
#[must_use]
pub const fn meters_to_pixels(meters: Fixed) -> i32 {
    meters.0 >> (Fixed::FRACTION_BITS - PIXELS_PER_METER_2_POWER)
}

impl Fixed {
    /// Widen to the extended carrier
    #[must_use]
    pub const fn to_ext(self) -> FixedExt {
        FixedExt(self.0 as i64)
    }

    /// Narrow to 7.9
    #[must_use]
    pub const fn to_fix7_9(self) -> Fix7_9 {
        Fix7_9((self.0 >> (Self::FRACTION_BITS - Fix7_9::FRACTION_BITS)) as i16)
    }

    /// Narrow to 10.6
    #[must_use]
    pub const fn to_fix10_6(self) -> Fix10_6 {
        Fix10_6((self.0 >> (Self::FRACTION_BITS - Fix10_6::FRACTION_BITS)) as i16)
    }

    /// Square through the extended carrier
    #[must_use]
    pub const fn square(self) -> FixedExt {
        self.to_ext().multiply(self.to_ext())
    }

    /// Clamp to an inclusive range
    #[must_use]
    pub fn clamp_to(self, min: Self, max: Self) -> Self {
        self.clamp(min, max)
    }
}

impl FixedExt {
    /// Narrow to the canonical precision, truncating high bits
    #[must_use]
    pub const fn to_fixed(self) -> Fixed {
        Fixed(self.0 as i32)
    }
}

impl From<Fix7_9> for Fixed {
    fn from(value: Fix7_9) -> Self {
        Self(i32::from(value.0) << (Self::FRACTION_BITS - Fix7_9::FRACTION_BITS))
    }
}

impl From<Fix10_6> for Fixed {
    fn from(value: Fix10_6) -> Self {
        Self(i32::from(value.0) << (Self::FRACTION_BITS - Fix10_6::FRACTION_BITS))
    }
}

impl From<Fixed> for FixedExt {
    fn from(value: Fixed) -> Self {
        value.to_ext()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_integer_round_trip() {
        // Whole integer range of 19.13
        for n in (-262_144..262_144).step_by(97) {
            assert_eq!(Fixed::from_int(n).to_int(), n);
        }
        assert_eq!(Fixed::from_int(262_143).to_int(), 262_143);
        assert_eq!(Fix7_9::from_int(-64).to_int(), -64);
        assert_eq!(Fix10_6::from_int(511).to_int(), 511);
    }

    #[test]
    fn test_float_round_trip_within_one_lsb() {
        let lsb = 1.0 / 8192.0;
        let mut f = -1000.0_f32;
        while f < 1000.0 {
            let back = Fixed::from_f32(f).to_f32();
            assert!((back - f).abs() <= lsb, "{f} -> {back}");
            f += 0.731;
        }
        assert_abs_diff_eq!(Fix7_9::from_f32(0.5).to_f32(), 0.5);
    }

    #[test]
    fn test_float_conversion_rounds_half_up() {
        // 1.5 LSB rounds to 2 LSB
        assert_eq!(Fixed::from_f32(1.5 / 8192.0).raw(), 2);
        assert_eq!(Fixed::from_f32(-1.0).raw(), -8192);
        assert_eq!(Fix7_9::from_f32(1.0).raw(), 0x200);
    }

    #[test]
    fn test_negative_float_conversion_rounds_half_up() {
        let lsb = 1.0 / 8192.0;
        assert_eq!(Fixed::from_f32(-2.7 * lsb).raw(), -3);
        assert_eq!(Fixed::from_f32(-2.5 * lsb).raw(), -2);
        assert_eq!(Fixed::from_f32(-2.2 * lsb).raw(), -2);
        assert_abs_diff_eq!(Fixed::from_f32(-0.75).to_f32(), -0.75);
    }

    #[test]
    fn test_to_int_shifts() {
        assert_eq!(Fixed::from_f32(3.75).to_int(), 3);
        // Arithmetic shift floors negative values
        assert_eq!(Fixed::from_f32(-3.25).to_int(), -4);
    }

    #[test]
    fn test_multiply_widens() {
        // The raw product overflows i32 but the result fits
        let a = Fixed::from_int(300);
        let b = Fixed::from_int(400);
        assert_eq!((a * b).to_int(), 120_000);

        let half = Fixed::from_f32(0.5);
        assert_eq!(half.multiply(Fixed::from_int(-7)), Fixed::from_f32(-3.5));
        assert_eq!(Fix7_9::ONE * Fix7_9::from_f32(0.25), Fix7_9::from_f32(0.25));
    }

    #[test]
    fn test_divide() {
        let a = Fixed::from_int(10);
        let b = Fixed::from_int(4);
        assert_eq!(a.divide(b), Ok(Fixed::from_f32(2.5)));
        assert_eq!(a.divide(Fixed::ZERO), Err(FixedError::DivisionByZero));
        assert_eq!(FixedExt::ONE.divide(FixedExt::ZERO), Err(FixedError::DivisionByZero));
    }

    #[test]
    fn test_precision_conversions() {
        let one = Fix7_9::ONE;
        assert_eq!(Fixed::from(one), Fixed::ONE);
        assert_eq!(Fixed::ONE.to_fix7_9(), one);
        assert_eq!(Fixed::from(Fix10_6::from_int(3)), Fixed::from_int(3));
        assert_eq!(Fixed::from_int(5).to_ext().to_fixed(), Fixed::from_int(5));
    }

    #[test]
    fn test_pixel_meter_conversions() {
        assert_eq!(pixels_to_meters(1).raw(), 512);
        assert_eq!(meters_to_pixels(pixels_to_meters(37)), 37);
        assert_eq!(meters_to_pixels(Fixed::ONE), 16);
    }
}
