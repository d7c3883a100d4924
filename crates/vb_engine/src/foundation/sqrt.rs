//! Square roots
//!
//! The float path is the classic bit-level inverse square root: the float's
//! bits are reinterpreted as an integer with [`f32::to_bits`], the magic
//! constant is subtracted, and one Newton-Raphson step refines the estimate.
//!
//! The fixed path seeds from the float estimate and polishes it with integer
//! Newton steps, so penetration depths derived from it are exact to the last
//! bit of the canonical precision.

use super::fixed::{Fixed, FixedExt};

const MAGIC: u32 = 0x5f37_59df;

/// Approximate `1 / sqrt(x)`
#[must_use]
pub fn inverse_square_root(x: f32) -> f32 {
    let half = x * 0.5;
    let y = f32::from_bits(MAGIC.wrapping_sub(x.to_bits() >> 1));

    y * (1.5 - half * y * y)
}

/// Approximate `sqrt(x)`; zero for non-positive input
#[must_use]
pub fn square_root(x: f32) -> f32 {
    if 0.0 >= x {
        return 0.0;
    }

    x * inverse_square_root(x)
}

/// Square root of an extended fixed value, as a canonical fixed value
///
/// Returns the floor of the exact root in 19.13; non-positive input yields zero.
#[must_use]
pub fn square_root_fixed(radicand: FixedExt) -> Fixed {
    if 0 >= radicand.raw() {
        return Fixed::ZERO;
    }

    // sqrt(raw / 2^13) * 2^13 == sqrt(raw * 2^13)
    let target = (radicand.raw() as u128) << Fixed::FRACTION_BITS;
    let estimate = f64::from(square_root(radicand.to_f32())) * f64::from(1_u32 << Fixed::FRACTION_BITS);
    let mut root = (estimate as u128).max(1);

    for _ in 0..4 {
        root = (root + target / root) >> 1;
    }

    while root * root > target {
        root -= 1;
    }

    while (root + 1) * (root + 1) <= target {
        root += 1;
    }

    Fixed(i32::try_from(root).unwrap_or(i32::MAX))
}
