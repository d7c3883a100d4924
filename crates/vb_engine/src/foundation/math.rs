//! Math utilities and types
//!
//! Fixed-point spatial primitives shared by the collision and render
//! pipelines: [`Vector3D`] positions and directions in world units,
//! [`PixelVector`] screen coordinates, [`Rotation`] in 512ths of a turn,
//! [`Scale`] factors in 7.9 and the axis-aligned [`RightBox`].

use super::fixed::{pixels_to_meters, meters_to_pixels, Fix7_9, Fixed, FixedExt};
use super::sqrt::square_root_fixed;
use super::trig;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// 3D vector in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector3D {
    /// X component
    pub x: Fixed,
    /// Y component
    pub y: Fixed,
    /// Z component
    pub z: Fixed,
}

impl Vector3D {
    /// Create a vector from its components
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// The zero vector
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO)
    }

    /// Build a vector from whole world units
    #[must_use]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_int(x), Fixed::from_int(y), Fixed::from_int(z))
    }

    /// Build a vector from float world units
    #[must_use]
    pub fn from_f32(x: f32, y: f32, z: f32) -> Self {
        Self::new(Fixed::from_f32(x), Fixed::from_f32(y), Fixed::from_f32(z))
    }

    /// Convert a pixel-space vector into world units
    #[must_use]
    pub const fn from_pixel_vector(pixels: PixelVector) -> Self {
        Self::new(
            pixels_to_meters(pixels.x as i32),
            pixels_to_meters(pixels.y as i32),
            pixels_to_meters(pixels.z as i32),
        )
    }

    /// Convert into pixel space, parallax left at zero
    #[must_use]
    pub const fn to_pixel_vector(self) -> PixelVector {
        PixelVector {
            x: meters_to_pixels(self.x) as i16,
            y: meters_to_pixels(self.y) as i16,
            z: meters_to_pixels(self.z) as i16,
            parallax: 0,
        }
    }

    /// Components as floats, for diagnostics
    #[must_use]
    pub fn to_f32_array(self) -> [f32; 3] {
        [self.x.to_f32(), self.y.to_f32(), self.z.to_f32()]
    }

    /// Whether every component is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.x.is_zero() && self.y.is_zero() && self.z.is_zero()
    }

    /// Vector pointing from `from` to `to`
    #[must_use]
    pub fn get(from: Self, to: Self) -> Self {
        to - from
    }

    /// Midpoint of two vectors
    #[must_use]
    pub const fn intermediate(a: Self, b: Self) -> Self {
        Self::new(
            Fixed((a.x.0 + b.x.0) >> 1),
            Fixed((a.y.0 + b.y.0) >> 1),
            Fixed((a.z.0 + b.z.0) >> 1),
        )
    }

    /// Multiply every component by a scalar
    #[must_use]
    pub const fn scalar_product(self, scalar: Fixed) -> Self {
        Self::new(self.x.multiply(scalar), self.y.multiply(scalar), self.z.multiply(scalar))
    }

    /// Divide every component by a scalar; a zero divisor yields the zero vector
    #[must_use]
    pub fn scalar_division(self, scalar: Fixed) -> Self {
        let divide = |component: Fixed| component.divide(scalar).unwrap_or(Fixed::ZERO);

        if scalar.is_zero() {
            return Self::zero();
        }

        Self::new(divide(self.x), divide(self.y), divide(self.z))
    }

    /// Apply 7.9 scale factors
    #[must_use]
    pub fn scale(self, scale: Scale) -> Self {
        Self::new(
            self.x.multiply(Fixed::from(scale.x)),
            self.y.multiply(Fixed::from(scale.y)),
            self.z.multiply(Fixed::from(scale.z)),
        )
    }

    /// Dot product on the extended carrier
    #[must_use]
    pub fn dot_product(a: Self, b: Self) -> FixedExt {
        a.x.to_ext().multiply(b.x.to_ext())
            + a.y.to_ext().multiply(b.y.to_ext())
            + a.z.to_ext().multiply(b.z.to_ext())
    }

    /// Squared length on the extended carrier
    #[must_use]
    pub fn square_length(self) -> FixedExt {
        Self::dot_product(self, self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> Fixed {
        square_root_fixed(self.square_length())
    }

    /// Unit vector in the same direction; the zero vector stays zero
    #[must_use]
    pub fn normalize(self) -> Self {
        self.scalar_division(self.length())
    }

    /// Cross product
    #[must_use]
    pub const fn cross_product(a: Self, b: Self) -> Self {
        Self::new(
            Fixed(a.y.multiply(b.z).0 - a.z.multiply(b.y).0),
            Fixed(a.z.multiply(b.x).0 - a.x.multiply(b.z).0),
            Fixed(a.x.multiply(b.y).0 - a.y.multiply(b.x).0),
        )
    }

    /// Normal of the plane through three points
    #[must_use]
    pub fn plane_normal(a: Self, b: Self, c: Self) -> Self {
        Self::cross_product(Self::get(a, b), Self::get(a, c))
    }

    /// Rotate 90 degrees inside the XY plane
    #[must_use]
    pub fn perpendicular_z_plane(self, left: bool) -> Self {
        if left {
            Self::new(-self.y, self.x, self.z)
        } else {
            Self::new(self.y, -self.x, self.z)
        }
    }

    /// Project `p` onto the line through `a` and `b`
    ///
    /// A degenerate segment snaps the components along which `a` and `b`
    /// coincide and leaves the rest of `p` untouched.
    #[must_use]
    pub fn project_onto(p: Self, a: Self, b: Self) -> Self {
        let ap = Self::get(a, p);
        let ab = Self::get(a, b);
        let dot_ap_ab = Self::dot_product(ap, ab);
        let dot_ab_ab = Self::dot_product(ab, ab);

        let Ok(factor) = dot_ap_ab.divide(dot_ab_ab) else {
            let mut snapped = p;

            if a.x == b.x {
                snapped.x = a.x;
            }

            if a.y == b.y {
                snapped.y = a.y;
            }

            if a.z == b.z {
                snapped.z = a.z;
            }

            return snapped;
        };

        let along = |component: Fixed| component.to_ext().multiply(factor).to_fixed();

        Self::new(a.x + along(ab.x), a.y + along(ab.y), a.z + along(ab.z))
    }

    /// `number` lies between the two limits, inclusive, in either order
    ///
    /// Folds the two-sided comparison into one unsigned comparison.
    #[must_use]
    pub const fn is_value_in_range(number: Fixed, limit_a: Fixed, limit_b: Fixed) -> bool {
        let (low, high) = if limit_a.0 < limit_b.0 { (limit_a.0, limit_b.0) } else { (limit_b.0, limit_a.0) };

        (number.0.wrapping_sub(low) as u32) <= (high.wrapping_sub(low) as u32)
    }

    /// `p` lies inside the box spanned by `a` and `b`
    #[must_use]
    pub const fn is_vector_inside_line(p: Self, a: Self, b: Self) -> bool {
        Self::is_value_in_range(p.x, a.x, b.x)
            && Self::is_value_in_range(p.y, a.y, b.y)
            && Self::is_value_in_range(p.z, a.z, b.z)
    }

    fn side(a: Self, b: Self, p: Self) -> FixedExt {
        (b.x - a.x).to_ext().multiply((p.y - a.y).to_ext()) - (b.y - a.y).to_ext().multiply((p.x - a.x).to_ext())
    }

    /// `p` is on the left of the directed line `a -> b`
    #[must_use]
    pub fn is_left(a: Self, b: Self, p: Self) -> bool {
        0 < Self::side(a, b, p).raw()
    }

    /// `p` is on the right of the directed line `a -> b`
    #[must_use]
    pub fn is_right(a: Self, b: Self, p: Self) -> bool {
        0 > Self::side(a, b, p).raw()
    }

    /// Rotate around the X axis
    #[must_use]
    pub fn rotate_x_axis(self, angle: i16) -> Self {
        let (sin, cos) = (Fixed::from(trig::sin(angle)), Fixed::from(trig::cos(angle)));

        Self::new(self.x, self.y * cos - self.z * sin, self.y * sin + self.z * cos)
    }

    /// Rotate around the Y axis
    #[must_use]
    pub fn rotate_y_axis(self, angle: i16) -> Self {
        let (sin, cos) = (Fixed::from(trig::sin(angle)), Fixed::from(trig::cos(angle)));

        Self::new(self.x * cos + self.z * sin, self.y, -(self.x * sin) + self.z * cos)
    }

    /// Rotate around the Z axis
    #[must_use]
    pub fn rotate_z_axis(self, angle: i16) -> Self {
        let (sin, cos) = (Fixed::from(trig::sin(angle)), Fixed::from(trig::cos(angle)));

        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos, self.z)
    }

    /// Apply a rotation, X then Y then Z
    #[must_use]
    pub fn rotate(self, rotation: Rotation) -> Self {
        let mut result = self;

        if 0 != rotation.x {
            result = result.rotate_x_axis(rotation.x);
        }

        if 0 != rotation.y {
            result = result.rotate_y_axis(rotation.y);
        }

        if 0 != rotation.z {
            result = result.rotate_z_axis(rotation.z);
        }

        result
    }
}

impl Add for Vector3D {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3D {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3D {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vector3D {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vector3D {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Screen-space position in pixels plus stereo parallax
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelVector {
    /// Horizontal pixel
    pub x: i16,
    /// Vertical pixel
    pub y: i16,
    /// Depth
    pub z: i16,
    /// Per-eye horizontal offset
    pub parallax: i16,
}

impl PixelVector {
    /// Create a pixel vector
    #[must_use]
    pub const fn new(x: i16, y: i16, z: i16, parallax: i16) -> Self {
        Self { x, y, z, parallax }
    }
}

impl Add for PixelVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x.wrapping_add(rhs.x),
            self.y.wrapping_add(rhs.y),
            self.z.wrapping_add(rhs.z),
            self.parallax.wrapping_add(rhs.parallax),
        )
    }
}

/// Rotation in 512ths of a turn per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rotation {
    /// Around X
    pub x: i16,
    /// Around Y
    pub y: i16,
    /// Around Z
    pub z: i16,
}

impl Rotation {
    /// Create a rotation
    #[must_use]
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// No rotation
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Scale factors in 7.9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scale {
    /// X factor
    pub x: Fix7_9,
    /// Y factor
    pub y: Fix7_9,
    /// Z factor
    pub z: Fix7_9,
}

impl Scale {
    /// Unit scale
    #[must_use]
    pub const fn unit() -> Self {
        Self { x: Fix7_9::ONE, y: Fix7_9::ONE, z: Fix7_9::ONE }
    }

    /// Largest of the three factors
    #[must_use]
    pub fn max_factor(self) -> Fix7_9 {
        self.x.max(self.y).max(self.z)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::unit()
    }
}

/// Size in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub x: Fixed,
    /// Height
    pub y: Fixed,
    /// Depth
    pub z: Fixed,
}

impl Size {
    /// Size from pixel dimensions
    #[must_use]
    pub const fn from_pixels(x: i32, y: i32, z: i32) -> Self {
        Self { x: pixels_to_meters(x), y: pixels_to_meters(y), z: pixels_to_meters(z) }
    }

    /// Size from whole world units
    #[must_use]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self { x: Fixed::from_int(x), y: Fixed::from_int(y), z: Fixed::from_int(z) }
    }

    /// Largest dimension
    #[must_use]
    pub fn max_dimension(self) -> Fixed {
        self.x.max(self.y).max(self.z)
    }
}

/// Axis-aligned box in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RightBox {
    /// Left
    pub x0: Fixed,
    /// Top
    pub y0: Fixed,
    /// Near
    pub z0: Fixed,
    /// Right
    pub x1: Fixed,
    /// Bottom
    pub y1: Fixed,
    /// Far
    pub z1: Fixed,
}

impl RightBox {
    /// Box spanning two corners
    #[must_use]
    pub const fn new(x0: Fixed, y0: Fixed, z0: Fixed, x1: Fixed, y1: Fixed, z1: Fixed) -> Self {
        Self { x0, y0, z0, x1, y1, z1 }
    }

    /// Box of the given size centered on `displacement`
    #[must_use]
    pub fn centered(size: Size, displacement: Vector3D) -> Self {
        let (hx, hy, hz) = (size.x.half(), size.y.half(), size.z.half());

        Self::new(
            displacement.x - hx,
            displacement.y - hy,
            displacement.z - hz,
            displacement.x + hx,
            displacement.y + hy,
            displacement.z + hz,
        )
    }

    /// Width, height and depth
    #[must_use]
    pub fn size(&self) -> Size {
        Size { x: self.x1 - self.x0, y: self.y1 - self.y0, z: self.z1 - self.z0 }
    }

    /// Translate by `offset`
    #[must_use]
    pub fn translate(&self, offset: Vector3D) -> Self {
        Self::new(
            self.x0 + offset.x,
            self.y0 + offset.y,
            self.z0 + offset.z,
            self.x1 + offset.x,
            self.y1 + offset.y,
            self.z1 + offset.z,
        )
    }

    /// Whether two boxes overlap (touching edges do not count)
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x0 < other.x1
            && other.x0 < self.x1
            && self.y0 < other.y1
            && other.y0 < self.y1
            && self.z0 < other.z1
            && other.z0 < self.z1
    }

    /// Whether `point` lies inside, inclusive
    #[must_use]
    pub fn contains(&self, point: Vector3D) -> bool {
        Vector3D::is_value_in_range(point.x, self.x0, self.x1)
            && Vector3D::is_value_in_range(point.y, self.y0, self.y1)
            && Vector3D::is_value_in_range(point.z, self.z0, self.z1)
    }
}

/// Common math constants
pub mod constants {
    use crate::foundation::fixed::{pixels_to_meters, Fixed};

    /// One pixel in world units
    pub const PIXEL: Fixed = pixels_to_meters(1);

    /// Screen width in pixels
    pub const SCREEN_WIDTH: i16 = 384;

    /// Screen height in pixels
    pub const SCREEN_HEIGHT: i16 = 224;

    /// Screen height in 8x8 characters
    pub const SCREEN_HEIGHT_IN_CHARS: i16 = SCREEN_HEIGHT >> 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector3D::from_ints(1, 2, 3);
        let b = Vector3D::from_ints(4, 6, 8);
        assert_eq!(a + b, Vector3D::from_ints(5, 8, 11));
        assert_eq!(Vector3D::get(a, b), Vector3D::from_ints(3, 4, 5));
        assert_eq!(Vector3D::intermediate(a, b), Vector3D::from_f32(2.5, 4.0, 5.5));
        assert_eq!(-a, Vector3D::from_ints(-1, -2, -3));
    }

    #[test]
    fn test_dot_and_length() {
        let v = Vector3D::from_ints(3, 4, 0);
        assert_eq!(v.square_length(), FixedExt::from_int(25));
        assert_eq!(v.length(), Fixed::from_int(5));
        assert_eq!(Vector3D::dot_product(v, Vector3D::from_ints(1, 1, 1)), FixedExt::from_int(7));
    }

    #[test]
    fn test_normalize() {
        let unit = Vector3D::from_ints(0, -7, 0).normalize();
        assert_eq!(unit, Vector3D::from_ints(0, -1, 0));
        // Zero divisor yields zero
        assert_eq!(Vector3D::zero().normalize(), Vector3D::zero());
    }

    #[test]
    fn test_perpendicular_z_plane() {
        let v = Vector3D::from_ints(1, 2, 3);
        assert_eq!(v.perpendicular_z_plane(true), Vector3D::from_ints(-2, 1, 3));
        assert_eq!(v.perpendicular_z_plane(false), Vector3D::from_ints(2, -1, 3));
    }

    #[test]
    fn test_project_onto() {
        let a = Vector3D::from_ints(0, 0, 0);
        let b = Vector3D::from_ints(10, 0, 0);
        let p = Vector3D::from_ints(4, 5, 0);
        assert_eq!(Vector3D::project_onto(p, a, b), Vector3D::from_ints(4, 0, 0));

        // Degenerate segment snaps matching components
        let c = Vector3D::from_ints(2, 2, 2);
        assert_eq!(Vector3D::project_onto(p, c, c), c);
    }

    #[test]
    fn test_value_in_range_both_orders() {
        let (lo, hi) = (Fixed::from_int(-2), Fixed::from_int(3));
        assert!(Vector3D::is_value_in_range(Fixed::ZERO, lo, hi));
        assert!(Vector3D::is_value_in_range(Fixed::ZERO, hi, lo));
        assert!(Vector3D::is_value_in_range(hi, lo, hi));
        assert!(!Vector3D::is_value_in_range(Fixed::from_int(4), lo, hi));
        assert!(!Vector3D::is_value_in_range(Fixed::from_int(-3), hi, lo));
    }

    #[test]
    fn test_sidedness() {
        let a = Vector3D::from_ints(0, 0, 0);
        let b = Vector3D::from_ints(1, 0, 0);
        assert!(Vector3D::is_left(a, b, Vector3D::from_ints(0, 1, 0)));
        assert!(Vector3D::is_right(a, b, Vector3D::from_ints(0, -1, 0)));
    }

    #[test]
    fn test_rotate_z_quarter_turn() {
        let v = Vector3D::from_ints(2, 0, 0).rotate_z_axis(128);
        assert_eq!(v, Vector3D::from_ints(0, 2, 0));
        let w = Vector3D::from_ints(0, 0, 2).rotate(Rotation::new(128, 0, 0));
        assert_eq!(w, Vector3D::from_ints(0, -2, 0));
    }

    #[test]
    fn test_cross_product_plane_normal() {
        let n = Vector3D::plane_normal(
            Vector3D::zero(),
            Vector3D::from_ints(1, 0, 0),
            Vector3D::from_ints(0, 1, 0),
        );
        assert_eq!(n, Vector3D::from_ints(0, 0, 1));
    }

    #[test]
    fn test_right_box() {
        let rb = RightBox::centered(Size::from_ints(4, 2, 2), Vector3D::zero());
        assert_eq!(rb.x0, Fixed::from_int(-2));
        assert_eq!(rb.size(), Size::from_ints(4, 2, 2));
        let moved = rb.translate(Vector3D::from_ints(3, 0, 0));
        assert!(rb.intersects(&moved));
        assert!(!rb.intersects(&rb.translate(Vector3D::from_ints(4, 0, 0))));
        assert!(moved.contains(Vector3D::from_ints(5, 1, 0)));
    }

    #[test]
    fn test_pixel_conversion() {
        let px = PixelVector::new(16, -32, 48, 0);
        let v = Vector3D::from_pixel_vector(px);
        assert_eq!(v, Vector3D::from_ints(1, -2, 3));
        assert_eq!(v.to_pixel_vector(), px);
    }
}
