//! Collision results and projection intervals

use crate::foundation::collections::ShapeId;
use crate::foundation::fixed::Fixed;
use crate::foundation::math::Vector3D;

/// Minimum displacement that separates two shapes
///
/// A zero magnitude means the shapes do not overlap, or that the overlap has
/// no meaningful separation (containment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolutionVector {
    /// Unit direction to move the requesting shape along
    pub direction: Vector3D,
    /// Distance to move
    pub magnitude: Fixed,
}

impl SolutionVector {
    /// The empty solution
    #[must_use]
    pub const fn zero() -> Self {
        Self { direction: Vector3D::zero(), magnitude: Fixed::ZERO }
    }

    /// Create a solution
    #[must_use]
    pub const fn new(direction: Vector3D, magnitude: Fixed) -> Self {
        Self { direction, magnitude }
    }

    /// Whether there is anything to resolve
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    /// Same magnitude, opposite direction
    #[must_use]
    pub fn reversed(self) -> Self {
        Self { direction: -self.direction, magnitude: self.magnitude }
    }

    /// Displacement that resolves the overlap
    #[must_use]
    pub const fn displacement(&self) -> Vector3D {
        self.direction.scalar_product(self.magnitude)
    }
}

/// Outcome of one pairwise overlap test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionInformation {
    /// The shape that asked
    pub shape: ShapeId,
    /// The shape it was tested against
    pub colliding_shape: ShapeId,
    /// How to separate them, from the asking shape's point of view
    pub solution_vector: SolutionVector,
}

/// Per-pair collision state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionResult {
    /// Not overlapping and not tracked
    NoCollision,
    /// Overlap started this frame
    Enter,
    /// Overlap continues
    Update,
    /// Overlap ended this frame
    Exit,
}

/// Result of [`crate::physics::ShapeArena::collides`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// State transition
    pub result: CollisionResult,
    /// Pair and solution
    pub information: CollisionInformation,
}

/// Closed interval of a projection onto an axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projection {
    /// Lower end
    pub min: Fixed,
    /// Upper end
    pub max: Fixed,
}

impl Projection {
    /// Create an interval, ordering the ends
    #[must_use]
    pub fn new(a: Fixed, b: Fixed) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Signed gap to `other`; negative values are overlap depths
    #[must_use]
    pub fn interval_distance(&self, other: &Self) -> Fixed {
        if self.min < other.min {
            other.min - self.max
        } else {
            self.min - other.max
        }
    }
}
