//! Pairwise overlap tests
//!
//! [`test_overlap`] dispatches on both shape variants. Every solution is
//! expressed from the requester's point of view: applying
//! `direction * magnitude` to the requester separates the pair. Mirrored
//! cells swap the arguments and reverse the solution.
//!
//! `None` means no overlap. `Some` with a zero solution means the pair
//! overlaps without a separating move, as when a box escapes an inverse box.

use crate::foundation::fixed::{pixels_to_meters, Fixed, FIXED_INFINITY};
use crate::foundation::math::Vector3D;
use crate::physics::collision::primitives::{Projection, SolutionVector};
use crate::physics::collision::shape::{
    project_vertexes, BallShape, BoxShape, LineFieldShape, ShapeKind, BOX_NORMALS,
};

/// Test `requester` against `other`, growing the requester by `size_delta`
/// for the duration of the test
#[must_use]
pub fn test_overlap(requester: &ShapeKind, other: &ShapeKind, size_delta: Fixed) -> Option<SolutionVector> {
    if size_delta.is_zero() {
        return dispatch(requester, other);
    }

    let mut resized = *requester;
    resized.resize(size_delta);

    dispatch(&resized, other)
}

fn dispatch(requester: &ShapeKind, other: &ShapeKind) -> Option<SolutionVector> {
    match (requester, other) {
        (ShapeKind::Box(a), ShapeKind::Box(b)) => box_overlaps_box(a, b),
        (ShapeKind::Box(a), ShapeKind::InverseBox(b)) => box_escapes_inverse_box(a, b),
        (ShapeKind::Box(a), ShapeKind::Ball(b)) => box_overlaps_ball(a, b),
        (ShapeKind::InverseBox(a), ShapeKind::Box(b)) => box_escapes_inverse_box(b, a).map(SolutionVector::reversed),
        (ShapeKind::Ball(a), ShapeKind::Box(b)) => box_overlaps_ball(b, a).map(SolutionVector::reversed),
        (ShapeKind::Ball(a), ShapeKind::Ball(b)) => ball_overlaps_ball(a, b),
        (ShapeKind::Ball(a), ShapeKind::LineField(b)) => ball_overlaps_line_field(a, b),
        (ShapeKind::LineField(a), ShapeKind::Ball(b)) => ball_overlaps_line_field(b, a).map(SolutionVector::reversed),
        // Inverse boxes only contain boxes; line fields only stop balls
        (ShapeKind::InverseBox(_), ShapeKind::InverseBox(_) | ShapeKind::Ball(_) | ShapeKind::LineField(_))
        | (ShapeKind::Ball(_), ShapeKind::InverseBox(_))
        | (ShapeKind::Box(_), ShapeKind::LineField(_))
        | (ShapeKind::LineField(_), ShapeKind::Box(_) | ShapeKind::InverseBox(_) | ShapeKind::LineField(_)) => {
            None
        }
    }
}

/// Signed gaps between two axis-aligned extents, per axis
///
/// Negative on every axis means the extents overlap.
fn axis_intervals(a: [Projection; 3], a_center: Vector3D, b: [Projection; 3], b_center: Vector3D) -> Vector3D {
    let interval = |axis: usize, a_center: Fixed, b_center: Fixed| {
        if a_center < b_center {
            b[axis].min - a[axis].max
        } else {
            a[axis].min - b[axis].max
        }
    };

    Vector3D::new(
        interval(0, a_center.x, b_center.x),
        interval(1, a_center.y, b_center.y),
        interval(2, a_center.z, b_center.z),
    )
}

fn box_extents(shape: &BoxShape) -> [Projection; 3] {
    let rb = shape.world_right_box();

    [Projection::new(rb.x0, rb.x1), Projection::new(rb.y0, rb.y1), Projection::new(rb.z0, rb.z1)]
}

fn ball_extents(shape: &BallShape) -> [Projection; 3] {
    let (center, radius) = (shape.center(), shape.radius());

    [
        Projection::new(center.x - radius, center.x + radius),
        Projection::new(center.y - radius, center.y + radius),
        Projection::new(center.z - radius, center.z + radius),
    ]
}

/// Smallest penetration among the axes, signed to point along `distance`
fn minimum_axis_solution(intervals: Vector3D, distance: Vector3D) -> SolutionVector {
    let components = [intervals.x, intervals.y, intervals.z];
    let mut solution = SolutionVector::new(Vector3D::zero(), FIXED_INFINITY);

    for (axis, component) in components.into_iter().enumerate() {
        let depth = component.abs();

        if depth < solution.magnitude {
            let mut direction = Vector3D::zero();

            match axis {
                0 => direction.x = Fixed::ONE,
                1 => direction.y = Fixed::ONE,
                _ => direction.z = Fixed::ONE,
            }

            solution = SolutionVector::new(direction, depth);
        }
    }

    orient(solution, distance)
}

/// Flip the solution so it points along `distance`
fn orient(solution: SolutionVector, distance: Vector3D) -> SolutionVector {
    if Vector3D::dot_product(distance, solution.direction).raw() < 0 {
        solution.reversed()
    } else {
        solution
    }
}

fn overlaps_on_every_axis(intervals: Vector3D) -> bool {
    intervals.x < Fixed::ZERO && intervals.y < Fixed::ZERO && intervals.z < Fixed::ZERO
}

/// Separating-axis test between two boxes
pub fn box_overlaps_box(a: &BoxShape, b: &BoxShape) -> Option<SolutionVector> {
    let intervals = axis_intervals(box_extents(a), a.position(), box_extents(b), b.position());

    if !overlaps_on_every_axis(intervals) {
        return None;
    }

    let distance = Vector3D::get(b.position(), a.position());

    if !a.is_rotated() && !b.is_rotated() {
        return Some(minimum_axis_solution(intervals, distance));
    }

    let (a_vertexes, b_vertexes) = (a.vertexes(), b.vertexes());
    let mut solution = SolutionVector::new(Vector3D::zero(), FIXED_INFINITY);

    // Each box is tested on its own normals against the other's projection
    let axes = (0..BOX_NORMALS)
        .map(|i| (a.normals()[i], a.vertex_projections()[i], project_vertexes(&b_vertexes, a.normals()[i])))
        .chain((0..BOX_NORMALS).map(|i| {
            (b.normals()[i], project_vertexes(&a_vertexes, b.normals()[i]), b.vertex_projections()[i])
        }));

    for (normal, a_projection, b_projection) in axes {
        if normal.is_zero() {
            continue;
        }

        let interval_distance = a_projection.interval_distance(&b_projection);

        if interval_distance > Fixed::ZERO {
            return None;
        }

        let depth = interval_distance.abs();

        if depth < solution.magnitude {
            solution = SolutionVector::new(normal, depth);
        }
    }

    Some(orient(solution, distance))
}

/// Whether a box pokes out of an inverse box
///
/// The solution is always zero: there is no single move that puts the box
/// back inside.
pub fn box_escapes_inverse_box(a: &BoxShape, container: &BoxShape) -> Option<SolutionVector> {
    let (inner, outer) = (a.world_right_box(), container.world_right_box());

    let escaping = inner.x0 < outer.x0
        || inner.x1 > outer.x1
        || inner.y0 < outer.y0
        || inner.y1 > outer.y1
        || inner.z0 < outer.z0
        || inner.z1 > outer.z1;

    escaping.then(SolutionVector::zero)
}

/// Box against ball; the solution moves the box
pub fn box_overlaps_ball(a: &BoxShape, ball: &BallShape) -> Option<SolutionVector> {
    let intervals = axis_intervals(box_extents(a), a.position(), ball_extents(ball), ball.center());

    if !overlaps_on_every_axis(intervals) {
        return None;
    }

    let distance = Vector3D::get(ball.center(), a.position());

    if !a.is_rotated() {
        return Some(minimum_axis_solution(intervals, distance));
    }

    let mut solution = SolutionVector::new(Vector3D::zero(), FIXED_INFINITY);

    for (normal, box_projection) in a.normals().iter().zip(a.vertex_projections()) {
        if normal.is_zero() {
            continue;
        }

        let interval_distance = box_projection.interval_distance(&ball.project(*normal));

        if interval_distance > Fixed::ZERO {
            return None;
        }

        let depth = interval_distance.abs();

        if depth < solution.magnitude {
            solution = SolutionVector::new(*normal, depth);
        }
    }

    Some(orient(solution, distance))
}

/// Two balls; exact up to the square root
pub fn ball_overlaps_ball(a: &BallShape, b: &BallShape) -> Option<SolutionVector> {
    let distance = Vector3D::get(b.center(), a.center());
    let radii = a.radius() + b.radius();
    let square_distance = distance.square_length();

    if square_distance >= radii.square() {
        return None;
    }

    let length = distance.length();
    let mut magnitude = radii - length;

    if magnitude.is_zero() {
        magnitude = pixels_to_meters(1);
    }

    let unit = distance.scalar_division(length);
    let direction = Vector3D::new(
        unit.x.clamp_to(-Fixed::ONE, Fixed::ONE),
        unit.y.clamp_to(-Fixed::ONE, Fixed::ONE),
        unit.z.clamp_to(-Fixed::ONE, Fixed::ONE),
    );

    Some(SolutionVector::new(direction, magnitude))
}

/// Ball against the colliding side of a line field; the solution moves the ball
pub fn ball_overlaps_line_field(ball: &BallShape, line: &LineFieldShape) -> Option<SolutionVector> {
    let radius = ball.radius();
    let diameter = Fixed(radius.0 << 1);
    let normal = line.normal();
    let side = ball.center() + normal.scalar_product(radius);
    let [a, b] = line.vertexes();

    let outside = |side: Fixed, a: Fixed, b: Fixed| {
        a != b && ((side + diameter < a && side < b) || (side - diameter > a && side > b))
    };

    if outside(side.x, a.x, b.x) || outside(side.y, a.y, b.y) {
        return None;
    }

    if !Vector3D::is_right(a, b, side) {
        return None;
    }

    let projection = Vector3D::project_onto(side, a, b);

    // Past an end, the ball's edge can still reach the segment
    if !Vector3D::is_vector_inside_line(projection, a, b) {
        let shifted = projection + normal.scalar_product(radius).perpendicular_z_plane(true);

        if !Vector3D::is_vector_inside_line(shifted, a, b) {
            return None;
        }
    }

    let distance_to_line = Vector3D::get(projection, side).length();

    if distance_to_line >= line.normal_length() + diameter {
        return None;
    }

    Some(SolutionVector::new(-normal, distance_to_line + pixels_to_meters(1)))
}
