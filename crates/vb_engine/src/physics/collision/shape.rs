//! Shape geometry
//!
//! Geometry is kept relative to the shape's position so moving a shape only
//! re-projects it; rotating or scaling recomputes the local bounds.
//!
//! # Variants
//!
//! - [`BoxShape`] - oriented box; rotation about Z is approximated by
//!   displacing the vertices of the surrounding [`RightBox`]
//! - [`BallShape`] - sphere whose radius is half the largest dimension
//! - [`LineFieldShape`] - segment with a normal, only one side collides
//!
//! [`ShapeKind::InverseBox`] reuses the box geometry with container
//! semantics.

use crate::foundation::fixed::{pixels_to_meters, Fix7_9, Fixed};
use crate::foundation::math::{RightBox, Rotation, Scale, Size, Vector3D};
use crate::foundation::trig;
use crate::physics::collision::primitives::Projection;

/// Number of face normals tested per box
pub const BOX_NORMALS: usize = 3;

/// Number of box vertices
pub const BOX_VERTEXES: usize = 8;

/// Half a turn in angle units
const HALF_TURN: i16 = 256;

fn sin_cos(angle: i16) -> (Fixed, Fixed) {
    (Fixed::from(trig::sin(angle)), Fixed::from(trig::cos(angle)))
}

/// Project `vertexes` onto `normal`
#[must_use]
pub fn project_vertexes(vertexes: &[Vector3D], normal: Vector3D) -> Projection {
    let mut projection: Option<Projection> = None;

    for vertex in vertexes {
        let dot = Vector3D::dot_product(normal, *vertex).to_fixed();

        projection = Some(match projection {
            None => Projection { min: dot, max: dot },
            Some(current) => Projection { min: current.min.min(dot), max: current.max.max(dot) },
        });
    }

    projection.unwrap_or_default()
}

/// Oriented box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxShape {
    size: Size,
    displacement: Vector3D,
    position: Vector3D,
    right_box: RightBox,
    rotation_vertex_displacement: Vector3D,
    normals: [Vector3D; BOX_NORMALS],
    vertex_projections: [Projection; BOX_NORMALS],
}

impl BoxShape {
    /// Box of `size` offset from its owner by `displacement`
    #[must_use]
    pub fn new(size: Size, displacement: Vector3D) -> Self {
        let mut shape = Self {
            size,
            displacement,
            position: Vector3D::zero(),
            right_box: RightBox::default(),
            rotation_vertex_displacement: Vector3D::zero(),
            normals: [Vector3D::zero(); BOX_NORMALS],
            vertex_projections: [Projection::default(); BOX_NORMALS],
        };

        shape.compute_right_box(Rotation::zero());
        shape
    }

    /// Bounds relative to the position
    #[must_use]
    pub const fn right_box(&self) -> RightBox {
        self.right_box
    }

    /// Bounds in world space
    #[must_use]
    pub fn world_right_box(&self) -> RightBox {
        self.right_box.translate(self.position)
    }

    /// Position
    #[must_use]
    pub const fn position(&self) -> Vector3D {
        self.position
    }

    /// Face normals
    #[must_use]
    pub const fn normals(&self) -> &[Vector3D; BOX_NORMALS] {
        &self.normals
    }

    /// Own vertices projected onto each face normal
    #[must_use]
    pub const fn vertex_projections(&self) -> &[Projection; BOX_NORMALS] {
        &self.vertex_projections
    }

    /// Whether rotation moved the vertices off the surrounding box corners
    #[must_use]
    pub const fn is_rotated(&self) -> bool {
        !self.rotation_vertex_displacement.is_zero()
    }

    /// Vertex offsets introduced by rotation
    #[must_use]
    pub const fn rotation_vertex_displacement(&self) -> Vector3D {
        self.rotation_vertex_displacement
    }

    /// Move without changing orientation
    pub fn set_position(&mut self, position: Vector3D) {
        self.position = position;
        self.project_onto_itself();
    }

    /// Change orientation and position
    pub fn transform(&mut self, position: Vector3D, rotation: Rotation) {
        self.position = position;
        self.compute_right_box(rotation);
    }

    /// Grow every face by `delta`
    pub fn resize(&mut self, delta: Fixed) {
        let rb = &mut self.right_box;
        rb.x0 -= delta;
        rb.x1 += delta;
        rb.y0 -= delta;
        rb.y1 += delta;
        rb.z0 -= delta;
        rb.z1 += delta;

        self.project_onto_itself();
    }

    /// World-space vertices: near face then far face, each
    /// left-top, right-top, left-bottom, right-bottom
    #[must_use]
    pub fn vertexes(&self) -> [Vector3D; BOX_VERTEXES] {
        let rb = self.right_box;
        let rvd = self.rotation_vertex_displacement;

        let mut vertexes = [
            Vector3D::new(rb.x0, rb.y0, rb.z0),
            Vector3D::new(rb.x1, rb.y0, rb.z0),
            Vector3D::new(rb.x0, rb.y1, rb.z0),
            Vector3D::new(rb.x1, rb.y1, rb.z0),
            Vector3D::new(rb.x0, rb.y0, rb.z1),
            Vector3D::new(rb.x1, rb.y0, rb.z1),
            Vector3D::new(rb.x0, rb.y1, rb.z1),
            Vector3D::new(rb.x1, rb.y1, rb.z1),
        ];

        if self.is_rotated() {
            // Each corner slides along one edge of the surrounding box
            for face in [0, 4] {
                vertexes[face].y += rvd.y;
                vertexes[face + 1].x -= rvd.x;
                vertexes[face + 2].x += rvd.x;
                vertexes[face + 3].y -= rvd.y;
            }
        }

        vertexes.map(|vertex| vertex + self.position)
    }

    /// Project the box onto `normal`
    #[must_use]
    pub fn project(&self, normal: Vector3D) -> Projection {
        project_vertexes(&self.vertexes(), normal)
    }

    fn compute_normals(&mut self, vertexes: &[Vector3D; BOX_VERTEXES]) {
        self.normals = [
            Vector3D::get(vertexes[0], vertexes[1]).normalize(),
            Vector3D::get(vertexes[0], vertexes[2]).normalize(),
            Vector3D::get(vertexes[0], vertexes[4]).normalize(),
        ];
    }

    fn project_onto_itself(&mut self) {
        let vertexes = self.vertexes();
        self.compute_normals(&vertexes);

        for (projection, normal) in self.vertex_projections.iter_mut().zip(self.normals) {
            *projection = project_vertexes(&vertexes, normal);
        }
    }

    fn compute_right_box(&mut self, rotation: Rotation) {
        let mut surrounding = self.size;
        self.rotation_vertex_displacement = Vector3D::zero();

        if 0 != rotation.z && HALF_TURN != rotation.z {
            let angle = rotation.z.rem_euclid(HALF_TURN);
            let (sin, cos) = sin_cos(angle);
            let (width, height) = (self.size.x.half(), self.size.y.half());

            // Rotated right-top and right-bottom corners
            let top_right = (width * cos + height * sin, width * sin - height * cos);
            let bottom_right = (width * cos - height * sin, width * sin + height * cos);

            let half_x = top_right.0.abs().max(bottom_right.0.abs());
            let half_y = top_right.1.abs().max(bottom_right.1.abs());
            surrounding.x = Fixed(half_x.0 << 1);
            surrounding.y = Fixed(half_y.0 << 1);

            let mut rvd_x = if bottom_right.0.abs() < top_right.0.abs() { bottom_right.0 } else { top_right.0 };
            let mut rvd_y = if bottom_right.1.abs() < top_right.1.abs() { bottom_right.1 } else { top_right.1 };

            if angle >= trig::QUARTER_TURN {
                rvd_y = -rvd_y;
            }

            rvd_x = surrounding.x.half() + rvd_x;
            rvd_y = surrounding.y.half() - rvd_y;

            if 0 != angle % trig::QUARTER_TURN {
                self.rotation_vertex_displacement = Vector3D::new(rvd_x, rvd_y, Fixed::ZERO);
            }
        }

        let half = Vector3D::new(surrounding.x.half(), surrounding.y.half(), surrounding.z.half());

        self.right_box = RightBox::new(
            self.displacement.x - half.x,
            self.displacement.y - half.y,
            self.displacement.z - half.z,
            self.displacement.x + half.x,
            self.displacement.y + half.y,
            self.displacement.z + half.z,
        );

        self.project_onto_itself();
    }
}

/// Sphere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallShape {
    displacement: Vector3D,
    position: Vector3D,
    radius: Fixed,
}

impl BallShape {
    /// Ball enclosing `size`
    #[must_use]
    pub fn new(size: Size, displacement: Vector3D) -> Self {
        Self { displacement, position: displacement, radius: size.max_dimension().half() }
    }

    /// Ball with an explicit radius
    #[must_use]
    pub fn with_radius(radius: Fixed) -> Self {
        Self { displacement: Vector3D::zero(), position: Vector3D::zero(), radius }
    }

    /// Center in world space
    #[must_use]
    pub const fn center(&self) -> Vector3D {
        self.position
    }

    /// Radius
    #[must_use]
    pub const fn radius(&self) -> Fixed {
        self.radius
    }

    /// Move the owner to `position`
    pub fn set_position(&mut self, position: Vector3D) {
        self.position = position + self.displacement;
    }

    /// Grow the radius by `delta`
    pub fn resize(&mut self, delta: Fixed) {
        self.radius += delta;
    }

    /// Project the ball onto `normal`
    #[must_use]
    pub fn project(&self, normal: Vector3D) -> Projection {
        let dot = Vector3D::dot_product(normal, self.position).to_fixed();

        Projection::new(dot - self.radius, dot + self.radius)
    }

    /// Bounds in world space
    #[must_use]
    pub fn world_right_box(&self) -> RightBox {
        let diameter = Fixed(self.radius.0 << 1);

        RightBox::centered(Size { x: diameter, y: diameter, z: diameter }, self.position)
    }
}

/// One-sided segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFieldShape {
    size: Size,
    displacement: Vector3D,
    position: Vector3D,
    a: Vector3D,
    b: Vector3D,
    normal: Vector3D,
    normal_length: Fixed,
}

impl LineFieldShape {
    /// Segment along the first nonzero dimension of `size`
    #[must_use]
    pub fn new(size: Size, displacement: Vector3D) -> Self {
        let mut shape = Self {
            size,
            displacement,
            position: Vector3D::zero(),
            a: Vector3D::zero(),
            b: Vector3D::zero(),
            normal: Vector3D::zero(),
            normal_length: pixels_to_meters(1),
        };

        shape.compute_size(Rotation::zero(), Scale::unit());
        shape
    }

    /// First endpoint, relative to the position
    #[must_use]
    pub const fn a(&self) -> Vector3D {
        self.a
    }

    /// Second endpoint, relative to the position
    #[must_use]
    pub const fn b(&self) -> Vector3D {
        self.b
    }

    /// Unit normal of the colliding side
    #[must_use]
    pub const fn normal(&self) -> Vector3D {
        self.normal
    }

    /// Thickness along the normal
    #[must_use]
    pub const fn normal_length(&self) -> Fixed {
        self.normal_length
    }

    /// Set the thickness along the normal
    pub fn set_normal_length(&mut self, normal_length: Fixed) {
        self.normal_length = normal_length;
    }

    /// Endpoints in world space
    #[must_use]
    pub fn vertexes(&self) -> [Vector3D; 2] {
        let origin = self.position + self.displacement;

        [self.a + origin, self.b + origin]
    }

    /// Midpoint in world space
    #[must_use]
    pub fn center(&self) -> Vector3D {
        Vector3D::intermediate(self.a, self.b) + self.position + self.displacement
    }

    /// Move the owner to `position`
    pub fn set_position(&mut self, position: Vector3D) {
        self.position = position;
    }

    /// Change orientation, scale and position
    pub fn transform(&mut self, position: Vector3D, rotation: Rotation, scale: Scale) {
        self.position = position;
        self.compute_size(rotation, scale);
    }

    /// Slide both endpoints along the normal
    pub fn displace(&mut self, displacement: Fixed) {
        let offset = self.normal.scalar_product(displacement);
        self.a += offset;
        self.b += offset;
    }

    /// Bounds in world space
    #[must_use]
    pub fn world_right_box(&self) -> RightBox {
        let [a, b] = self.vertexes();

        RightBox::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z), a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
    }

    fn compute_size(&mut self, rotation: Rotation, scale: Scale) {
        let normal_scale = scale.max_factor().max(Fix7_9::ONE);
        self.normal_length = pixels_to_meters(1).multiply(Fixed::from(normal_scale));

        self.a = if !self.size.x.is_zero() {
            let half = self.size.x.half();

            if 0 != rotation.y {
                let (sin, cos) = sin_cos(rotation.y);
                Vector3D::new(half * cos, Fixed::ZERO, half * sin)
            } else if 0 != rotation.z {
                let (sin, cos) = sin_cos(rotation.z);
                Vector3D::new(half * cos, half * sin, Fixed::ZERO)
            } else {
                Vector3D::new(half, Fixed::ZERO, Fixed::ZERO)
            }
        } else if !self.size.y.is_zero() {
            let half = self.size.y.half();

            if 0 != rotation.x {
                let (sin, cos) = sin_cos(rotation.x);
                Vector3D::new(Fixed::ZERO, half * cos, half * sin)
            } else if 0 != rotation.z {
                let (sin, cos) = sin_cos(rotation.z);
                Vector3D::new(-(half * sin), half * cos, Fixed::ZERO)
            } else {
                Vector3D::new(Fixed::ZERO, half, Fixed::ZERO)
            }
        } else {
            let half = self.size.z.half();

            if 0 != rotation.y {
                let (sin, cos) = sin_cos(rotation.y);
                Vector3D::new(half * sin, Fixed::ZERO, half * cos)
            } else if 0 != rotation.x {
                let (sin, cos) = sin_cos(rotation.x);
                Vector3D::new(Fixed::ZERO, -(half * sin), half * cos)
            } else {
                Vector3D::new(Fixed::ZERO, Fixed::ZERO, half)
            }
        };

        self.b = -self.a;

        let d = Vector3D::get(self.a, self.b);
        self.normal = Vector3D::new(d.y, -d.x, d.z).normalize();
    }
}

/// Closed set of shape variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Solid box
    Box(BoxShape),
    /// Container box; overlapping means escaping it
    InverseBox(BoxShape),
    /// Sphere
    Ball(BallShape),
    /// One-sided segment
    LineField(LineFieldShape),
}

/// Variant tag used by shape specs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShapeType {
    /// Solid box
    Box,
    /// Container box
    InverseBox,
    /// Sphere
    Ball,
    /// One-sided segment
    LineField,
}

impl ShapeKind {
    /// Build the geometry for a variant
    #[must_use]
    pub fn new(shape_type: ShapeType, size: Size, displacement: Vector3D) -> Self {
        match shape_type {
            ShapeType::Box => Self::Box(BoxShape::new(size, displacement)),
            ShapeType::InverseBox => Self::InverseBox(BoxShape::new(size, displacement)),
            ShapeType::Ball => Self::Ball(BallShape::new(size, displacement)),
            ShapeType::LineField => Self::LineField(LineFieldShape::new(size, displacement)),
        }
    }

    /// Variant tag
    #[must_use]
    pub const fn shape_type(&self) -> ShapeType {
        match self {
            Self::Box(_) => ShapeType::Box,
            Self::InverseBox(_) => ShapeType::InverseBox,
            Self::Ball(_) => ShapeType::Ball,
            Self::LineField(_) => ShapeType::LineField,
        }
    }

    /// Move without re-orienting
    pub fn set_position(&mut self, position: Vector3D) {
        match self {
            Self::Box(shape) | Self::InverseBox(shape) => shape.set_position(position),
            Self::Ball(shape) => shape.set_position(position),
            Self::LineField(shape) => shape.set_position(position),
        }
    }

    /// Recompute geometry for a new transform
    pub fn transform(&mut self, position: Vector3D, rotation: Rotation, scale: Scale) {
        match self {
            Self::Box(shape) | Self::InverseBox(shape) => shape.transform(position, rotation),
            Self::Ball(shape) => shape.set_position(position),
            Self::LineField(shape) => shape.transform(position, rotation, scale),
        }
    }

    /// Grow by `delta`; line fields keep their size
    pub fn resize(&mut self, delta: Fixed) {
        match self {
            Self::Box(shape) | Self::InverseBox(shape) => shape.resize(delta),
            Self::Ball(shape) => shape.resize(delta),
            Self::LineField(_) => {}
        }
    }

    /// Bounds in world space
    #[must_use]
    pub fn world_right_box(&self) -> RightBox {
        match self {
            Self::Box(shape) | Self::InverseBox(shape) => shape.world_right_box(),
            Self::Ball(shape) => shape.world_right_box(),
            Self::LineField(shape) => shape.world_right_box(),
        }
    }

    /// Collision normal; only line fields have one
    #[must_use]
    pub const fn normal(&self) -> Vector3D {
        match self {
            Self::LineField(shape) => shape.normal(),
            _ => Vector3D::zero(),
        }
    }
}
