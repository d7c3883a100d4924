//! Shape arena and per-pair collision state
//!
//! Shapes live in a generational arena keyed by [`ShapeId`]. A shape that
//! keeps colliding with a partner stores a [`CollidingShapeRegistry`] for it
//! and subscribes to the partner: when the partner is destroyed, enabled or
//! disabled, the entry is dropped and a [`EventType::CollisionExit`] is fired.
//! Registries hold ids only, so a dead partner is detected by lookup rather
//! than by dereferencing.
//!
//! Owners are opaque to the arena. Operations that would move an owner return
//! the displacement instead and move the shape along with it.

use crate::core::error::{EngineError, EngineResult};
use crate::events::{EventArg, EventSystem, EventType};
use crate::foundation::collections::{HandleMap, OwnerId, ShapeId};
use crate::foundation::fixed::{pixels_to_meters, Fixed};
use crate::foundation::math::{Rotation, Scale, Size, Vector3D};
use crate::foundation::trig;
use crate::physics::collision::primitives::{Collision, CollisionInformation, CollisionResult, SolutionVector};
use crate::physics::collision::shape::{ShapeKind, ShapeType};
use crate::physics::collision::tester::test_overlap;
use crate::physics::collision_layers::CollisionLayers;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

/// Growth applied to a resting shape when checking whether it still touches
/// an impenetrable partner
pub const STILL_COLLIDING_CHECK_SIZE_INCREMENT: Fixed = pixels_to_meters(1);

/// Angle units (of 512) a displacement may deviate from pushing straight into
/// an impenetrable partner before it is blocked
const ANGLE_TO_PREVENT_DISPLACEMENT: i16 = 10;

/// Everything needed to create a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeSpec {
    /// Variant
    pub shape_type: ShapeType,
    /// Unrotated size
    pub size: Size,
    /// Offset from the owner's position
    pub displacement: Vector3D,
    /// Initial rotation
    pub rotation: Rotation,
    /// Initial scale
    pub scale: Scale,
    /// Layers the shape lives in
    pub layers: u32,
    /// Layers the shape never tests against
    pub layers_to_ignore: u32,
    /// Whether the shape actively looks for partners
    pub check_for_collisions: bool,
    /// Whether ongoing collisions are tracked
    pub register_collisions: bool,
}

impl ShapeSpec {
    /// Spec for a shape of `size` living in no layer
    #[must_use]
    pub fn new(shape_type: ShapeType, size: Size) -> Self {
        Self {
            shape_type,
            size,
            displacement: Vector3D::zero(),
            rotation: Rotation::zero(),
            scale: Scale::unit(),
            layers: CollisionLayers::NONE,
            layers_to_ignore: CollisionLayers::NONE,
            check_for_collisions: true,
            register_collisions: true,
        }
    }

    /// Set layers
    #[must_use]
    pub const fn with_layers(mut self, layers: u32, layers_to_ignore: u32) -> Self {
        self.layers = layers;
        self.layers_to_ignore = layers_to_ignore;
        self
    }

    /// Set the offset from the owner
    #[must_use]
    pub const fn with_displacement(mut self, displacement: Vector3D) -> Self {
        self.displacement = displacement;
        self
    }

    /// Set the initial rotation
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set whether collisions are tracked
    #[must_use]
    pub const fn with_register_collisions(mut self, register_collisions: bool) -> Self {
        self.register_collisions = register_collisions;
        self
    }
}

/// Tracked state of one ongoing collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollidingShapeRegistry {
    /// Partner
    pub shape: ShapeId,
    /// Last solution against the partner
    pub solution_vector: SolutionVector,
    /// Whether the collision was resolved by displacement
    pub is_impenetrable: bool,
    /// Partner friction cached when the collision started
    pub friction_coefficient: Fixed,
}

/// A collision shape
#[derive(Debug, Clone)]
pub struct Shape {
    owner: OwnerId,
    enabled: bool,
    check_for_collisions: bool,
    register_collisions: bool,
    layers: u32,
    layers_to_ignore: u32,
    friction: Fixed,
    size: Size,
    displacement: Vector3D,
    position: Vector3D,
    rotation: Rotation,
    scale: Scale,
    kind: ShapeKind,
    registries: Vec<CollidingShapeRegistry>,
    listeners: Vec<ShapeId>,
}

impl Shape {
    fn new(spec: &ShapeSpec, owner: OwnerId) -> Self {
        let mut kind = ShapeKind::new(spec.shape_type, spec.size, spec.displacement);
        kind.transform(Vector3D::zero(), spec.rotation, spec.scale);

        Self {
            owner,
            enabled: true,
            check_for_collisions: spec.check_for_collisions,
            register_collisions: spec.register_collisions,
            layers: spec.layers,
            layers_to_ignore: spec.layers_to_ignore,
            friction: Fixed::ZERO,
            size: spec.size,
            displacement: spec.displacement,
            position: Vector3D::zero(),
            rotation: spec.rotation,
            scale: spec.scale,
            kind,
            registries: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Owner
    #[must_use]
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Whether the shape takes part in collisions
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the shape actively looks for partners
    #[must_use]
    pub const fn checks_for_collisions(&self) -> bool {
        self.check_for_collisions
    }

    /// Layers the shape lives in
    #[must_use]
    pub const fn layers(&self) -> u32 {
        self.layers
    }

    /// Layers the shape never tests against
    #[must_use]
    pub const fn layers_to_ignore(&self) -> u32 {
        self.layers_to_ignore
    }

    /// Owner position
    #[must_use]
    pub const fn position(&self) -> Vector3D {
        self.position
    }

    /// Geometry
    #[must_use]
    pub const fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Tracked collisions
    #[must_use]
    pub fn registries(&self) -> &[CollidingShapeRegistry] {
        &self.registries
    }

    fn registry(&self, other: ShapeId) -> Option<&CollidingShapeRegistry> {
        self.registries.iter().find(|registry| registry.shape == other)
    }

    fn registry_mut(&mut self, other: ShapeId) -> Option<&mut CollidingShapeRegistry> {
        self.registries.iter_mut().find(|registry| registry.shape == other)
    }
}

/// Owns every shape and the collision events they produce
#[derive(Debug, Default)]
pub struct ShapeArena {
    shapes: HandleMap<ShapeId, Shape>,
    events: EventSystem,
}

impl ShapeArena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live shapes
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the arena holds no shapes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Look up a live shape
    #[must_use]
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Whether `id` still refers to a live shape
    #[must_use]
    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(id)
    }

    /// Collision events fired so far
    #[must_use]
    pub const fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Collision events, for registering handlers and dispatching
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    fn shape(&self, id: ShapeId) -> EngineResult<&Shape> {
        self.shapes.get(id).ok_or(EngineError::StaleReference("shape"))
    }

    fn shape_mut(&mut self, id: ShapeId) -> EngineResult<&mut Shape> {
        self.shapes.get_mut(id).ok_or(EngineError::StaleReference("shape"))
    }

    /// Create a shape for `owner`
    pub fn create(&mut self, spec: &ShapeSpec, owner: OwnerId) -> ShapeId {
        let id = self.shapes.insert(Shape::new(spec, owner));
        trace!("Created {:?} shape {id:?} for {owner:?}", spec.shape_type);
        id
    }

    /// Destroy a shape, notifying every shape that tracked a collision with it
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is already gone.
    pub fn destroy(&mut self, id: ShapeId) -> EngineResult<()> {
        let shape = self.shapes.remove(id).ok_or(EngineError::StaleReference("shape"))?;

        self.events.fire(
            EventType::ShapeDeleted,
            [("shape", EventArg::Shape(id)), ("owner", EventArg::Owner(shape.owner))],
        );

        for listener in shape.listeners {
            self.forget_partner(listener, id);
        }

        for registry in shape.registries {
            if let Some(partner) = self.shapes.get_mut(registry.shape) {
                partner.listeners.retain(|listener| *listener != id);
            }
        }

        debug!("Destroyed shape {id:?}");
        Ok(())
    }

    /// Set the layers a shape lives in and the layers it ignores
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn setup(&mut self, id: ShapeId, layers: u32, layers_to_ignore: u32) -> EngineResult<()> {
        let shape = self.shape_mut(id)?;
        shape.layers = layers;
        shape.layers_to_ignore = layers_to_ignore;
        Ok(())
    }

    /// Set the layers a shape lives in
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn set_layers(&mut self, id: ShapeId, layers: u32) -> EngineResult<()> {
        self.shape_mut(id)?.layers = layers;
        Ok(())
    }

    /// Set the layers a shape ignores
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn set_layers_to_ignore(&mut self, id: ShapeId, layers_to_ignore: u32) -> EngineResult<()> {
        self.shape_mut(id)?.layers_to_ignore = layers_to_ignore;
        Ok(())
    }

    /// Set the friction partners see when colliding with this shape
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn set_friction(&mut self, id: ShapeId, friction: Fixed) -> EngineResult<()> {
        self.shape_mut(id)?.friction = friction;
        Ok(())
    }

    /// Set whether collisions are tracked
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn register_collisions(&mut self, id: ShapeId, register_collisions: bool) -> EngineResult<()> {
        self.shape_mut(id)?.register_collisions = register_collisions;
        Ok(())
    }

    /// Set whether the shape actively looks for partners; turning it on also
    /// enables the shape
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn check_collisions(&mut self, id: ShapeId, check_for_collisions: bool) -> EngineResult<()> {
        self.shape_mut(id)?.check_for_collisions = check_for_collisions;

        if check_for_collisions {
            self.enable(id)?;
        }

        Ok(())
    }

    /// Enable a shape
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn enable(&mut self, id: ShapeId) -> EngineResult<()> {
        self.set_enabled(id, true)
    }

    /// Disable a shape
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn disable(&mut self, id: ShapeId) -> EngineResult<()> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&mut self, id: ShapeId, enabled: bool) -> EngineResult<()> {
        let shape = self.shape_mut(id)?;

        if shape.enabled == enabled {
            return Ok(());
        }

        shape.enabled = enabled;
        let listeners = std::mem::take(&mut shape.listeners);

        self.events.fire(EventType::ShapeChanged, [("shape", EventArg::Shape(id))]);

        for listener in listeners {
            self.forget_partner(listener, id);
        }

        Ok(())
    }

    /// Move a shape with its owner
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn set_position(&mut self, id: ShapeId, position: Vector3D) -> EngineResult<()> {
        let shape = self.shape_mut(id)?;
        shape.position = position;
        shape.kind.set_position(position);
        Ok(())
    }

    /// Apply a full owner transform; a new size rebuilds the geometry
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn transform(
        &mut self,
        id: ShapeId,
        position: Vector3D,
        rotation: Rotation,
        scale: Scale,
        size: Option<Size>,
    ) -> EngineResult<()> {
        let shape = self.shape_mut(id)?;

        if let Some(size) = size.filter(|size| *size != shape.size) {
            shape.size = size;
            shape.kind = ShapeKind::new(shape.kind.shape_type(), size, shape.displacement);
        }

        shape.position = position;
        shape.rotation = rotation;
        shape.scale = scale;
        shape.kind.transform(position, rotation, scale);
        Ok(())
    }

    /// Whether `a` may test against `b`
    #[must_use]
    pub fn can_collide(&self, a: ShapeId, b: ShapeId) -> bool {
        match (self.shapes.get(a), self.shapes.get(b)) {
            (Some(a), Some(b)) => a.enabled && b.enabled && CollisionLayers::accepts(a.layers_to_ignore, b.layers),
            _ => false,
        }
    }

    /// One overlap test without touching any collision state
    ///
    /// Unlike [`ShapeArena::collides`], this reports containment escapes,
    /// which carry a zero solution.
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when either shape is gone.
    pub fn test_overlap(&self, id: ShapeId, other: ShapeId) -> EngineResult<Option<CollisionInformation>> {
        let (shape, partner) = (self.shape(id)?, self.shape(other)?);

        Ok(test_overlap(&shape.kind, &partner.kind, Fixed::ZERO).map(|solution_vector| CollisionInformation {
            shape: id,
            colliding_shape: other,
            solution_vector,
        }))
    }

    /// Advance the collision state of `id` against `other`
    ///
    /// A shape that no longer exists never collides. Enter, update and exit
    /// transitions fire the matching events; an exit drops the tracked entry.
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when `other` is gone.
    pub fn collides(&mut self, id: ShapeId, other: ShapeId) -> EngineResult<Collision> {
        let mut information = CollisionInformation { shape: id, colliding_shape: other, solution_vector: SolutionVector::zero() };

        let Some(shape) = self.shapes.get(id) else {
            return Ok(Collision { result: CollisionResult::NoCollision, information });
        };

        let Some(partner) = self.shapes.get(other) else {
            warn!("Shape {id:?} tested against dead shape {other:?}");
            return Err(EngineError::StaleReference("colliding shape"));
        };

        let result = match shape.registry(other) {
            None => match test_overlap(&shape.kind, &partner.kind, Fixed::ZERO) {
                Some(solution) if !solution.is_zero() => {
                    information.solution_vector = solution;
                    CollisionResult::Enter
                }
                _ => CollisionResult::NoCollision,
            },
            Some(registry) if registry.is_impenetrable && !registry.solution_vector.is_zero() => {
                match test_overlap(&shape.kind, &partner.kind, STILL_COLLIDING_CHECK_SIZE_INCREMENT) {
                    Some(solution) if solution.magnitude >= STILL_COLLIDING_CHECK_SIZE_INCREMENT => {
                        information.solution_vector = solution;
                        CollisionResult::Update
                    }
                    _ => CollisionResult::Exit,
                }
            }
            Some(_) => match test_overlap(&shape.kind, &partner.kind, Fixed::ZERO) {
                Some(solution) if !solution.is_zero() => {
                    information.solution_vector = solution;
                    CollisionResult::Update
                }
                _ => CollisionResult::Exit,
            },
        };

        let friction = partner.friction;
        let register = shape.register_collisions;

        match result {
            CollisionResult::Enter => {
                if register {
                    self.register_partner(id, other, information.solution_vector, false, friction);
                }

                self.events.fire(
                    EventType::CollisionEnter,
                    [("shape", EventArg::Shape(id)), ("other", EventArg::Shape(other))],
                );
            }
            CollisionResult::Exit => self.forget_partner(id, other),
            CollisionResult::Update | CollisionResult::NoCollision => {}
        }

        Ok(Collision { result, information })
    }

    /// Resolve a collision found by [`ShapeArena::collides`]
    ///
    /// Returns the displacement to apply to the owner; the shape itself is
    /// already moved. With `register_partner` the partner is tracked as
    /// impenetrable.
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the partner is gone.
    pub fn resolve_collision(
        &mut self,
        id: ShapeId,
        information: &CollisionInformation,
        register_partner: bool,
    ) -> EngineResult<Vector3D> {
        let Some(shape) = self.shapes.get(id) else {
            return Ok(Vector3D::zero());
        };

        let solution = information.solution_vector;

        if information.shape != id || solution.is_zero() {
            return Ok(Vector3D::zero());
        }

        let friction = self.shape(information.colliding_shape)?.friction;
        let displacement = solution.displacement();
        let position = shape.position + displacement;
        self.set_position(id, position)?;

        if register_partner {
            self.register_partner(id, information.colliding_shape, solution, true, friction);
        }

        trace!("Shape {id:?} displaced by {:?}", displacement.to_pixel_vector());
        Ok(displacement)
    }

    /// Whether the owner may move along `displacement` without pushing into
    /// an impenetrable partner
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn can_move_towards(&self, id: ShapeId, displacement: Vector3D) -> EngineResult<bool> {
        let shape = self.shape(id)?;
        let direction = displacement.normalize();
        let threshold = -(Fixed::ONE - Fixed::from(trig::cos(ANGLE_TO_PREVENT_DISPLACEMENT)));

        Ok(shape
            .registries
            .iter()
            .filter(|registry| registry.is_impenetrable && !registry.solution_vector.is_zero())
            .all(|registry| threshold < Vector3D::dot_product(registry.solution_vector.direction, direction).to_fixed()))
    }

    /// Total friction of the live partners
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn colliding_friction_coefficient(&self, id: ShapeId) -> EngineResult<Fixed> {
        Ok(self
            .shape(id)?
            .registries
            .iter()
            .filter(|registry| self.shapes.contains_key(registry.shape))
            .fold(Fixed::ZERO, |total, registry| total + registry.friction_coefficient))
    }

    /// Number of tracked impenetrable partners
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn number_of_impenetrable_colliding_shapes(&self, id: ShapeId) -> EngineResult<usize> {
        Ok(self.shape(id)?.registries.iter().filter(|registry| registry.is_impenetrable).count())
    }

    /// Drop every tracked collision without firing exits
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] when the shape is gone.
    pub fn discard_collisions(&mut self, id: ShapeId) -> EngineResult<()> {
        let registries = std::mem::take(&mut self.shape_mut(id)?.registries);

        for registry in registries {
            if let Some(partner) = self.shapes.get_mut(registry.shape) {
                partner.listeners.retain(|listener| *listener != id);
            }
        }

        Ok(())
    }

    fn register_partner(
        &mut self,
        id: ShapeId,
        other: ShapeId,
        solution_vector: SolutionVector,
        is_impenetrable: bool,
        friction_coefficient: Fixed,
    ) {
        let Some(shape) = self.shapes.get_mut(id) else {
            return;
        };

        if let Some(registry) = shape.registry_mut(other) {
            registry.solution_vector = solution_vector;
            registry.is_impenetrable = is_impenetrable;
            registry.friction_coefficient = friction_coefficient;
            return;
        }

        shape.registries.push(CollidingShapeRegistry { shape: other, solution_vector, is_impenetrable, friction_coefficient });

        if let Some(partner) = self.shapes.get_mut(other) {
            partner.listeners.push(id);
        }
    }

    /// Drop `id`'s entry for `other` and report the collision as over
    fn forget_partner(&mut self, id: ShapeId, other: ShapeId) {
        let Some(shape) = self.shapes.get_mut(id) else {
            return;
        };

        let before = shape.registries.len();
        shape.registries.retain(|registry| registry.shape != other);

        if before == shape.registries.len() {
            return;
        }

        if let Some(partner) = self.shapes.get_mut(other) {
            partner.listeners.retain(|listener| *listener != id);
        }

        self.events.fire(
            EventType::CollisionExit,
            [("shape", EventArg::Shape(id)), ("other", EventArg::Shape(other))],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_spec() -> ShapeSpec {
        ShapeSpec::new(ShapeType::Box, Size::from_ints(10, 10, 10)).with_layers(CollisionLayers::SOLID, CollisionLayers::NONE)
    }

    fn ball_spec(radius: i32) -> ShapeSpec {
        ShapeSpec::new(ShapeType::Ball, Size::from_ints(radius * 2, radius * 2, radius * 2))
    }

    fn spawn(arena: &mut ShapeArena, spec: &ShapeSpec, owner: u32, position: Vector3D) -> ShapeId {
        let id = arena.create(spec, OwnerId(owner));
        arena.set_position(id, position).expect("fresh shape");
        id
    }

    fn count(arena: &ShapeArena, event_type: EventType) -> usize {
        arena.events().pending().iter().filter(|event| event.event_type == event_type).count()
    }

    #[test]
    fn test_overlapping_boxes_enter_with_minimum_axis() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &cube_spec(), 1, Vector3D::from_ints(5, 5, 5));
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(10, 10, 10));

        let collision = arena.collides(a, b).expect("both alive");
        assert_eq!(collision.result, CollisionResult::Enter);
        assert_eq!(collision.information.solution_vector.direction, Vector3D::from_ints(-1, 0, 0));
        assert_eq!(collision.information.solution_vector.magnitude, Fixed::from_int(5));
        assert_eq!(count(&arena, EventType::CollisionEnter), 1);

        // Still overlapping on the next frame
        assert_eq!(arena.collides(a, b).expect("both alive").result, CollisionResult::Update);
    }

    #[test]
    fn test_separated_balls_do_not_collide() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &ball_spec(3), 1, Vector3D::zero());
        let b = spawn(&mut arena, &ball_spec(1), 2, Vector3D::from_ints(5, 0, 0));

        let collision = arena.collides(a, b).expect("both alive");
        assert_eq!(collision.result, CollisionResult::NoCollision);
        assert!(arena.get(a).expect("alive").registries().is_empty());
    }

    #[test]
    fn test_exit_after_moving_apart() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &ball_spec(3), 1, Vector3D::zero());
        let b = spawn(&mut arena, &ball_spec(3), 2, Vector3D::from_ints(4, 0, 0));

        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Enter);
        arena.set_position(b, Vector3D::from_ints(20, 0, 0)).expect("alive");
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Exit);
        assert!(arena.get(a).expect("alive").registries().is_empty());
        assert_eq!(count(&arena, EventType::CollisionExit), 1);
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::NoCollision);
    }

    #[test]
    fn test_resolved_collision_persists_while_resting() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &cube_spec(), 1, Vector3D::from_ints(5, 5, 5));
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(10, 10, 10));
        arena.set_friction(b, Fixed::from_f32(0.5)).expect("alive");

        let collision = arena.collides(a, b).expect("alive");
        let displacement = arena.resolve_collision(a, &collision.information, true).expect("alive");
        assert_eq!(displacement, Vector3D::from_ints(-5, 0, 0));
        assert_eq!(arena.get(a).expect("alive").position(), Vector3D::from_ints(0, 5, 5));
        assert_eq!(arena.number_of_impenetrable_colliding_shapes(a).expect("alive"), 1);
        assert_eq!(arena.colliding_friction_coefficient(a).expect("alive"), Fixed::from_f32(0.5));

        // Touching faces still count thanks to the growth on re-test
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Update);

        // Pushing back into the partner is blocked, moving away is not
        assert!(!arena.can_move_towards(a, Vector3D::from_ints(1, 0, 0)).expect("alive"));
        assert!(arena.can_move_towards(a, Vector3D::from_ints(-1, 0, 0)).expect("alive"));
        assert!(arena.can_move_towards(a, Vector3D::from_ints(0, 1, 0)).expect("alive"));
    }

    #[test]
    fn test_only_the_requester_is_displaced() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &cube_spec(), 1, Vector3D::from_ints(5, 5, 5));
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(10, 10, 10));

        let collision = arena.collides(a, b).expect("alive");
        assert_eq!(arena.resolve_collision(b, &collision.information, true).expect("alive"), Vector3D::zero());
        assert_eq!(arena.get(b).expect("alive").position(), Vector3D::from_ints(10, 10, 10));
    }

    #[test]
    fn test_destroying_partner_cleans_up_registries() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &cube_spec(), 1, Vector3D::from_ints(5, 5, 5));
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(10, 10, 10));
        arena.collides(a, b).expect("alive");

        arena.destroy(b).expect("alive");
        assert!(!arena.contains(b));
        assert!(arena.get(a).expect("alive").registries().is_empty());
        assert_eq!(count(&arena, EventType::ShapeDeleted), 1);
        assert_eq!(count(&arena, EventType::CollisionExit), 1);

        assert!(matches!(arena.collides(a, b), Err(EngineError::StaleReference(_))));
        assert!(matches!(arena.destroy(b), Err(EngineError::StaleReference(_))));
        // A dead requester quietly reports nothing
        assert_eq!(arena.collides(b, a).expect("dead self").result, CollisionResult::NoCollision);
    }

    #[test]
    fn test_disabling_partner_ends_collision_once() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &cube_spec(), 1, Vector3D::from_ints(5, 5, 5));
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(10, 10, 10));
        arena.collides(a, b).expect("alive");

        arena.disable(b).expect("alive");
        arena.disable(b).expect("alive");
        assert_eq!(count(&arena, EventType::ShapeChanged), 1);
        assert_eq!(count(&arena, EventType::CollisionExit), 1);
        assert!(!arena.can_collide(a, b));

        arena.check_collisions(b, true).expect("alive");
        assert!(arena.get(b).expect("alive").is_enabled());
        assert!(arena.can_collide(a, b));
    }

    #[test]
    fn test_layers_filter_candidates() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &cube_spec(), 1, Vector3D::zero());
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::zero());

        arena.setup(a, CollisionLayers::PLAYER, CollisionLayers::SOLID).expect("alive");
        assert!(!arena.can_collide(a, b));
        assert!(arena.can_collide(b, a));

        arena.set_layers_to_ignore(a, CollisionLayers::NONE).expect("alive");
        assert!(arena.can_collide(a, b));
    }

    #[test]
    fn test_unregistered_collisions_are_not_tracked() {
        let mut arena = ShapeArena::new();
        let spec = cube_spec().with_register_collisions(false);
        let a = spawn(&mut arena, &spec, 1, Vector3D::from_ints(5, 5, 5));
        let b = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(10, 10, 10));

        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Enter);
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Enter);
        assert!(arena.get(a).expect("alive").registries().is_empty());
    }

    #[test]
    fn test_containment_escape_is_reported_by_overlap_query() {
        let mut arena = ShapeArena::new();
        let room = spawn(&mut arena, &ShapeSpec::new(ShapeType::InverseBox, Size::from_ints(100, 100, 100)), 1, Vector3D::zero());
        let crate_box = spawn(&mut arena, &cube_spec(), 2, Vector3D::from_ints(48, 0, 0));

        assert_eq!(arena.collides(crate_box, room).expect("alive").result, CollisionResult::NoCollision);
        let escape = arena.test_overlap(crate_box, room).expect("alive").expect("box pokes out");
        assert!(escape.solution_vector.is_zero());
    }

    #[test]
    fn test_discard_and_resize() {
        let mut arena = ShapeArena::new();
        let a = spawn(&mut arena, &ball_spec(1), 1, Vector3D::zero());
        let b = spawn(&mut arena, &ball_spec(1), 2, Vector3D::from_ints(5, 0, 0));
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::NoCollision);

        arena
            .transform(a, Vector3D::zero(), Rotation::zero(), Scale::unit(), Some(Size::from_ints(10, 10, 10)))
            .expect("alive");
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Enter);

        arena.discard_collisions(a).expect("alive");
        assert!(arena.get(a).expect("alive").registries().is_empty());
        assert_eq!(arena.collides(a, b).expect("alive").result, CollisionResult::Enter);
    }
}
