//! Physics module for collision detection and response
//!
//! Narrow-phase shape tests plus the per-pair collision state kept by
//! [`ShapeArena`]. Broad-phase candidate selection is left to the caller.

pub mod collision;
pub mod collision_layers;
pub mod collision_system;

pub use collision::{
    Collision,
    CollisionInformation,
    CollisionResult,
    ShapeKind,
    ShapeType,
    SolutionVector,
};
pub use collision_layers::CollisionLayers;
pub use collision_system::{CollidingShapeRegistry, Shape, ShapeArena, ShapeSpec};
