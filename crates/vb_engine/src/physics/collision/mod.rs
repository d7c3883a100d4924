//! Narrow-phase collision detection
//!
//! Candidate pairs come from the caller; this module only answers whether two
//! shapes overlap and how to separate them.
//!
//! # Module Organization
//!
//! - [`primitives`] - solution vectors, collision results, projection intervals
//! - [`shape`] - per-variant geometry (box, inverse box, ball, line field)
//! - [`tester`] - the variant-by-variant overlap dispatch

pub mod primitives;
pub mod shape;
pub mod tester;

// Re-export commonly used types
pub use primitives::{Collision, CollisionInformation, CollisionResult, Projection, SolutionVector};
pub use shape::{BallShape, BoxShape, LineFieldShape, ShapeKind, ShapeType};
pub use tester::test_overlap;
