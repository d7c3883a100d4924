//! Engine error taxonomy
//!
//! Running out of a hardware resource is a configuration problem the game
//! has to solve (fewer visible sprites, smaller textures), so it is reported
//! as a value. Development builds usually prefer to stop right away; that is
//! what [`escalate`] does when `fail_fast` is set.

use crate::config::ConfigError;
use crate::foundation::fixed::FixedError;
use crate::foundation::logging::error;

/// A scarce hardware resource ran out
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceExhausted {
    /// More visible sprites than WORLD layers
    #[error("out of WORLD layers: {requested} visible sprites, {available} layers")]
    OutOfRenderLayers {
        /// Layers needed this frame
        requested: usize,
        /// Layers the hardware offers
        available: usize,
    },

    /// No BGMAP segment can hold the texture
    #[error("out of BGMAP memory for a {cols}x{rows} texture")]
    OutOfTextureMemory {
        /// Requested columns in tiles
        cols: u16,
        /// Requested rows in tiles
        rows: u16,
    },

    /// More OBJECT characters than OBJECT slots
    #[error("out of OBJECT slots: {requested} requested, {available} left")]
    OutOfObjectSlots {
        /// Slots needed
        requested: usize,
        /// Slots left
        available: usize,
    },
}

/// Errors surfaced by the render and collision pipeline
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A hardware resource ran out
    #[error(transparent)]
    Resource(#[from] ResourceExhausted),

    /// A handle refers to an object that no longer exists
    #[error("stale reference to a destroyed {0}")]
    StaleReference(&'static str),

    /// A caller passed something the operation cannot work with
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Fixed-point division by zero
    #[error("fixed-point division by zero")]
    DivisionByZero,

    /// Configuration could not be loaded or is inconsistent
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<FixedError> for EngineError {
    fn from(value: FixedError) -> Self {
        match value {
            FixedError::DivisionByZero => Self::DivisionByZero,
        }
    }
}

/// Result type used across the pipeline
pub type EngineResult<T> = Result<T, EngineError>;

/// Log `err` and, when `fail_fast` is set, abort with it
///
/// # Panics
///
/// When `fail_fast` is true.
pub fn escalate(err: EngineError, fail_fast: bool) -> EngineError {
    error!("{err}");

    assert!(!fail_fast, "fatal engine error: {err}");

    err
}
