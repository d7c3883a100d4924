//! # Core Engine Module
//!
//! Shared abstractions every pipeline stage depends on.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for all pipeline stages
//! - **Error**: Error taxonomy and the fail-fast policy

pub mod config;
pub mod error;

// Re-export foundation for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    CameraFrustum,
    Config,
    ConfigError,
    DrawingStrategy,
    EngineConfig,
    MultiplexedInterrupts,
    SpriteManagerConfig,
    TextureConfig,
    VipConfig,
};
pub use error::{escalate, EngineError, EngineResult, ResourceExhausted};
