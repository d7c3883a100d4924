//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Fixed-point numbers and their conversions
//! - Sine lookup table and square roots
//! - Vector, rotation and box types
//! - Generational handles
//! - Frame clock
//! - Logging utilities

pub mod collections;
pub mod fixed;
pub mod logging;
pub mod math;
pub mod sqrt;
pub mod time;
pub mod trig;
