//! # Hardware Module
//!
//! Everything that touches the video processor.
//!
//! ## Organization
//!
//! - **Registers**: word indices and bitflags of the VIP registers
//! - **Attributes**: bit-exact WORLD and OBJECT records
//! - **Device**: the trait every access goes through
//! - **Memory Device**: an in-memory VIP for tests and the demo
//! - **VIP Manager**: the interrupt-driven frame pipeline

pub mod attributes;
pub mod device;
pub mod memory_device;
pub mod registers;
pub mod vip_manager;

pub use attributes::{ObjectAttributes, ScreenCount, WorldAttributes, WorldHead};
pub use device::Device;
pub use memory_device::{DeviceWrite, MemoryDevice};
pub use registers::{DisplayControl, DrawingStatus, Interrupt, Register};
pub use vip_manager::{Brightness, EffectKey, FramePipeline, PaletteConfig, VipCounters, VipManager};
