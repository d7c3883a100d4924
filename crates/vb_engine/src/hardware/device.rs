//! # Hardware Device Abstraction
//!
//! The single boundary through which the pipeline touches video hardware.
//! [`VipManager`](super::VipManager) drives registers, the sprite manager
//! fills WORLD and OBJECT memory, and the texture manager streams BGMAP rows.
//! Tests and the demo substitute [`MemoryDevice`](super::MemoryDevice).

use super::attributes::{ObjectAttributes, WorldAttributes};
use super::registers::Register;

/// # Video Device Trait
///
/// Word-granular access to the VIP registers and its DRAM tables.
///
/// ## Implementation Notes
///
/// Implementations should:
/// - Treat a write to `INTCLR` as acknowledging exactly the written bits
/// - Mirror the `XPEN` bit of `XPCTRL` into `XPSTTS`
/// - Ignore writes past the end of a table
pub trait Device {
    /// Read a register word
    fn read_register(&self, register: Register) -> u16;

    /// Write a register word
    fn write_register(&mut self, register: Register, value: u16);

    /// Write one WORLD layer
    fn write_world(&mut self, layer: usize, attributes: &WorldAttributes);

    /// Write one OBJECT character
    fn write_object(&mut self, slot: usize, attributes: &ObjectAttributes);

    /// Write map words into a BGMAP segment starting at `offset` words
    fn write_bgmap(&mut self, segment: u8, offset: usize, words: &[u16]);

    /// Write param table words starting at `offset` words
    fn write_param(&mut self, offset: usize, words: &[u16]);
}
