//! In-memory VIP used by tests and the demo

use super::attributes::{ObjectAttributes, WorldAttributes};
use super::device::Device;
use super::registers::{DrawingStatus, Interrupt, Register, REGISTER_WORDS};
use crate::core::config::{MAX_SEGMENTS, TOTAL_LAYERS, TOTAL_OBJECTS};

/// Words per BGMAP segment (64x64 map entries)
pub const BGMAP_SEGMENT_WORDS: usize = 64 * 64;

/// Words of param table memory
pub const PARAM_TABLE_WORDS: usize = 0x2000;

/// One write that reached the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWrite {
    /// A register word
    Register {
        /// Target register
        register: Register,
        /// Value written
        value: u16,
    },
    /// A WORLD layer
    World {
        /// Layer index
        layer: usize,
    },
    /// An OBJECT character
    Object {
        /// Slot index
        slot: usize,
    },
    /// A run of BGMAP words
    Bgmap {
        /// Target segment
        segment: u8,
        /// First word
        offset: usize,
        /// Number of words
        len: usize,
    },
    /// A run of param table words
    Param {
        /// First word
        offset: usize,
        /// Number of words
        len: usize,
    },
}

/// Device backed by plain memory
///
/// Behaves like the VIP where the pipeline can observe it: `INTCLR`
/// acknowledges pending bits and `XPCTRL` toggles `XPSTTS.XPEN`. Every write
/// is appended to a log the tests inspect.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    registers: [u16; REGISTER_WORDS],
    world: Vec<WorldAttributes>,
    objects: Vec<ObjectAttributes>,
    bgmap: Vec<u16>,
    param: Vec<u16>,
    writes: Vec<DeviceWrite>,
}

impl MemoryDevice {
    /// Create a device with every table cleared
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_WORDS],
            world: vec![WorldAttributes::default(); TOTAL_LAYERS],
            objects: vec![ObjectAttributes::HIDDEN; TOTAL_OBJECTS],
            bgmap: vec![0; BGMAP_SEGMENT_WORDS * usize::from(MAX_SEGMENTS)],
            param: vec![0; PARAM_TABLE_WORDS],
            writes: Vec::new(),
        }
    }

    /// Raise interrupts as the hardware would
    pub fn raise(&mut self, interrupt: Interrupt) {
        self.registers[Register::IntPnd.index()] |= interrupt.bits();
    }

    /// Pending interrupts
    #[must_use]
    pub fn pending(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.registers[Register::IntPnd.index()])
    }

    /// Enabled interrupts
    #[must_use]
    pub fn enabled(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.registers[Register::IntEnb.index()])
    }

    /// Force the drawing status, keeping `XPEN` as last written
    pub fn set_drawing_status(&mut self, status: DrawingStatus) {
        let xpen = self.registers[Register::XpStts.index()] & DrawingStatus::XPEN.bits();
        self.registers[Register::XpStts.index()] = (status.bits() & !DrawingStatus::XPEN.bits()) | xpen;
    }

    /// Whether drawing is enabled
    #[must_use]
    pub const fn is_drawing_enabled(&self) -> bool {
        0 != self.registers[Register::XpStts.index()] & DrawingStatus::XPEN.bits()
    }

    /// WORLD layer as last written
    #[must_use]
    pub fn world(&self, layer: usize) -> Option<&WorldAttributes> {
        self.world.get(layer)
    }

    /// OBJECT character as last written
    #[must_use]
    pub fn object(&self, slot: usize) -> Option<&ObjectAttributes> {
        self.objects.get(slot)
    }

    /// Contents of one BGMAP segment
    #[must_use]
    pub fn bgmap_segment(&self, segment: u8) -> &[u16] {
        let start = usize::from(segment) * BGMAP_SEGMENT_WORDS;
        self.bgmap.get(start..start + BGMAP_SEGMENT_WORDS).unwrap_or(&[])
    }

    /// Param table memory
    #[must_use]
    pub fn param_table(&self) -> &[u16] {
        &self.param
    }

    /// Every write since creation or the last [`Self::clear_writes`]
    #[must_use]
    pub fn writes(&self) -> &[DeviceWrite] {
        &self.writes
    }

    /// Forget the write log
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// WORLD memory as little-endian bytes, layer 0 first
    #[must_use]
    pub fn world_image(&self) -> Vec<u8> {
        let words: Vec<u16> =
            self.world.iter().flat_map(|attributes| attributes.to_words()).map(u16::to_le).collect();
        bytemuck::cast_slice(&words).to_vec()
    }
}

impl Default for MemoryDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for MemoryDevice {
    fn read_register(&self, register: Register) -> u16 {
        self.registers[register.index()]
    }

    fn write_register(&mut self, register: Register, value: u16) {
        self.writes.push(DeviceWrite::Register { register, value });

        match register {
            Register::IntClr => {
                self.registers[Register::IntPnd.index()] &= !value;
            }
            Register::XpCtrl => {
                let status = &mut self.registers[Register::XpStts.index()];
                *status = (*status & !DrawingStatus::XPEN.bits()) | (value & DrawingStatus::XPEN.bits());
            }
            _ => {}
        }

        self.registers[register.index()] = value;
    }

    fn write_world(&mut self, layer: usize, attributes: &WorldAttributes) {
        if let Some(slot) = self.world.get_mut(layer) {
            *slot = *attributes;
            self.writes.push(DeviceWrite::World { layer });
        }
    }

    fn write_object(&mut self, slot: usize, attributes: &ObjectAttributes) {
        if let Some(object) = self.objects.get_mut(slot) {
            *object = *attributes;
            self.writes.push(DeviceWrite::Object { slot });
        }
    }

    fn write_bgmap(&mut self, segment: u8, offset: usize, words: &[u16]) {
        if offset + words.len() > BGMAP_SEGMENT_WORDS {
            return;
        }

        let start = usize::from(segment) * BGMAP_SEGMENT_WORDS + offset;

        if let Some(target) = self.bgmap.get_mut(start..start + words.len()) {
            target.copy_from_slice(words);
            self.writes.push(DeviceWrite::Bgmap { segment, offset, len: words.len() });
        }
    }

    fn write_param(&mut self, offset: usize, words: &[u16]) {
        if let Some(target) = self.param.get_mut(offset..offset + words.len()) {
            target.copy_from_slice(words);
            self.writes.push(DeviceWrite::Param { offset, len: words.len() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intclr_acknowledges_written_bits() {
        let mut device = MemoryDevice::new();
        device.raise(Interrupt::GAMESTART | Interrupt::XPEND);

        device.write_register(Register::IntClr, Interrupt::XPEND.bits());

        assert_eq!(device.pending(), Interrupt::GAMESTART);
    }

    #[test]
    fn test_xpctrl_mirrors_into_status() {
        let mut device = MemoryDevice::new();
        device.set_drawing_status(DrawingStatus::XPBSY1);

        device.write_register(Register::XpCtrl, DrawingStatus::XPEN.bits());
        assert!(device.is_drawing_enabled());
        assert_eq!(device.read_register(Register::XpStts), 0x000A);

        device.write_register(Register::XpCtrl, 0);
        assert!(!device.is_drawing_enabled());
        assert_eq!(device.read_register(Register::XpStts), 0x0008);
    }

    #[test]
    fn test_out_of_range_writes_are_dropped() {
        let mut device = MemoryDevice::new();
        device.write_world(TOTAL_LAYERS, &WorldAttributes::END);
        device.write_bgmap(0, BGMAP_SEGMENT_WORDS - 1, &[1, 2]);
        device.write_param(PARAM_TABLE_WORDS, &[1]);

        assert!(device.writes().is_empty());
    }

    #[test]
    fn test_bgmap_segments_are_disjoint() {
        let mut device = MemoryDevice::new();
        device.write_bgmap(1, 64, &[7, 8, 9]);

        assert_eq!(&device.bgmap_segment(1)[64..67], &[7, 8, 9]);
        assert!(device.bgmap_segment(0).iter().all(|&word| 0 == word));
        assert_eq!(device.writes(), &[DeviceWrite::Bgmap { segment: 1, offset: 64, len: 3 }]);
    }

    #[test]
    fn test_world_image() {
        let mut device = MemoryDevice::new();
        device.write_world(0, &WorldAttributes::END);

        let image = device.world_image();
        assert_eq!(image.len(), TOTAL_LAYERS * 32);
        assert_eq!(u16::from_le_bytes([image[0], image[1]]), 0x0040);
    }
}
