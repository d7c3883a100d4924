//! # VIP Register Map
//!
//! Word indices of the video processor registers and the bitflags living in
//! them.
//!
//! | Register | Index       | Contents                                   |
//! |----------|-------------|--------------------------------------------|
//! | `INTPND` | `0x00`      | pending interrupts ([`Interrupt`])         |
//! | `INTENB` | `0x01`      | enabled interrupts ([`Interrupt`])         |
//! | `INTCLR` | `0x02`      | write 1 to acknowledge                     |
//! | `DPSTTS` | `0x10`      | display status ([`DisplayControl`])        |
//! | `DPCTRL` | `0x11`      | display control ([`DisplayControl`])       |
//! | `XPSTTS` | `0x20`      | drawing status ([`DrawingStatus`])         |
//! | `XPCTRL` | `0x21`      | drawing control ([`DrawingStatus`])        |
//! | `SPT0-3` | `0x24-0x27` | OBJECT segment pointers                    |

/// VIP register, valued by its word index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Register {
    /// Pending interrupts
    IntPnd = 0x00,
    /// Enabled interrupts
    IntEnb = 0x01,
    /// Interrupt acknowledge
    IntClr = 0x02,
    /// Display status
    DpStts = 0x10,
    /// Display control
    DpCtrl = 0x11,
    /// Brightness A
    BrtA = 0x12,
    /// Brightness B
    BrtB = 0x13,
    /// Brightness C
    BrtC = 0x14,
    /// Rest period
    Rest = 0x15,
    /// Frame cycle
    FrmCyc = 0x17,
    /// Column table address
    Cta = 0x18,
    /// Drawing status
    XpStts = 0x20,
    /// Drawing control
    XpCtrl = 0x21,
    /// Chip version
    Ver = 0x22,
    /// OBJECT segment 0 pointer
    Spt0 = 0x24,
    /// OBJECT segment 1 pointer
    Spt1 = 0x25,
    /// OBJECT segment 2 pointer
    Spt2 = 0x26,
    /// OBJECT segment 3 pointer
    Spt3 = 0x27,
    /// BGMAP palette 0
    Gplt0 = 0x30,
    /// BGMAP palette 1
    Gplt1 = 0x31,
    /// BGMAP palette 2
    Gplt2 = 0x32,
    /// BGMAP palette 3
    Gplt3 = 0x33,
    /// OBJECT palette 0
    Jplt0 = 0x34,
    /// OBJECT palette 1
    Jplt1 = 0x35,
    /// OBJECT palette 2
    Jplt2 = 0x36,
    /// OBJECT palette 3
    Jplt3 = 0x37,
    /// Background color
    BkCol = 0x38,
}

/// Number of register words a device has to back
pub const REGISTER_WORDS: usize = 0x40;

impl Register {
    /// The four SPT registers, segment 0 first
    pub const SPT: [Self; 4] = [Self::Spt0, Self::Spt1, Self::Spt2, Self::Spt3];

    /// The four BGMAP palettes
    pub const GPLT: [Self; 4] = [Self::Gplt0, Self::Gplt1, Self::Gplt2, Self::Gplt3];

    /// The four OBJECT palettes
    pub const JPLT: [Self; 4] = [Self::Jplt0, Self::Jplt1, Self::Jplt2, Self::Jplt3];

    /// Word index of the register
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

bitflags::bitflags! {
    /// Interrupt bits shared by `INTPND`, `INTENB` and `INTCLR`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Interrupt: u16 {
        /// Drawing did not finish within the frame
        const TIMEERR    = 0x8000;
        /// Drawing finished
        const XPEND      = 0x4000;
        /// The configured block row was reached
        const SBHIT      = 0x2000;
        /// A display refresh started
        const FRAMESTART = 0x0010;
        /// A game frame started drawing
        const GAMESTART  = 0x0008;
        /// Right frame buffer fully displayed
        const RFBEND     = 0x0004;
        /// Left frame buffer fully displayed
        const LFBEND     = 0x0002;
        /// Display scan failed
        const SCANERR    = 0x0001;
    }

    /// Drawing status (`XPSTTS`) and control (`XPCTRL`) bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DrawingStatus: u16 {
        /// Reset the drawing process
        const XPRST    = 0x0001;
        /// Drawing enabled
        const XPEN     = 0x0002;
        /// Drawing into frame buffer set 0
        const XPBSY0   = 0x0004;
        /// Drawing into frame buffer set 1
        const XPBSY1   = 0x0008;
        /// Drawing into either set
        const XPBSY    = 0x000C;
        /// Drawing overran the frame
        const OVERTIME = 0x0010;
        /// Block row currently being drawn
        const SBCOUNT  = 0x1F00;
        /// `SBCOUNT` is valid
        const SBOUT    = 0x8000;
    }

    /// Display status (`DPSTTS`) and control (`DPCTRL`) bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DisplayControl: u16 {
        /// Reset the display
        const DPRST = 0x0001;
        /// Display enabled
        const DISP  = 0x0002;
        /// Memory refresh enabled
        const RE    = 0x0100;
        /// Servo sync enabled
        const SYNCE = 0x0200;
        /// Column table locked
        const LOCK  = 0x0400;
    }
}

impl DrawingStatus {
    /// Block row in `SBCOUNT`
    #[must_use]
    pub const fn block_count(self) -> u16 {
        (self.bits() & Self::SBCOUNT.bits()) >> 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_indices() {
        assert_eq!(Register::IntPnd.index(), 0x00);
        assert_eq!(Register::XpCtrl.index(), 0x21);
        assert_eq!(Register::SPT[3].index(), 0x27);
        assert_eq!(Register::BkCol.index(), 0x38);
        assert!(Register::BkCol.index() < REGISTER_WORDS);
    }

    #[test]
    fn test_unknown_bits_are_kept_out() {
        assert_eq!(Interrupt::from_bits_truncate(0xFFFF).bits(), 0xE01F);
        assert_eq!(DrawingStatus::XPBSY, DrawingStatus::XPBSY0 | DrawingStatus::XPBSY1);
    }

    #[test]
    fn test_block_count() {
        let status = DrawingStatus::from_bits_truncate(0x8000 | (0x0C << 8) | 0x0004);
        assert_eq!(status.block_count(), 12);
    }
}
