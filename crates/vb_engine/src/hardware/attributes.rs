//! WORLD and OBJECT attribute records
//!
//! Both records mirror the hardware layout word for word; `to_words` yields
//! exactly what the VIP reads from DRAM.

/// Words per WORLD attribute record
pub const WORLD_ATTRIBUTE_WORDS: usize = 16;

/// Words per OBJECT attribute record
pub const OBJECT_ATTRIBUTE_WORDS: usize = 4;

/// `w`/`h` hold the size minus this
pub const WORLD_SIZE_DISPLACEMENT: i16 = 1;

bitflags::bitflags! {
    /// Head word of a WORLD attribute record
    ///
    /// Bits 0-3 carry the BGMAP segment and are not named here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WorldHead: u16 {
        /// Visible to the left eye
        const LON    = 0x8000;
        /// Visible to the right eye
        const RON    = 0x4000;
        /// Visible to both eyes
        const ON     = 0xC000;
        /// OBJECT mode
        const OBJECT = 0x3000;
        /// AFFINE mode
        const AFFINE = 0x2000;
        /// HBIAS mode
        const HBIAS  = 0x1000;
        /// Screen-count bits (`SCX`/`SCY`)
        const SC     = 0x0F00;
        /// Use the overplane character
        const OVR    = 0x0080;
        /// No further layers are drawn
        const END    = 0x0040;
        /// BGMAP segment
        const SEGMENT = 0x000F;
    }
}

impl WorldHead {
    /// Layer disabled
    pub const OFF: Self = Self::empty();

    /// Plain BGMAP mode (no mode bits set)
    pub const BGMAP: Self = Self::empty();

    /// Mode bits only
    #[must_use]
    pub const fn mode(self) -> Self {
        Self::from_bits_retain(self.bits() & Self::OBJECT.bits())
    }

    /// Whether the layer uses a param table
    #[must_use]
    pub const fn uses_param_table(self) -> bool {
        let mode = self.bits() & Self::OBJECT.bits();
        mode == Self::AFFINE.bits() || mode == Self::HBIAS.bits()
    }
}

/// How many BGMAP segments a multi-segment world spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum ScreenCount {
    /// 1x1 segments
    #[default]
    Sc1x1,
    /// 1x2 segments
    Sc1x2,
    /// 1x4 segments
    Sc1x4,
    /// 1x8 segments
    Sc1x8,
    /// 2x1 segments
    Sc2x1,
    /// 2x2 segments
    Sc2x2,
    /// 2x4 segments
    Sc2x4,
    /// 4x1 segments
    Sc4x1,
    /// 4x2 segments
    Sc4x2,
    /// 8x1 segments
    Sc8x1,
}

impl ScreenCount {
    /// Head bits for this screen count
    #[must_use]
    pub const fn head_bits(self) -> u16 {
        match self {
            Self::Sc1x1 => 0x0000,
            Self::Sc1x2 => 0x0100,
            Self::Sc1x4 => 0x0200,
            Self::Sc1x8 => 0x0300,
            Self::Sc2x1 => 0x0400,
            Self::Sc2x2 => 0x0500,
            Self::Sc2x4 => 0x0600,
            Self::Sc4x1 => 0x0800,
            Self::Sc4x2 => 0x0900,
            Self::Sc8x1 => 0x0C00,
        }
    }

    /// Segments covered, horizontally times vertically
    #[must_use]
    pub const fn segments(self) -> u8 {
        let bits = self.head_bits();
        (1 << ((bits >> 10) & 0x3)) * (1 << ((bits >> 8) & 0x3))
    }
}

/// One WORLD layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldAttributes {
    /// Mode, eyes, screen count and segment
    pub head: WorldHead,
    /// Screen x
    pub gx: i16,
    /// Screen parallax
    pub gp: i16,
    /// Screen y
    pub gy: i16,
    /// Source x inside the segment
    pub mx: u16,
    /// Source parallax
    pub mp: i16,
    /// Source y inside the segment
    pub my: u16,
    /// Width minus one
    pub w: u16,
    /// Height minus one
    pub h: u16,
    /// Param table offset
    pub param: u16,
    /// Overplane character
    pub ovr: u16,
}

impl WorldAttributes {
    /// A record that stops the VIP from reading further layers
    pub const END: Self = Self {
        head: WorldHead::END,
        gx: 0,
        gp: 0,
        gy: 0,
        mx: 0,
        mp: 0,
        my: 0,
        w: 0,
        h: 0,
        param: 0,
        ovr: 0,
    };

    /// The record as the VIP reads it
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn to_words(&self) -> [u16; WORLD_ATTRIBUTE_WORDS] {
        [
            self.head.bits(),
            self.gx as u16,
            self.gp as u16,
            self.gy as u16,
            self.mx,
            self.mp as u16,
            self.my,
            self.w,
            self.h,
            self.param,
            self.ovr,
            0,
            0,
            0,
            0,
            0,
        ]
    }
}

/// One OBJECT character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectAttributes {
    /// Screen x
    pub jx: i16,
    /// Eyes and parallax
    pub head: u16,
    /// Screen y
    pub jy: i16,
    /// Palette, flips and character index
    pub tile: u16,
}

impl ObjectAttributes {
    /// Head value that hides the character
    pub const HIDE_MASK: u16 = 0x0000;

    /// Head bits that show the character to both eyes
    pub const SHOW_MASK: u16 = 0xC000;

    /// A hidden character
    pub const HIDDEN: Self = Self { jx: 0, head: Self::HIDE_MASK, jy: 0, tile: 0 };

    /// Whether either eye sees the character
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        0 != self.head & Self::SHOW_MASK
    }

    /// The record as the VIP reads it
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn to_words(&self) -> [u16; OBJECT_ATTRIBUTE_WORDS] {
        [self.jx as u16, self.head, self.jy as u16, self.tile]
    }
}
