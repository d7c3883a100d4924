//! Specialized collection types
//!
//! Every long-lived engine object lives in a generational arena. Handles carry
//! a generation, so a handle that outlived its object is detected instead of
//! aliasing whatever reused the slot.

pub use slotmap::{DefaultKey, Key, SlotMap};

slotmap::new_key_type! {
    /// Handle to a collision shape
    pub struct ShapeId;

    /// Handle to a sprite
    pub struct SpriteId;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;

/// Opaque identifier of the object owning a shape or sprite
///
/// Owners live outside the pipeline; the pipeline only hands the id back in
/// collision reports so the caller can route displacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub struct OwnerId(pub u32);

/// Index of a texture inside the BGMAP texture manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u16);

impl TextureId {
    /// Position inside the manager's texture table
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
