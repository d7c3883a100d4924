//! Collision layer system for filtering collision detection
//!
//! Every shape is tagged with the layers it lives in and the layers it
//! ignores. A pair is tested only when neither side ignores a layer the
//! other lives in.

/// Collision layer definitions as bits of a `u32` mask
pub struct CollisionLayers;

impl CollisionLayers {
    /// No collision layer
    pub const NONE: u32 = 0;

    /// All collision layers
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// Static level geometry
    pub const SOLID: u32 = 1 << 0;

    /// Player character
    pub const PLAYER: u32 = 1 << 1;

    /// Enemies
    pub const ENEMY: u32 = 1 << 2;

    /// Projectiles
    pub const PROJECTILE: u32 = 1 << 3;

    /// Trigger volumes
    pub const TRIGGER: u32 = 1 << 4;

    /// Particles
    pub const PARTICLE: u32 = 1 << 5;

    /// Pickups and collectibles
    pub const PICKUP: u32 = 1 << 6;

    /// First bit free for game-specific layers
    pub const FIRST_CUSTOM_BIT: u32 = 7;

    /// Game-specific layer `n` (0-based, above the predefined ones)
    ///
    /// Returns [`CollisionLayers::NONE`] when the bit does not exist.
    #[must_use]
    pub const fn custom(n: u32) -> u32 {
        match 1_u32.checked_shl(Self::FIRST_CUSTOM_BIT + n) {
            Some(bit) => bit,
            None => Self::NONE,
        }
    }

    /// Whether a shape ignoring `layers_to_ignore` may test against a shape
    /// living in `other_layers`
    #[must_use]
    pub const fn accepts(layers_to_ignore: u32, other_layers: u32) -> bool {
        0 == (layers_to_ignore & other_layers)
    }

    /// Whether two shapes should be tested at all
    ///
    /// Neither side may ignore a layer the other lives in.
    #[must_use]
    pub const fn should_collide(layers_a: u32, ignore_a: u32, layers_b: u32, ignore_b: u32) -> bool {
        Self::accepts(ignore_a, layers_b) && Self::accepts(ignore_b, layers_a)
    }

    /// Helper to create a mask from multiple layers
    #[must_use]
    pub fn mask(layers: &[u32]) -> u32 {
        layers.iter().fold(0, |acc, &layer| acc | layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_layer_blocks_collision() {
        assert!(!CollisionLayers::should_collide(
            CollisionLayers::PLAYER,
            CollisionLayers::PARTICLE,
            CollisionLayers::PARTICLE,
            CollisionLayers::NONE,
        ));
    }

    #[test]
    fn test_ignore_is_checked_both_ways() {
        assert!(!CollisionLayers::should_collide(
            CollisionLayers::PLAYER,
            CollisionLayers::NONE,
            CollisionLayers::ENEMY,
            CollisionLayers::PLAYER,
        ));
        assert!(CollisionLayers::should_collide(
            CollisionLayers::PLAYER,
            CollisionLayers::NONE,
            CollisionLayers::ENEMY,
            CollisionLayers::NONE,
        ));
    }

    #[test]
    fn test_mask_and_custom_layers() {
        let mask = CollisionLayers::mask(&[CollisionLayers::SOLID, CollisionLayers::ENEMY]);
        assert_eq!(mask, 0b101);
        assert_eq!(CollisionLayers::custom(0), 1 << 7);
        assert_eq!(CollisionLayers::custom(40), CollisionLayers::NONE);
    }
}
