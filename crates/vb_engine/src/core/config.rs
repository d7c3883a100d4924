//! # Unified Configuration System
//!
//! All tunables of the render and collision pipeline in one serializable tree.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging, fail-fast policy, shipping build tier
//! - **Sprite Manager Config**: WORLD layers, OBJECT slots, write pacing
//! - **Texture Config**: BGMAP segments and the printing reservation
//! - **VIP Config**: frame cycle, interrupt multiplexing, drawing strategy
//! - **Camera Frustum**: the screen-space culling volume

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Hardware WORLD layers
pub const TOTAL_LAYERS: usize = 32;

/// Hardware OBJECT slots
pub const TOTAL_OBJECTS: usize = 1024;

/// Hardware OBJECT segments (SPT registers)
pub const TOTAL_OBJECT_SEGMENTS: usize = 4;

/// Hardware BGMAP segments
pub const MAX_SEGMENTS: u8 = 14;

/// # Sprite Manager Configuration
///
/// Sizes of the hardware tables the scheduler fills and the per-frame budgets
/// that spread DRAM writes across frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteManagerConfig {
    /// WORLD layers available to sprites
    pub total_layers: usize,
    /// OBJECT slots available to object sprites
    pub total_objects: usize,
    /// Texture rows written per texture per frame
    pub texture_rows_per_frame: u8,
    /// Stop writing textures after the first one still pending
    pub defer_texture_updating: bool,
    /// Spread param table effects across frames
    pub defer_param_table_effects: bool,
    /// Param table rows written per call when deferred
    pub param_table_rows_per_call: i16,
    /// Depth of each OBJECT container, one per OBJECT segment, nearest
    /// first
    pub object_containers: Vec<i16>,
}

impl SpriteManagerConfig {
    /// Create the default sprite manager configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_layers: TOTAL_LAYERS,
            total_objects: TOTAL_OBJECTS,
            texture_rows_per_frame: 16,
            defer_texture_updating: false,
            defer_param_table_effects: false,
            param_table_rows_per_call: 16,
            object_containers: Vec::new(),
        }
    }

    /// Set the number of WORLD layers
    #[must_use]
    pub fn with_total_layers(mut self, layers: usize) -> Self {
        self.total_layers = layers;
        self
    }

    /// Set the per-frame texture row budget
    #[must_use]
    pub fn with_texture_rows_per_frame(mut self, rows: u8) -> Self {
        self.texture_rows_per_frame = rows;
        self
    }

    /// Enable or disable deferred texture writing
    #[must_use]
    pub fn with_deferred_textures(mut self, defer: bool) -> Self {
        self.defer_texture_updating = defer;
        self
    }

    /// Set the OBJECT container depths
    #[must_use]
    pub fn with_object_containers(mut self, z_positions: Vec<i16>) -> Self {
        self.object_containers = z_positions;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// A description of the first inconsistent setting.
    pub fn validate(&self) -> Result<(), String> {
        if 0 == self.total_layers || self.total_layers > TOTAL_LAYERS {
            return Err(format!("total_layers must be in 1..={TOTAL_LAYERS}"));
        }

        if self.total_objects > TOTAL_OBJECTS {
            return Err(format!("total_objects must not exceed {TOTAL_OBJECTS}"));
        }

        if self.texture_rows_per_frame < 2 {
            return Err("texture_rows_per_frame must be at least 2".to_string());
        }

        if self.object_containers.len() > TOTAL_OBJECT_SEGMENTS {
            return Err(format!("at most {TOTAL_OBJECT_SEGMENTS} object containers"));
        }

        if self.object_containers.len() >= self.total_layers {
            return Err("object containers leave no WORLD layer for BGMAP sprites".to_string());
        }

        if self.object_containers.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err("object container depths must be ascending".to_string());
        }

        Ok(())
    }
}

impl Default for SpriteManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Texture Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Segments the hardware offers
    pub max_segments: u8,
    /// Segments given to the allocator; the last one also holds printing
    pub available_segments: u8,
    /// Rows reserved for printing at the bottom of the printing segment
    pub printing_rows: u8,
}

impl TextureConfig {
    /// Create the default texture configuration
    #[must_use]
    pub const fn new() -> Self {
        Self { max_segments: MAX_SEGMENTS, available_segments: MAX_SEGMENTS, printing_rows: 28 }
    }

    /// Set the number of segments handed to the allocator
    #[must_use]
    pub const fn with_available_segments(mut self, segments: u8) -> Self {
        self.available_segments = segments;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// A description of the first inconsistent setting.
    pub fn validate(&self) -> Result<(), String> {
        if 0 == self.available_segments || self.available_segments > self.max_segments {
            return Err(format!("available_segments must be in 1..={}", self.max_segments));
        }

        if self.printing_rows > 64 {
            return Err("printing_rows must fit in a 64-row segment".to_string());
        }

        Ok(())
    }
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Which interrupts may be serviced while another is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiplexedInterrupts {
    /// GAMESTART and XPEND may interrupt each other
    All,
    /// Neither may interrupt the other
    None,
    /// Only GAMESTART may arrive during XPEND
    GameStartOnly,
    /// Only XPEND may arrive during GAMESTART
    XpendOnly,
}

/// How the VIP pipeline trades stability for throughput
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawingStrategy {
    /// Suspend drawing while DRAM is written
    FavorStability,
    /// Keep drawing while DRAM is written
    FavorPerformance,
}

/// # VIP Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VipConfig {
    /// Display frames per game frame, as a power of two (0..=3)
    pub frame_cycle: u8,
    /// Re-entrancy policy
    pub multiplexed_interrupts: MultiplexedInterrupts,
    /// Drawing strategy
    pub drawing_strategy: DrawingStrategy,
}

impl VipConfig {
    /// Create the default VIP configuration
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame_cycle: 0,
            multiplexed_interrupts: MultiplexedInterrupts::All,
            drawing_strategy: DrawingStrategy::FavorStability,
        }
    }

    /// Set the frame cycle
    #[must_use]
    pub const fn with_frame_cycle(mut self, frame_cycle: u8) -> Self {
        self.frame_cycle = frame_cycle;
        self
    }

    /// Set the multiplexing policy
    #[must_use]
    pub const fn with_multiplexed_interrupts(mut self, policy: MultiplexedInterrupts) -> Self {
        self.multiplexed_interrupts = policy;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// A description of the first inconsistent setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_cycle > 3 {
            return Err("frame_cycle must be in 0..=3".to_string());
        }

        Ok(())
    }
}

impl Default for VipConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Screen-space culling volume in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFrustum {
    /// Left
    pub x0: i16,
    /// Top
    pub y0: i16,
    /// Near
    pub z0: i16,
    /// Right
    pub x1: i16,
    /// Bottom
    pub y1: i16,
    /// Far
    pub z1: i16,
}

impl CameraFrustum {
    /// The full 384x224 screen
    #[must_use]
    pub const fn full_screen() -> Self {
        Self { x0: 0, y0: 0, z0: 0, x1: 384, y1: 224, z1: 4096 }
    }

    /// Validate the frustum
    ///
    /// # Errors
    ///
    /// When a minimum is not below its maximum.
    pub fn validate(&self) -> Result<(), String> {
        if self.x0 >= self.x1 || self.y0 >= self.y1 || self.z0 >= self.z1 {
            return Err("camera frustum minimums must be below maximums".to_string());
        }

        Ok(())
    }
}

impl Default for CameraFrustum {
    fn default() -> Self {
        Self::full_screen()
    }
}

/// # Engine Configuration
///
/// Top-level configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Abort on resource exhaustion instead of reporting it
    pub fail_fast: bool,
    /// Strip hardware fault handling as in shipping builds
    pub shipping: bool,
    /// Sprite manager settings
    pub sprites: SpriteManagerConfig,
    /// Texture allocator settings
    pub textures: TextureConfig,
    /// VIP settings
    pub vip: VipConfig,
    /// Culling volume
    pub frustum: CameraFrustum,
}

impl EngineConfig {
    /// Create a new engine configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            fail_fast: cfg!(debug_assertions),
            shipping: false,
            sprites: SpriteManagerConfig::default(),
            textures: TextureConfig::default(),
            vip: VipConfig::default(),
            frustum: CameraFrustum::default(),
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable fail-fast
    #[must_use]
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Enable or disable the shipping tier
    #[must_use]
    pub fn with_shipping(mut self, enabled: bool) -> Self {
        self.shipping = enabled;
        self
    }

    /// Set sprite manager settings
    #[must_use]
    pub fn with_sprites(mut self, sprites: SpriteManagerConfig) -> Self {
        self.sprites = sprites;
        self
    }

    /// Set texture settings
    #[must_use]
    pub fn with_textures(mut self, textures: TextureConfig) -> Self {
        self.textures = textures;
        self
    }

    /// Set VIP settings
    #[must_use]
    pub fn with_vip(mut self, vip: VipConfig) -> Self {
        self.vip = vip;
        self
    }

    /// Validate the entire configuration
    ///
    /// # Errors
    ///
    /// A description of the first inconsistent setting.
    pub fn validate(&self) -> Result<(), String> {
        self.sprites.validate()?;
        self.textures.validate()?;
        self.vip.validate()?;
        self.frustum.validate()?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sprites.total_layers, 32);
        assert_eq!(config.textures.available_segments, 14);
        assert_eq!(config.frustum.x1, 384);
        assert_eq!(config.fail_fast, cfg!(debug_assertions));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = EngineConfig::new().with_sprites(SpriteManagerConfig::new().with_texture_rows_per_frame(1));
        assert!(config.validate().is_err());

        let config = EngineConfig::new().with_vip(VipConfig::new().with_frame_cycle(4));
        assert!(config.validate().is_err());

        let config = EngineConfig::new().with_textures(TextureConfig::new().with_available_segments(15));
        assert!(config.validate().is_err());

        let config =
            EngineConfig::new().with_sprites(SpriteManagerConfig::new().with_object_containers(vec![20, 10]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("fail_fast = false\n[sprites]\ntotal_layers = 8\n").unwrap();
        assert!(!config.fail_fast);
        assert_eq!(config.sprites.total_layers, 8);
        assert_eq!(config.sprites.texture_rows_per_frame, 16);
        assert_eq!(config.vip, VipConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = EngineConfig::new().with_shipping(true).with_log_level("debug");
        let text = ron::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_ron_str(&text).unwrap(), config);
    }
}
