//! Per-frame rendering driven by the VIP
//!
//! [`FrameRenderer`] owns the sprite and texture managers and plugs them
//! into [`VipManager`](crate::hardware::VipManager): GAMESTART lays out the
//! WORLD and OBJECT caches, XPEND copies them and any pending texture rows
//! to DRAM.

use super::bgmap_texture_manager::BgmapTextureManager;
use super::sprite::SpriteSpec;
use super::sprite_manager::{RenderStats, SpriteManager};
use crate::core::config::{CameraFrustum, EngineConfig};
use crate::core::error::EngineResult;
use crate::foundation::collections::{OwnerId, SpriteId};
use crate::foundation::logging::{debug, trace};
use crate::foundation::math::Rotation;
use crate::hardware::{Device, FramePipeline};

/// Sprite and texture managers bound to one camera frustum
#[derive(Debug)]
pub struct FrameRenderer {
    sprites: SpriteManager,
    textures: BgmapTextureManager,
    frustum: CameraFrustum,
    frames: u32,
    last_stats: RenderStats,
}

impl FrameRenderer {
    /// Build the managers from `config`
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        debug!(
            "Frame renderer with {} layers, {} objects, {} BGMAP segments",
            config.sprites.total_layers, config.sprites.total_objects, config.textures.available_segments
        );

        Self {
            sprites: SpriteManager::new(&config.sprites),
            textures: BgmapTextureManager::new(&config.textures),
            frustum: config.frustum,
            frames: 0,
            last_stats: RenderStats::default(),
        }
    }

    /// Drop every sprite and texture and zero video memory
    pub fn reset(&mut self, device: &mut dyn Device) {
        self.sprites.reset();
        self.textures.reset();
        self.sprites.clear_dram(device);

        for segment in 0..self.textures.available_segments() {
            BgmapTextureManager::clear_bgmap_segment(device, segment);
        }

        self.frames = 0;
        self.last_stats = RenderStats::default();
    }

    /// Create a sprite, allocating its texture
    ///
    /// # Errors
    ///
    /// See [`SpriteManager::create_sprite`].
    pub fn create_sprite(&mut self, spec: &SpriteSpec, owner: Option<OwnerId>) -> EngineResult<SpriteId> {
        self.sprites.create_sprite(spec, owner, &mut self.textures)
    }

    /// Destroy a sprite and release its texture
    ///
    /// # Errors
    ///
    /// See [`SpriteManager::destroy_sprite`].
    pub fn destroy_sprite(&mut self, id: SpriteId) -> EngineResult<()> {
        self.sprites.destroy_sprite(id, &mut self.textures)
    }

    /// Rotate a sprite, mirroring its texture
    ///
    /// # Errors
    ///
    /// See [`SpriteManager::set_sprite_rotation`].
    pub fn set_sprite_rotation(&mut self, id: SpriteId, rotation: Rotation) -> EngineResult<()> {
        self.sprites.set_sprite_rotation(id, rotation, &mut self.textures)
    }

    /// Sprite manager
    #[must_use]
    pub const fn sprites(&self) -> &SpriteManager {
        &self.sprites
    }

    /// Mutable sprite manager
    pub fn sprites_mut(&mut self) -> &mut SpriteManager {
        &mut self.sprites
    }

    /// Texture manager
    #[must_use]
    pub const fn textures(&self) -> &BgmapTextureManager {
        &self.textures
    }

    /// Mutable texture manager
    pub fn textures_mut(&mut self) -> &mut BgmapTextureManager {
        &mut self.textures
    }

    /// Visible region
    #[must_use]
    pub const fn frustum(&self) -> &CameraFrustum {
        &self.frustum
    }

    /// Change the visible region
    pub fn set_frustum(&mut self, frustum: CameraFrustum) {
        self.frustum = frustum;
    }

    /// Frames rendered since the last reset
    #[must_use]
    pub const fn frames(&self) -> u32 {
        self.frames
    }

    /// Outcome of the last successful render
    #[must_use]
    pub const fn last_stats(&self) -> RenderStats {
        self.last_stats
    }
}

impl FramePipeline for FrameRenderer {
    fn game_start(&mut self, _device: &mut dyn Device) -> EngineResult<()> {
        self.frames = self.frames.wrapping_add(1);

        let stats = self.sprites.render(&self.frustum, &self.textures)?;
        trace!("Frame {}: {stats:?}", self.frames);
        self.last_stats = stats;

        Ok(())
    }

    fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()> {
        self.sprites.write_dram(device, &mut self.textures);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SpriteManagerConfig;
    use crate::events::EventType;
    use crate::foundation::math::PixelVector;
    use crate::hardware::{Interrupt, MemoryDevice, VipManager, WorldAttributes};
    use crate::render::texture::TextureSpec;
    use std::sync::Arc;

    fn config(layers: usize) -> EngineConfig {
        EngineConfig::new()
            .with_fail_fast(false)
            .with_sprites(SpriteManagerConfig::new().with_total_layers(layers))
    }

    fn frame(vip: &mut VipManager, device: &mut MemoryDevice, renderer: &mut FrameRenderer) {
        device.raise(Interrupt::GAMESTART | Interrupt::XPEND);
        vip.interrupt_handler(device, renderer);
    }

    #[test]
    fn test_sprite_reaches_world_memory() {
        let config = config(32);
        let mut vip = VipManager::new(&config);
        let mut device = MemoryDevice::new();
        let mut renderer = FrameRenderer::new(&config);
        vip.start_drawing(&mut device);

        let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(4, 4)));
        let id = renderer.create_sprite(&spec, Some(OwnerId(7))).unwrap();
        renderer.sprites_mut().set_sprite_position(id, PixelVector::new(192, 112, 0, 0)).unwrap();

        // Texture rows go out during the first XPEND, the sprite shows up after
        frame(&mut vip, &mut device, &mut renderer);
        assert!(renderer.textures().texture(renderer.sprites().sprite(id).unwrap().texture().unwrap()).unwrap().is_written());
        assert_eq!(device.world(31), Some(&WorldAttributes::END));

        frame(&mut vip, &mut device, &mut renderer);
        assert_eq!(renderer.frames(), 2);
        assert_eq!(renderer.last_stats().rendered_sprites, 1);
        assert_eq!(device.world(31).map(|world| (world.gx, world.gy, world.w, world.h)), Some((176, 96, 31, 31)));
        assert_eq!(device.world(30), Some(&WorldAttributes::END));
    }

    #[test]
    fn test_layer_shortage_is_reported_as_event() {
        let config = config(2);
        let mut vip = VipManager::new(&config);
        let mut device = MemoryDevice::new();
        let mut renderer = FrameRenderer::new(&config);
        vip.start_drawing(&mut device);

        for z in 0..3 {
            let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(1, 1)));
            let id = renderer.create_sprite(&spec, None).unwrap();
            renderer.sprites_mut().set_sprite_position(id, PixelVector::new(100, 100, z, 0)).unwrap();
        }

        frame(&mut vip, &mut device, &mut renderer);
        frame(&mut vip, &mut device, &mut renderer);

        let reported = vip.events().pending().iter().any(|event| event.event_type == EventType::ResourceExhausted);
        assert!(reported);
        // The frame still went out with what fit
        assert_eq!(device.world(0), Some(&WorldAttributes::END));
    }

    #[test]
    fn test_destroy_and_reset() {
        let config = config(32);
        let mut device = MemoryDevice::new();
        let mut renderer = FrameRenderer::new(&config);

        let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(2, 2)));
        let id = renderer.create_sprite(&spec, None).unwrap();
        assert_eq!(renderer.textures().len(), 1);

        renderer.destroy_sprite(id).unwrap();
        assert!(renderer.sprites().sprite(id).is_none());

        renderer.create_sprite(&spec, None).unwrap();
        renderer.reset(&mut device);

        assert!(renderer.textures().is_empty());
        assert_eq!(renderer.frames(), 0);
        assert_eq!(device.world(31), Some(&WorldAttributes::default()));
    }
}
