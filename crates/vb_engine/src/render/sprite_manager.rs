//! # Sprite Manager
//!
//! Schedules sprites onto the WORLD layers every frame.
//!
//! BGMAP sprites and object containers share one list kept sorted by depth,
//! nearest first. Rendering walks that list from the deepest sprite and
//! hands out layers from the top of the WORLD table downwards, so the VIP,
//! which draws from the top layer down, paints far sprites first. Each
//! object container then lays out the OBJECT characters of its own sprites.
//!
//! Everything is written to CPU-side caches first; [`SpriteManager::write_dram`]
//! copies them to the device once the frame has been rendered.

use super::bgmap_texture_manager::BgmapTextureManager;
use super::sprite::{Sprite, SpriteKind, SpriteSpec, Transparency, NO_RENDER_INDEX};
use crate::core::config::{CameraFrustum, SpriteManagerConfig, TOTAL_OBJECT_SEGMENTS};
use crate::core::error::{EngineError, EngineResult, ResourceExhausted};
use crate::foundation::collections::{OwnerId, SlotMap, SpriteId};
use crate::foundation::logging::{debug, trace, warn};
use crate::foundation::math::{PixelVector, Rotation, Scale};
use crate::hardware::memory_device::PARAM_TABLE_WORDS;
use crate::hardware::{Device, ObjectAttributes, Register, ScreenCount, WorldAttributes, WorldHead};

/// Param tables start on 16-word boundaries
const PARAM_TABLE_ALIGNMENT: usize = 16;

/// Outcome of one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Sprites that took a WORLD layer
    pub rendered_sprites: usize,
    /// Layer holding the end marker
    pub free_layer: i16,
    /// OBJECT slots taken
    pub used_objects: usize,
}

/// Sprites drawn by one OBJECT segment
#[derive(Debug, Clone)]
struct ObjectContainer {
    sprite: SpriteId,
    sprites: Vec<SpriteId>,
    sorting_node: Option<usize>,
}

/// # Sprite Manager
pub struct SpriteManager {
    config: SpriteManagerConfig,
    sprites: SlotMap<SpriteId, Sprite>,
    bgmap_sprites: Vec<SpriteId>,
    sorting_node: Option<usize>,
    object_containers: Vec<Option<ObjectContainer>>,
    special_sprites: Vec<SpriteId>,
    world_cache: Vec<WorldAttributes>,
    object_cache: Vec<ObjectAttributes>,
    spt_cache: [i32; TOTAL_OBJECT_SEGMENTS],
    spt: i32,
    free_layer: i16,
    object_index: i32,
    previous_object_index: i32,
    even_frame: u8,
    complete_sort: bool,
    locked: bool,
    rendered: bool,
    next_param_table: usize,
}

impl std::fmt::Debug for SpriteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteManager")
            .field("sprites", &self.sprites.len())
            .field("bgmap_sprites", &self.bgmap_sprites.len())
            .field("free_layer", &self.free_layer)
            .field("object_index", &self.object_index)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl SpriteManager {
    /// Create a manager with the configured object containers
    #[must_use]
    pub fn new(config: &SpriteManagerConfig) -> Self {
        let mut manager = Self {
            config: config.clone(),
            sprites: SlotMap::with_key(),
            bgmap_sprites: Vec::new(),
            sorting_node: None,
            object_containers: Vec::new(),
            special_sprites: Vec::new(),
            world_cache: vec![WorldAttributes::default(); config.total_layers],
            object_cache: vec![ObjectAttributes::HIDDEN; config.total_objects],
            spt_cache: [0; TOTAL_OBJECT_SEGMENTS],
            spt: 0,
            free_layer: 0,
            object_index: 0,
            previous_object_index: 0,
            even_frame: Transparency::Even.bits(),
            complete_sort: true,
            locked: false,
            rendered: false,
            next_param_table: 0,
        };

        manager.reset();
        manager
    }

    /// Drop every sprite and start over with fresh caches
    pub fn reset(&mut self) {
        self.sprites.clear();
        self.bgmap_sprites.clear();
        self.special_sprites.clear();
        self.sorting_node = None;
        self.next_param_table = 0;
        self.locked = false;
        self.rendered = false;
        self.complete_sort = true;
        self.even_frame = Transparency::Even.bits();

        self.world_cache.fill(WorldAttributes::default());
        self.object_cache.fill(ObjectAttributes::HIDDEN);

        self.start_rendering();
        self.previous_object_index = self.object_index;
        self.spt_cache = [self.object_index; TOTAL_OBJECT_SEGMENTS];
        self.free_layer = self.top_layer();

        self.setup_object_containers();
        self.stop_rendering();
    }

    fn top_layer(&self) -> i16 {
        i16::try_from(self.config.total_layers).unwrap_or(i16::MAX) - 1
    }

    fn last_object(&self) -> i32 {
        i32::try_from(self.config.total_objects).unwrap_or(i32::MAX) - 1
    }

    /// One container per configured depth, registered like any sprite
    fn setup_object_containers(&mut self) {
        self.object_containers = vec![None; TOTAL_OBJECT_SEGMENTS];

        let depths = self.config.object_containers.clone();

        for (segment, &z) in depths.iter().enumerate().take(TOTAL_OBJECT_SEGMENTS).rev() {
            let id = self.sprites.insert(Sprite::object_container(segment, z));
            self.insert_sorted(id);
            self.object_containers[segment] = Some(ObjectContainer { sprite: id, sprites: Vec::new(), sorting_node: None });

            debug!("OBJECT container {segment} at depth {z}");
        }
    }

    /// Build a sprite from `spec`
    ///
    /// BGMAP sprites get their texture right away and enter the render list
    /// the first time they are positioned. OBJECT sprites are listed in the
    /// container closest in depth.
    ///
    /// # Errors
    ///
    /// [`ResourceExhausted::OutOfTextureMemory`] when the texture does not
    /// fit, [`EngineError::InvalidArgument`] for an OBJECT sprite without
    /// containers or an AFFINE sprite without param table memory.
    pub fn create_sprite(
        &mut self,
        spec: &SpriteSpec,
        owner: Option<OwnerId>,
        textures: &mut BgmapTextureManager,
    ) -> EngineResult<SpriteId> {
        if spec.is_object() {
            let container = self
                .object_container_for(spec.displacement.z)
                .ok_or_else(|| EngineError::InvalidArgument("no OBJECT container configured".to_string()))?;

            let id = self.sprites.insert(Sprite::object(spec, container, owner));
            self.insert_sorted(id);

            return Ok(id);
        }

        let must_live_at_even_segment = ScreenCount::Sc1x1 != spec.screen_count;
        let texture = textures.get_texture(&spec.texture, 0, must_live_at_even_segment, spec.screen_count)?;

        let param_rows = if spec.mode.uses_param_table() {
            match self.reserve_param_table(usize::from(spec.texture.rows) << 3) {
                Ok(rows) => Some(rows),
                Err(err) => {
                    textures.release_texture(texture);
                    return Err(err);
                }
            }
        } else {
            None
        };

        let mut sprite = Sprite::bgmap(spec, texture, owner);

        if let Some((offset, rows)) = param_rows {
            sprite.attach_param_table(offset, rows);
        }

        let has_effects = sprite.param_table().is_some();
        let id = self.sprites.insert(sprite);

        if has_effects {
            self.special_sprites.push(id);
        }

        trace!("Created sprite {id:?} with texture {}", texture.0);

        Ok(id)
    }

    fn reserve_param_table(&mut self, rows: usize) -> EngineResult<(usize, usize)> {
        let offset = self.next_param_table;
        let size = (rows * super::sprite::AFFINE_ROW_WORDS).next_multiple_of(PARAM_TABLE_ALIGNMENT);

        if offset + size > PARAM_TABLE_WORDS {
            return Err(EngineError::InvalidArgument(format!("no param table memory left for {rows} rows")));
        }

        self.next_param_table += size;

        Ok((offset, rows))
    }

    /// Put a sprite in the depth-sorted render list
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] while the lists are locked and
    /// [`EngineError::StaleReference`] for a destroyed sprite.
    pub fn register_sprite(&mut self, id: SpriteId) -> EngineResult<()> {
        if self.locked {
            return Err(EngineError::InvalidArgument("sprite lists are locked".to_string()));
        }

        let sprite = self.sprites.get(id).ok_or(EngineError::StaleReference("sprite"))?;

        if sprite.is_registered() {
            warn!("Sprite {id:?} is already registered");
            return Ok(());
        }

        self.insert_sorted(id);

        Ok(())
    }

    /// Insert before the first sprite at the same depth or deeper
    fn insert_sorted(&mut self, id: SpriteId) {
        let Some(sprite) = self.sprites.get(id) else {
            return;
        };

        let depth = sprite.depth();
        let sprites = &self.sprites;

        let (list, sorting_node) = match sprite.kind() {
            SpriteKind::Object { container, .. } => match self.object_containers.get_mut(*container) {
                Some(Some(container)) => (&mut container.sprites, &mut container.sorting_node),
                _ => return,
            },
            _ => (&mut self.bgmap_sprites, &mut self.sorting_node),
        };

        let position = list
            .iter()
            .position(|other| sprites.get(*other).is_some_and(|other| depth <= other.depth()))
            .unwrap_or(list.len());

        list.insert(position, id);
        *sorting_node = Some(position);

        if let Some(sprite) = self.sprites.get_mut(id) {
            sprite.set_registered(true);
        }
    }

    /// Take a sprite out of the render list; it keeps its resources
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] while the lists are locked and
    /// [`EngineError::StaleReference`] for a destroyed sprite.
    pub fn unregister_sprite(&mut self, id: SpriteId) -> EngineResult<()> {
        if self.locked {
            return Err(EngineError::InvalidArgument("sprite lists are locked".to_string()));
        }

        let sprite = self.sprites.get_mut(id).ok_or(EngineError::StaleReference("sprite"))?;
        sprite.set_registered(false);

        let list = match sprite.kind() {
            SpriteKind::Object { container, .. } => match self.object_containers.get_mut(*container) {
                Some(Some(container)) => {
                    container.sorting_node = None;
                    &mut container.sprites
                }
                _ => return Ok(()),
            },
            _ => {
                self.sorting_node = None;
                &mut self.bgmap_sprites
            }
        };

        list.retain(|other| *other != id);

        Ok(())
    }

    /// Hide a sprite, give its texture back and forget it
    ///
    /// The layer the sprite held is switched off. When it was the last
    /// layer in use it becomes the end marker instead.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidArgument`] while the lists are locked and
    /// [`EngineError::StaleReference`] for a destroyed sprite.
    pub fn destroy_sprite(&mut self, id: SpriteId, textures: &mut BgmapTextureManager) -> EngineResult<()> {
        self.unregister_sprite(id)?;

        let Some(mut sprite) = self.sprites.remove(id) else {
            return Err(EngineError::StaleReference("sprite"));
        };

        let index = sprite.index();

        if NO_RENDER_INDEX != index {
            match sprite.kind() {
                SpriteKind::Object { .. } => {
                    let first = usize::try_from(index).unwrap_or(0);
                    let last = (first + sprite.total_objects()).min(self.object_cache.len());

                    for object in self.object_cache.get_mut(first..last).into_iter().flatten() {
                        object.head = ObjectAttributes::HIDE_MASK;
                    }
                }
                _ => {
                    if let Some(world) = self.world_cache.get_mut(usize::try_from(index).unwrap_or(usize::MAX)) {
                        if index == self.free_layer + 1 {
                            *world = WorldAttributes::END;
                            self.free_layer = index;
                        } else {
                            world.head = WorldHead::OFF;
                        }
                    }
                }
            }
        }

        if let Some(texture) = sprite.take_texture() {
            textures.release_texture(texture);
        }

        self.special_sprites.retain(|other| *other != id);

        trace!("Destroyed sprite {id:?}");

        Ok(())
    }

    /// Sprite by handle
    #[must_use]
    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    /// Mutable sprite by handle
    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.get_mut(id)
    }

    /// Move a sprite, registering it the first time
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] for a destroyed sprite, and the
    /// errors of [`Self::register_sprite`] on first placement.
    pub fn set_sprite_position(&mut self, id: SpriteId, position: PixelVector) -> EngineResult<()> {
        let sprite = self.sprites.get_mut(id).ok_or(EngineError::StaleReference("sprite"))?;
        sprite.set_position(position);

        if !sprite.is_registered() {
            self.register_sprite(id)?;
        }

        Ok(())
    }

    /// Rotate a sprite, mirroring its texture past a quarter turn
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] for a destroyed sprite.
    pub fn set_sprite_rotation(
        &mut self,
        id: SpriteId,
        rotation: Rotation,
        textures: &mut BgmapTextureManager,
    ) -> EngineResult<()> {
        let sprite = self.sprites.get_mut(id).ok_or(EngineError::StaleReference("sprite"))?;
        let (horizontal, vertical) = sprite.set_rotation(rotation);

        if let Some(texture) = sprite.texture() {
            textures.set_horizontal_flip(texture, horizontal);
            textures.set_vertical_flip(texture, vertical);
        }

        Ok(())
    }

    /// Scale a sprite
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleReference`] for a destroyed sprite.
    pub fn set_sprite_scale(&mut self, id: SpriteId, scale: Scale) -> EngineResult<()> {
        self.sprites.get_mut(id).ok_or(EngineError::StaleReference("sprite"))?.set_scale(scale);

        Ok(())
    }

    /// Forbid registering and unregistering, and skip sorting
    pub fn lock_sprites_lists(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Whether the lists are locked
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Do one bounded unit of sorting work
    ///
    /// With `complete` every list is fully sorted. Otherwise at most one
    /// pair of neighbours is swapped. Returns whether a swap happened, that
    /// is, whether calling again may still change the order.
    pub fn sort_progressively(&mut self, complete: bool) -> bool {
        let sprites = &self.sprites;
        let mut swapped = sort_list(&mut self.bgmap_sprites, &mut self.sorting_node, sprites, complete);

        for container in self.object_containers.iter_mut().flatten() {
            if swapped && !complete {
                break;
            }

            swapped |= sort_list(&mut container.sprites, &mut container.sorting_node, sprites, complete);
        }

        swapped
    }

    /// Sort every list to completion
    pub fn sort_sprites(&mut self) {
        while self.sort_progressively(true) {}

        self.complete_sort = false;
    }

    /// Assign WORLD layers and OBJECT slots for this frame
    ///
    /// The frame is always laid out as far as resources go; sprites that
    /// did not fit are left undrawn and reported.
    ///
    /// # Errors
    ///
    /// [`ResourceExhausted::OutOfRenderLayers`] when more sprites are visible
    /// than there are layers and [`ResourceExhausted::OutOfObjectSlots`]
    /// when OBJECT sprites need more characters than are left.
    pub fn render(&mut self, frustum: &CameraFrustum, textures: &BgmapTextureManager) -> EngineResult<RenderStats> {
        self.start_rendering();

        if !self.locked {
            let complete = std::mem::replace(&mut self.complete_sort, false);
            self.sort_progressively(complete);
        }

        self.even_frame = if Transparency::Even.bits() == self.even_frame {
            Transparency::Odd.bits()
        } else {
            Transparency::Even.bits()
        };

        self.free_layer = self.top_layer();

        let mut rendered_sprites = 0;
        let mut overflow = 0;

        for &id in self.bgmap_sprites.iter().rev() {
            let Some(sprite) = self.sprites.get_mut(id) else {
                continue;
            };

            if !sprite.is_visible() || 0 != sprite.transparency().bits() & self.even_frame {
                sprite.set_index(NO_RENDER_INDEX);
                continue;
            }

            // Layer 0 is kept for the end marker
            if 0 >= self.free_layer {
                if sprite.prepare_to_render(frustum, textures) {
                    overflow += 1;
                }

                sprite.set_index(NO_RENDER_INDEX);
                continue;
            }

            let layer = self.free_layer;
            let Some(world) = self.world_cache.get_mut(usize::try_from(layer).unwrap_or(usize::MAX)) else {
                continue;
            };

            if layer == sprite.render(layer, world, frustum, textures) {
                self.free_layer -= 1;
                rendered_sprites += 1;
            }
        }

        let (object_shortage, objects_left) = self.render_objects(frustum);

        self.stop_rendering();
        self.rendered = true;

        let stats = RenderStats {
            rendered_sprites,
            free_layer: self.free_layer,
            used_objects: usize::try_from(self.last_object() - self.object_index).unwrap_or(0),
        };

        if 0 < overflow {
            let available = usize::try_from(self.top_layer()).unwrap_or(0);
            return Err(ResourceExhausted::OutOfRenderLayers { requested: rendered_sprites + overflow, available }.into());
        }

        if 0 < object_shortage {
            return Err(ResourceExhausted::OutOfObjectSlots { requested: object_shortage, available: objects_left }.into());
        }

        Ok(stats)
    }

    /// Lay out OBJECT characters container by container, deepest segment
    /// first; returns the characters that did not fit and the free slots
    /// left when the first sprite was turned away
    fn render_objects(&mut self, frustum: &CameraFrustum) -> (usize, usize) {
        let mut shortage = 0;
        let mut available = 0;

        for segment in (0..self.object_containers.len()).rev() {
            let Some(container) = self.object_containers[segment].as_ref() else {
                continue;
            };

            let first_object_index = self.object_index;
            let layer = self.sprites.get(container.sprite).map_or(NO_RENDER_INDEX, Sprite::index);
            let shown = NO_RENDER_INDEX != layer;

            for &id in container.sprites.iter().rev() {
                let Some(sprite) = self.sprites.get_mut(id) else {
                    continue;
                };

                let total = i32::try_from(sprite.total_objects()).unwrap_or(i32::MAX);

                if !shown
                    || !sprite.is_visible()
                    || !sprite.is_positioned()
                    || 0 != sprite.transparency().bits() & self.even_frame
                {
                    sprite.set_index(NO_RENDER_INDEX);
                    continue;
                }

                if self.object_index + 1 < total {
                    if 0 == shortage {
                        available = usize::try_from(self.object_index + 1).unwrap_or(0);
                    }

                    shortage += sprite.total_objects();
                    sprite.set_index(NO_RENDER_INDEX);
                    continue;
                }

                let first = usize::try_from(self.object_index - (total - 1)).unwrap_or(0);
                sprite.render_objects(first, &mut self.object_cache, frustum);
                self.object_index -= total;
            }

            let world = usize::try_from(layer).ok().and_then(|layer| self.world_cache.get_mut(layer));

            if first_object_index == self.object_index {
                if let Some(object) = usize::try_from(self.object_index).ok().and_then(|index| self.object_cache.get_mut(index)) {
                    object.head = ObjectAttributes::HIDE_MASK;
                    self.object_index -= 1;
                }

                if let Some(world) = world {
                    world.head = WorldHead::OFF;
                }
            } else {
                if let Some(world) = world {
                    world.head = WorldHead::ON | WorldHead::OBJECT | WorldHead::OVR;
                }

                // Lower segments end where this one started
                let spt = usize::try_from(self.spt).unwrap_or(0);

                for cached in self.spt_cache.iter_mut().take(spt) {
                    *cached = self.object_index;
                }

                self.spt -= 1;
            }
        }

        (shortage, available)
    }

    fn start_rendering(&mut self) {
        self.spt = i32::try_from(TOTAL_OBJECT_SEGMENTS).unwrap_or(0) - 1;
        self.object_index = self.last_object();
    }

    /// Mark the end of the layer list and hide the OBJECT slots freed
    /// since the previous frame
    fn stop_rendering(&mut self) {
        if let Some(world) = usize::try_from(self.free_layer).ok().and_then(|layer| self.world_cache.get_mut(layer)) {
            *world = WorldAttributes::END;
        }

        let low = self.previous_object_index.max(0);

        if low <= self.object_index {
            for index in low..=self.object_index {
                if let Some(object) = usize::try_from(index).ok().and_then(|index| self.object_cache.get_mut(index)) {
                    object.head = ObjectAttributes::HIDE_MASK;
                }
            }
        }

        self.previous_object_index = self.object_index;
    }

    /// Push this frame to the device
    ///
    /// Writes pending texture rows, param table effects, then the OBJECT
    /// and WORLD caches. Without a render since the last call nothing is
    /// written.
    pub fn write_dram(&mut self, device: &mut dyn Device, textures: &mut BgmapTextureManager) {
        if !self.rendered {
            warn!("write_dram called before render, skipping");
            return;
        }

        self.rendered = false;

        textures.update_textures(
            device,
            Some(self.config.texture_rows_per_frame),
            self.config.defer_texture_updating,
        );

        self.apply_special_effects(device);
        self.write_attributes(device);
    }

    fn apply_special_effects(&mut self, device: &mut dyn Device) {
        let rows_per_call = if self.config.defer_param_table_effects {
            usize::try_from(self.config.param_table_rows_per_call).unwrap_or(1).max(1)
        } else {
            usize::MAX
        };

        for &id in &self.special_sprites {
            let Some(sprite) = self.sprites.get_mut(id) else {
                continue;
            };

            if !sprite.is_visible() {
                continue;
            }

            let Some(table) = sprite.param_table_mut() else {
                continue;
            };

            if table.is_written() {
                continue;
            }

            let rows = rows_per_call.min(table.len() - table.next_row);
            let start = table.next_row * table.row_words;
            let end = start + rows * table.row_words;

            device.write_param(table.offset + start, &table.rows[start..end]);
            table.next_row += rows;
        }
    }

    /// SPT registers, the used OBJECT slots compacted to the bottom of OAM,
    /// and the WORLD layers from the end marker up
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn write_attributes(&self, device: &mut dyn Device) {
        let object_index = self.object_index.max(0);

        for (segment, &cached) in self.spt_cache.iter().enumerate() {
            device.write_register(Register::SPT[segment], (cached - object_index).max(0) as u16);
        }

        let first = object_index as usize;

        for (slot, object) in self.object_cache.iter().skip(first).enumerate() {
            device.write_object(slot, object);
        }

        let free_layer = usize::try_from(self.free_layer).unwrap_or(0);

        for (layer, world) in self.world_cache.iter().enumerate().skip(free_layer) {
            device.write_world(layer, world);
        }
    }

    /// Zero WORLD and OBJECT memory on the device and in the caches
    pub fn clear_dram(&mut self, device: &mut dyn Device) {
        self.world_cache.fill(WorldAttributes::default());
        self.object_cache.fill(ObjectAttributes::HIDDEN);

        for (layer, world) in self.world_cache.iter().enumerate() {
            device.write_world(layer, world);
        }

        for (slot, object) in self.object_cache.iter().enumerate() {
            device.write_object(slot, object);
        }

        for register in Register::SPT {
            device.write_register(register, 0);
        }
    }

    /// Show every sprite but `spare`, which is hidden
    pub fn show_all(&mut self, spare: Option<SpriteId>) {
        for (id, sprite) in &mut self.sprites {
            if Some(id) == spare {
                sprite.hide();
            } else {
                sprite.show();
            }
        }
    }

    /// Hide every sprite but `spare`, which is shown
    pub fn hide_all(&mut self, spare: Option<SpriteId>) {
        for (id, sprite) in &mut self.sprites {
            if Some(id) == spare {
                sprite.show();
            } else {
                sprite.hide();
            }
        }
    }

    /// Forget every layer assignment and sort fully on the next render
    pub fn invalidate_rendering(&mut self) {
        for (_, sprite) in &mut self.sprites {
            sprite.set_index(NO_RENDER_INDEX);
        }

        self.complete_sort = true;
    }

    /// Set the texture rows written per texture per frame, at least 2
    pub fn set_textures_maximum_rows_to_write(&mut self, rows: u8) {
        self.config.texture_rows_per_frame = rows.max(2);
    }

    /// Texture rows written per texture per frame
    #[must_use]
    pub const fn textures_maximum_rows_to_write(&self) -> u8 {
        self.config.texture_rows_per_frame
    }

    /// Write only one texture per frame, whole
    pub fn defer_texture_updating(&mut self, defer: bool) {
        self.config.defer_texture_updating = defer;
    }

    /// Spread param table writes across frames
    pub fn defer_param_table_effects(&mut self, defer: bool) {
        self.config.defer_param_table_effects = defer;
    }

    /// Param table rows written per sprite per frame when deferred
    pub fn set_maximum_param_table_rows_to_compute_per_call(&mut self, rows: i16) {
        self.config.param_table_rows_per_call = rows.max(1);
    }

    /// Sprites in the render list, containers included
    #[must_use]
    pub fn number_of_sprites(&self) -> usize {
        self.bgmap_sprites.len()
    }

    /// Sprite at `position` in the render list, nearest first
    #[must_use]
    pub fn sprite_at(&self, position: usize) -> Option<SpriteId> {
        self.bgmap_sprites.get(position).copied()
    }

    /// Layer holding the end marker
    #[must_use]
    pub const fn free_layer(&self) -> i16 {
        self.free_layer
    }

    /// Cached WORLD record of `layer`
    #[must_use]
    pub fn world_attributes(&self, layer: usize) -> Option<&WorldAttributes> {
        self.world_cache.get(layer)
    }

    /// Cached OBJECT record of `slot`
    #[must_use]
    pub fn object_attributes(&self, slot: usize) -> Option<&ObjectAttributes> {
        self.object_cache.get(slot)
    }

    /// Container whose depth is closest to `z`
    #[must_use]
    pub fn object_container_for(&self, z: i16) -> Option<usize> {
        self.object_containers
            .iter()
            .enumerate()
            .filter_map(|(segment, container)| {
                let container = container.as_ref()?;
                let depth = self.sprites.get(container.sprite)?.depth();
                Some((segment, (depth - i32::from(z)).abs()))
            })
            .min_by_key(|&(_, distance)| distance)
            .map(|(segment, _)| segment)
    }

    /// Show or hide an object container with all its sprites
    pub fn show_object_container(&mut self, segment: usize, show: bool) {
        let Some(Some(container)) = self.object_containers.get(segment) else {
            return;
        };

        if let Some(sprite) = self.sprites.get_mut(container.sprite) {
            if show {
                sprite.show();
            } else {
                sprite.hide();
            }
        }
    }

    /// Pixels covered by everything drawn last frame
    #[must_use]
    pub fn total_pixels_drawn(&self) -> usize {
        self.sprites.values().filter(|sprite| sprite.is_visible()).map(Sprite::total_pixels).sum()
    }
}

/// One bounded sorting step over `list`, see
/// [`SpriteManager::sort_progressively`]
fn sort_list(
    list: &mut [SpriteId],
    sorting_node: &mut Option<usize>,
    sprites: &SlotMap<SpriteId, Sprite>,
    complete: bool,
) -> bool {
    let depth = |id: SpriteId| sprites.get(id).map_or(i32::MAX, Sprite::depth);

    if list.len() < 2 {
        *sorting_node = None;
        return false;
    }

    let pairs = list.len() - 1;

    if complete {
        let mut any = false;

        loop {
            let mut swapped = false;

            for index in 0..pairs {
                if depth(list[index + 1]) < depth(list[index]) {
                    list.swap(index, index + 1);
                    swapped = true;
                }
            }

            any |= swapped;

            if !swapped {
                break;
            }
        }

        *sorting_node = None;
        return any;
    }

    let start = sorting_node.unwrap_or(0) % pairs;

    for step in 0..pairs {
        let index = (start + step) % pairs;

        if depth(list[index + 1]) < depth(list[index]) {
            list.swap(index, index + 1);
            *sorting_node = Some(index + 1);
            return true;
        }
    }

    *sorting_node = None;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TextureConfig;
    use crate::hardware::{DeviceWrite, MemoryDevice};
    use crate::render::texture::TextureSpec;
    use std::sync::Arc;

    struct Fixture {
        sprites: SpriteManager,
        textures: BgmapTextureManager,
        frustum: CameraFrustum,
    }

    impl Fixture {
        fn new(config: SpriteManagerConfig) -> Self {
            Self {
                sprites: SpriteManager::new(&config),
                textures: BgmapTextureManager::new(&TextureConfig::new()),
                frustum: CameraFrustum::full_screen(),
            }
        }

        /// A 2x2 tile sprite at `x, y, z` with its texture already written
        fn sprite_at(&mut self, x: i16, y: i16, z: i16) -> SpriteId {
            let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(2, 2)));
            let id = self.sprites.create_sprite(&spec, None, &mut self.textures).unwrap();
            self.sprites.set_sprite_position(id, PixelVector::new(x, y, z, 0)).unwrap();
            self.textures.update_textures(&mut MemoryDevice::new(), None, false);
            id
        }

        fn render(&mut self) -> EngineResult<RenderStats> {
            self.sprites.render(&self.frustum, &self.textures)
        }

        fn depths(&self) -> Vec<i32> {
            (0..self.sprites.number_of_sprites())
                .filter_map(|position| self.sprites.sprite_at(position))
                .filter_map(|id| self.sprites.sprite(id))
                .map(Sprite::depth)
                .collect()
        }
    }

    #[test]
    fn test_registration_keeps_depth_order() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        fixture.sprite_at(10, 10, 10);
        fixture.sprite_at(20, 20, 30);
        fixture.sprite_at(30, 30, 20);

        assert_eq!(fixture.depths(), vec![10, 20, 30]);
    }

    #[test]
    fn test_locked_lists_reject_registration() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(1, 1)));
        let id = fixture.sprites.create_sprite(&spec, None, &mut fixture.textures).unwrap();

        fixture.sprites.lock_sprites_lists(true);

        assert!(matches!(fixture.sprites.register_sprite(id), Err(EngineError::InvalidArgument(_))));
        assert_eq!(fixture.sprites.number_of_sprites(), 0);

        fixture.sprites.lock_sprites_lists(false);
        fixture.sprites.register_sprite(id).unwrap();
        assert_eq!(fixture.sprites.number_of_sprites(), 1);
    }

    #[test]
    fn test_progressive_sort_converges() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let near = fixture.sprite_at(10, 10, 10);
        fixture.sprite_at(20, 20, 20);
        fixture.sprite_at(30, 30, 30);

        fixture.sprites.set_sprite_position(near, PixelVector::new(10, 10, 40, 0)).unwrap();

        assert!(fixture.sprites.sort_progressively(false));
        assert_eq!(fixture.depths(), vec![20, 40, 30]);
        assert!(fixture.sprites.sort_progressively(false));
        assert_eq!(fixture.depths(), vec![20, 30, 40]);
        assert!(!fixture.sprites.sort_progressively(false));
    }

    #[test]
    fn test_complete_sort() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let ids = [fixture.sprite_at(0, 0, 1), fixture.sprite_at(0, 0, 2), fixture.sprite_at(0, 0, 3)];

        for (id, z) in ids.iter().zip([9, 8, 7]) {
            fixture.sprites.sprite_mut(*id).unwrap().set_position(PixelVector::new(0, 0, z, 0));
        }

        fixture.sprites.sort_sprites();

        assert_eq!(fixture.depths(), vec![7, 8, 9]);
    }

    #[test]
    fn test_layers_are_assigned_from_the_deepest_sprite() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let near = fixture.sprite_at(100, 100, 10);
        let far = fixture.sprite_at(100, 100, 30);
        let middle = fixture.sprite_at(100, 100, 20);

        let stats = fixture.render().unwrap();

        assert_eq!(stats.rendered_sprites, 3);
        assert_eq!(fixture.sprites.sprite(far).unwrap().index(), 31);
        assert_eq!(fixture.sprites.sprite(middle).unwrap().index(), 30);
        assert_eq!(fixture.sprites.sprite(near).unwrap().index(), 29);
        assert_eq!(stats.free_layer, 28);
        assert_eq!(fixture.sprites.world_attributes(28), Some(&WorldAttributes::END));
    }

    #[test]
    fn test_layer_ceiling_is_reported() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new().with_total_layers(4));

        for z in 0..5 {
            fixture.sprite_at(100, 100, z);
        }

        let result = fixture.render();

        assert!(matches!(
            result,
            Err(EngineError::Resource(ResourceExhausted::OutOfRenderLayers { requested: 5, available: 3 }))
        ));
        assert_eq!(fixture.sprites.free_layer(), 0);
        assert_eq!(fixture.sprites.world_attributes(0), Some(&WorldAttributes::END));
    }

    #[test]
    fn test_culled_and_hidden_sprites_take_no_layer() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new().with_total_layers(2));
        let visible = fixture.sprite_at(100, 100, 0);
        let outside = fixture.sprite_at(1000, 100, 1);
        let hidden = fixture.sprite_at(100, 100, 2);
        fixture.sprites.sprite_mut(hidden).unwrap().hide();

        let stats = fixture.render().unwrap();

        assert_eq!(stats.rendered_sprites, 1);
        assert_eq!(fixture.sprites.sprite(visible).unwrap().index(), 1);
        assert_eq!(fixture.sprites.sprite(outside).unwrap().index(), NO_RENDER_INDEX);
        assert_eq!(fixture.sprites.sprite(hidden).unwrap().index(), NO_RENDER_INDEX);
    }

    #[test]
    fn test_transparency_alternates_frames() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let id = fixture.sprite_at(100, 100, 0);
        fixture.sprites.sprite_mut(id).unwrap().set_transparency(Transparency::Odd);

        let drawn: Vec<bool> = (0..4)
            .map(|_| {
                fixture.render().unwrap();
                NO_RENDER_INDEX != fixture.sprites.sprite(id).unwrap().index()
            })
            .collect();

        assert_eq!(drawn, vec![false, true, false, true]);
    }

    #[test]
    fn test_write_dram_requires_render() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let mut device = MemoryDevice::new();
        fixture.sprite_at(100, 100, 0);

        fixture.sprites.write_dram(&mut device, &mut fixture.textures);
        assert!(device.writes().is_empty());

        fixture.render().unwrap();
        fixture.sprites.write_dram(&mut device, &mut fixture.textures);

        let layers: Vec<usize> = device
            .writes()
            .iter()
            .filter_map(|write| match write {
                DeviceWrite::World { layer } => Some(*layer),
                _ => None,
            })
            .collect();
        assert_eq!(layers, vec![30, 31]);
        assert_eq!(device.world(30), Some(&WorldAttributes::END));
        assert_eq!(device.world(31).map(|world| world.gx), Some(92));

        device.clear_writes();
        fixture.sprites.write_dram(&mut device, &mut fixture.textures);
        assert!(device.writes().is_empty());
    }

    #[test]
    fn test_object_sprites_fill_slots_from_the_top() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new().with_object_containers(vec![0]));
        let mut device = MemoryDevice::new();
        let spec = SpriteSpec::object(Arc::new(TextureSpec::new(2, 1).with_map(vec![5, 6])));
        let id = fixture.sprites.create_sprite(&spec, None, &mut fixture.textures).unwrap();
        fixture.sprites.set_sprite_position(id, PixelVector::new(100, 100, 0, 0)).unwrap();

        let stats = fixture.render().unwrap();

        assert_eq!(stats.used_objects, 2);
        assert_eq!(fixture.sprites.sprite(id).unwrap().index(), 1022);
        assert_eq!(fixture.sprites.object_attributes(1022).map(|object| object.tile), Some(5));
        assert_eq!(fixture.sprites.object_attributes(1023).map(|object| object.tile), Some(6));
        // The container took the top layer in OBJECT mode
        assert_eq!(fixture.sprites.world_attributes(31).map(|world| world.head), Some(WorldHead::ON | WorldHead::OBJECT | WorldHead::OVR));

        fixture.sprites.write_dram(&mut device, &mut fixture.textures);

        assert_eq!(device.read_register(Register::Spt3), 2);
        assert_eq!(device.read_register(Register::Spt2), 0);
        assert_eq!(device.object(1).map(|object| object.tile), Some(5));
        assert_eq!(device.object(2).map(|object| object.tile), Some(6));
        assert!(!device.object(0).unwrap().is_visible());
    }

    #[test]
    fn test_empty_container_is_switched_off() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new().with_object_containers(vec![0]));

        fixture.render().unwrap();

        assert_eq!(fixture.sprites.world_attributes(31).map(|world| world.head), Some(WorldHead::OFF));
    }

    #[test]
    fn test_object_slot_shortage_is_reported() {
        let mut config = SpriteManagerConfig::new().with_object_containers(vec![0]);
        config.total_objects = 4;
        let mut fixture = Fixture::new(config);
        let spec = SpriteSpec::object(Arc::new(TextureSpec::new(3, 2)));
        let id = fixture.sprites.create_sprite(&spec, None, &mut fixture.textures).unwrap();
        fixture.sprites.set_sprite_position(id, PixelVector::new(100, 100, 0, 0)).unwrap();

        let result = fixture.render();

        assert!(matches!(
            result,
            Err(EngineError::Resource(ResourceExhausted::OutOfObjectSlots { requested: 6, available: 4 }))
        ));
        assert_eq!(fixture.sprites.sprite(id).unwrap().index(), NO_RENDER_INDEX);
    }

    #[test]
    fn test_closest_object_container() {
        let fixture = Fixture::new(SpriteManagerConfig::new().with_object_containers(vec![-10, 0, 50]));

        assert_eq!(fixture.sprites.object_container_for(-20), Some(0));
        assert_eq!(fixture.sprites.object_container_for(20), Some(1));
        assert_eq!(fixture.sprites.object_container_for(40), Some(2));
        assert_eq!(fixture.sprites.number_of_sprites(), 3);
    }

    #[test]
    fn test_destroy_releases_texture_and_layer() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let far = fixture.sprite_at(100, 100, 20);
        let near = fixture.sprite_at(100, 100, 10);
        fixture.render().unwrap();
        let texture = fixture.sprites.sprite(near).unwrap().texture().unwrap();

        fixture.sprites.destroy_sprite(near, &mut fixture.textures).unwrap();

        assert_eq!(fixture.textures.usage_count(texture), Some(0));
        assert_eq!(fixture.sprites.free_layer(), 30);
        assert_eq!(fixture.sprites.world_attributes(30), Some(&WorldAttributes::END));
        assert!(fixture.sprites.sprite(near).is_none());
        assert!(matches!(fixture.sprites.destroy_sprite(near, &mut fixture.textures), Err(EngineError::StaleReference(_))));

        fixture.sprites.destroy_sprite(far, &mut fixture.textures).unwrap();
        assert_eq!(fixture.sprites.world_attributes(31), Some(&WorldAttributes::END));
    }

    #[test]
    fn test_affine_effects_are_paced() {
        let mut config = SpriteManagerConfig::new();
        config.defer_param_table_effects = true;
        config.param_table_rows_per_call = 10;
        let mut fixture = Fixture::new(config);
        let mut device = MemoryDevice::new();
        let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(2, 2))).with_mode(WorldHead::AFFINE);
        let id = fixture.sprites.create_sprite(&spec, None, &mut fixture.textures).unwrap();
        fixture.sprites.set_sprite_position(id, PixelVector::new(100, 100, 0, 0)).unwrap();

        let params = |device: &MemoryDevice| {
            device.writes().iter().filter(|write| matches!(write, DeviceWrite::Param { .. })).count()
        };

        for _ in 0..2 {
            fixture.render().unwrap();
            fixture.sprites.write_dram(&mut device, &mut fixture.textures);
        }

        assert_eq!(params(&device), 2);
        assert_eq!(fixture.sprites.sprite(id).unwrap().param_table().unwrap().next_row, 16);
    }

    #[test]
    fn test_show_and_hide_all() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());
        let spare = fixture.sprite_at(100, 100, 0);
        let other = fixture.sprite_at(100, 100, 1);

        fixture.sprites.hide_all(Some(spare));
        assert!(fixture.sprites.sprite(spare).unwrap().is_visible());
        assert!(!fixture.sprites.sprite(other).unwrap().is_visible());

        fixture.sprites.show_all(Some(spare));
        assert!(!fixture.sprites.sprite(spare).unwrap().is_visible());
        assert!(fixture.sprites.sprite(other).unwrap().is_visible());
    }

    #[test]
    fn test_texture_row_budget_has_a_floor() {
        let mut fixture = Fixture::new(SpriteManagerConfig::new());

        fixture.sprites.set_textures_maximum_rows_to_write(0);

        assert_eq!(fixture.sprites.textures_maximum_rows_to_write(), 2);
    }
}
