//! Sprites
//!
//! A sprite is what takes a WORLD layer for one frame. BGMAP sprites show a
//! window of a resident texture, OBJECT sprites expand into 8x8 OBJECT
//! characters drawn by an object container, and containers are the layers
//! those characters live in.

use super::bgmap_texture_manager::BgmapTextureManager;
use super::texture::{TextureSpec, TextureStatus};
use crate::core::config::CameraFrustum;
use crate::foundation::collections::{OwnerId, TextureId};
use crate::foundation::fixed::{pixels_to_meters, Fix7_9};
use crate::foundation::math::{PixelVector, RightBox, Rotation, Scale};
use crate::hardware::attributes::WORLD_SIZE_DISPLACEMENT;
use crate::hardware::{ObjectAttributes, ScreenCount, WorldAttributes, WorldHead};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Layer index of a sprite that is not drawn this frame
pub const NO_RENDER_INDEX: i16 = -1;

/// A quarter turn in rotation units
const QUARTER_TURN: u16 = 128;

/// Words per AFFINE param table row
pub const AFFINE_ROW_WORDS: usize = 8;

/// Words per HBIAS param table row
pub const HBIAS_ROW_WORDS: usize = 2;

/// Flicker-based transparency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transparency {
    /// Drawn every frame
    #[default]
    None,
    /// Skipped on odd frames
    Odd,
    /// Skipped on even frames
    Even,
}

impl Transparency {
    /// Bit tested against the frame parity
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Odd => 1,
            Self::Even => 2,
        }
    }
}

/// What a sprite draws
#[derive(Debug, Clone)]
pub enum SpriteKind {
    /// A window of a BGMAP texture
    Bgmap {
        /// Texture shown; `None` once released
        texture: Option<TextureId>,
    },
    /// OBJECT characters drawn by a container
    Object {
        /// Characters to draw
        spec: Arc<TextureSpec>,
        /// Container the sprite is listed in
        container: usize,
    },
    /// A WORLD layer in OBJECT mode
    ObjectContainer {
        /// OBJECT segment drawn by the layer
        segment: usize,
    },
}

/// How to build a sprite
#[derive(Debug, Clone)]
pub struct SpriteSpec {
    /// Texture or characters to show
    pub texture: Arc<TextureSpec>,
    /// Offset from the owner's position
    pub displacement: PixelVector,
    /// Flicker-based transparency
    pub transparency: Transparency,
    /// `BGMAP`, `AFFINE`, `HBIAS` or `OBJECT`
    pub mode: WorldHead,
    /// Screen count of multi-segment worlds
    pub screen_count: ScreenCount,
}

impl SpriteSpec {
    /// A plain BGMAP sprite showing `texture`
    #[must_use]
    pub fn bgmap(texture: Arc<TextureSpec>) -> Self {
        Self {
            texture,
            displacement: PixelVector::default(),
            transparency: Transparency::None,
            mode: WorldHead::BGMAP,
            screen_count: ScreenCount::Sc1x1,
        }
    }

    /// An OBJECT sprite made of `texture`'s characters
    #[must_use]
    pub fn object(texture: Arc<TextureSpec>) -> Self {
        Self { mode: WorldHead::OBJECT, ..Self::bgmap(texture) }
    }

    /// Use another mode
    #[must_use]
    pub const fn with_mode(mut self, mode: WorldHead) -> Self {
        self.mode = mode;
        self
    }

    /// Use flicker-based transparency
    #[must_use]
    pub const fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Offset the sprite from its owner
    #[must_use]
    pub const fn with_displacement(mut self, displacement: PixelVector) -> Self {
        self.displacement = displacement;
        self
    }

    /// Whether this describes an OBJECT sprite
    #[must_use]
    pub fn is_object(&self) -> bool {
        WorldHead::OBJECT == self.mode.mode()
    }
}

/// Param table rows owned by an AFFINE or HBIAS sprite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTable {
    /// First word in param table memory, 16-word aligned
    pub offset: usize,
    /// Words per row
    pub row_words: usize,
    /// Row contents
    pub rows: Vec<u16>,
    /// Next row to write
    pub next_row: usize,
}

impl ParamTable {
    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len() / self.row_words.max(1)
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every row has been written
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.next_row >= self.len()
    }
}

/// # Sprite
#[derive(Debug, Clone)]
pub struct Sprite {
    kind: SpriteKind,
    owner: Option<OwnerId>,
    position: PixelVector,
    displacement: PixelVector,
    rotation: Rotation,
    scale: Scale,
    head: WorldHead,
    index: i16,
    show: bool,
    positioned: bool,
    registered: bool,
    transparency: Transparency,
    cols: u8,
    rows: u8,
    half_width: i16,
    half_height: i16,
    horizontal_flip: bool,
    vertical_flip: bool,
    check_if_within_screen_space: bool,
    param_table: Option<ParamTable>,
}

impl Sprite {
    /// A BGMAP sprite showing `texture`
    #[must_use]
    pub fn bgmap(spec: &SpriteSpec, texture: TextureId, owner: Option<OwnerId>) -> Self {
        let mut sprite = Self::with_kind(SpriteKind::Bgmap { texture: Some(texture) }, spec, owner);
        sprite.head = WorldHead::ON | spec.mode.mode() | WorldHead::from_bits_retain(spec.screen_count.head_bits());
        sprite
    }

    /// An OBJECT sprite listed in `container`
    #[must_use]
    pub fn object(spec: &SpriteSpec, container: usize, owner: Option<OwnerId>) -> Self {
        let kind = SpriteKind::Object { spec: Arc::clone(&spec.texture), container };
        let mut sprite = Self::with_kind(kind, spec, owner);
        sprite.head = WorldHead::ON;
        sprite
    }

    /// A container for OBJECT segment `segment` at depth `z`
    #[must_use]
    pub fn object_container(segment: usize, z: i16) -> Self {
        Self {
            kind: SpriteKind::ObjectContainer { segment },
            owner: None,
            position: PixelVector::new(0, 0, z, 0),
            displacement: PixelVector::default(),
            rotation: Rotation::zero(),
            scale: Scale::unit(),
            head: WorldHead::ON | WorldHead::OBJECT | WorldHead::OVR,
            index: NO_RENDER_INDEX,
            show: true,
            positioned: true,
            registered: false,
            transparency: Transparency::None,
            cols: 0,
            rows: 0,
            half_width: 0,
            half_height: 0,
            horizontal_flip: false,
            vertical_flip: false,
            check_if_within_screen_space: false,
            param_table: None,
        }
    }

    fn with_kind(kind: SpriteKind, spec: &SpriteSpec, owner: Option<OwnerId>) -> Self {
        Self {
            kind,
            owner,
            position: PixelVector::default(),
            displacement: spec.displacement,
            rotation: Rotation::zero(),
            scale: Scale::unit(),
            head: WorldHead::ON,
            index: NO_RENDER_INDEX,
            show: true,
            positioned: false,
            registered: false,
            transparency: spec.transparency,
            cols: spec.texture.cols,
            rows: spec.texture.rows,
            half_width: i16::from(spec.texture.cols) << 2,
            half_height: i16::from(spec.texture.rows) << 2,
            horizontal_flip: false,
            vertical_flip: false,
            check_if_within_screen_space: true,
            param_table: None,
        }
    }

    /// What the sprite draws
    #[must_use]
    pub const fn kind(&self) -> &SpriteKind {
        &self.kind
    }

    /// Owner of the sprite
    #[must_use]
    pub const fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// Texture shown by a BGMAP sprite
    #[must_use]
    pub const fn texture(&self) -> Option<TextureId> {
        match self.kind {
            SpriteKind::Bgmap { texture } => texture,
            _ => None,
        }
    }

    pub(crate) fn take_texture(&mut self) -> Option<TextureId> {
        match &mut self.kind {
            SpriteKind::Bgmap { texture } => texture.take(),
            _ => None,
        }
    }

    /// Screen position
    #[must_use]
    pub const fn position(&self) -> PixelVector {
        self.position
    }

    /// Move the sprite
    pub fn set_position(&mut self, position: PixelVector) {
        self.position = position;
        self.positioned = true;
    }

    /// Offset from the position
    #[must_use]
    pub const fn displacement(&self) -> PixelVector {
        self.displacement
    }

    /// Whether the sprite has been positioned at least once
    #[must_use]
    pub const fn is_positioned(&self) -> bool {
        self.positioned
    }

    /// Depth used for sorting
    #[must_use]
    pub fn depth(&self) -> i32 {
        i32::from(self.position.z) + i32::from(self.displacement.z)
    }

    /// Rotation
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Rotate the sprite
    ///
    /// BGMAP and OBJECT hardware cannot rotate, so past a quarter turn the
    /// texture is mirrored instead. Returns the horizontal and vertical
    /// flips the texture should now have.
    pub fn set_rotation(&mut self, rotation: Rotation) -> (bool, bool) {
        self.rotation = rotation;

        let beyond = |angle: i16| QUARTER_TURN < angle.unsigned_abs();

        self.horizontal_flip = beyond(rotation.y) || beyond(rotation.z);
        self.vertical_flip = beyond(rotation.x) || beyond(rotation.z);

        (self.horizontal_flip, self.vertical_flip)
    }

    /// Scale
    #[must_use]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Scale the sprite
    ///
    /// Only AFFINE sprites can be drawn scaled; their size and param table
    /// follow the new factors.
    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;

        if WorldHead::AFFINE == self.head.mode() {
            let scaled = |tiles: u8, factor: Fix7_9| {
                let half = Fix7_9::from_int(i32::from(tiles) << 2).multiply(factor.abs());
                i16::try_from(half.to_int()).unwrap_or(i16::MAX).max(1)
            };

            self.half_width = scaled(self.cols, scale.x);
            self.half_height = scaled(self.rows, scale.y);
            self.compute_affine_rows();
        }
    }

    /// Head word, segment bits excluded
    #[must_use]
    pub const fn head(&self) -> WorldHead {
        self.head
    }

    /// WORLD layer taken this frame or [`NO_RENDER_INDEX`]
    #[must_use]
    pub const fn index(&self) -> i16 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: i16) {
        self.index = index;
    }

    /// Whether the sprite wants to be drawn
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.show
    }

    /// Draw the sprite again
    pub fn show(&mut self) {
        self.show = true;
    }

    /// Stop drawing the sprite
    pub fn hide(&mut self) {
        self.show = false;
        self.index = NO_RENDER_INDEX;
    }

    /// Flicker-based transparency
    #[must_use]
    pub const fn transparency(&self) -> Transparency {
        self.transparency
    }

    /// Change the transparency
    pub fn set_transparency(&mut self, transparency: Transparency) {
        self.transparency = transparency;
    }

    /// Half of the drawn width in pixels
    #[must_use]
    pub const fn half_width(&self) -> i16 {
        self.half_width
    }

    /// Half of the drawn height in pixels
    #[must_use]
    pub const fn half_height(&self) -> i16 {
        self.half_height
    }

    /// Mirroring requested by the last rotation
    #[must_use]
    pub const fn flips(&self) -> (bool, bool) {
        (self.horizontal_flip, self.vertical_flip)
    }

    /// Whether the sprite is in the depth-sorted list
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.registered
    }

    pub(crate) fn set_registered(&mut self, registered: bool) {
        self.registered = registered;
    }

    /// Skip or perform the screen space check before drawing
    pub fn set_check_if_within_screen_space(&mut self, check: bool) {
        self.check_if_within_screen_space = check;
    }

    /// Param table of AFFINE and HBIAS sprites
    #[must_use]
    pub const fn param_table(&self) -> Option<&ParamTable> {
        self.param_table.as_ref()
    }

    pub(crate) fn param_table_mut(&mut self) -> Option<&mut ParamTable> {
        self.param_table.as_mut()
    }

    /// Give the sprite `rows` param table rows starting at `offset` words
    pub(crate) fn attach_param_table(&mut self, offset: usize, rows: usize) {
        let row_words = if WorldHead::HBIAS == self.head.mode() { HBIAS_ROW_WORDS } else { AFFINE_ROW_WORDS };

        self.param_table = Some(ParamTable { offset, row_words, rows: vec![0; rows * row_words], next_row: 0 });

        if WorldHead::AFFINE == self.head.mode() {
            self.compute_affine_rows();
        }
    }

    /// Replace the contents of the param table; rows are written again
    ///
    /// Returns `false` when the sprite has no table or `rows` does not fit.
    pub fn set_param_rows(&mut self, rows: &[u16]) -> bool {
        match &mut self.param_table {
            Some(table) if rows.len() <= table.rows.len() => {
                table.rows[..rows.len()].copy_from_slice(rows);
                table.next_row = 0;
                true
            }
            _ => false,
        }
    }

    /// Fill the AFFINE table with the rows that draw the texture scaled
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn compute_affine_rows(&mut self) {
        let Some(table) = self.param_table.as_mut() else {
            return;
        };

        // 7.9 step per screen pixel, the inverse of the scale factor
        let step = |factor: Fix7_9| -> i32 {
            let raw = i32::from(factor.abs().raw()).max(1);
            (1 << (2 * Fix7_9::FRACTION_BITS)) / raw
        };

        let dx = step(self.scale.x);
        let dy = step(self.scale.y);

        for (row, words) in table.rows.chunks_mut(table.row_words).enumerate() {
            let row = i32::try_from(row).unwrap_or(i32::MAX);
            // 13.3 source y of this screen row
            let my = (row.saturating_mul(dy) >> (Fix7_9::FRACTION_BITS - 3)) as u16;

            words.fill(0);
            words[2] = my;
            words[3] = dx as u16;
        }

        table.next_row = 0;
    }

    /// Whether the sprite's box reaches into the frustum
    ///
    /// One unsigned comparison per axis: coordinates left of the lower
    /// bound wrap around to huge values.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn is_within_screen_space(&self, frustum: &CameraFrustum) -> bool {
        let half_width = i32::from(self.half_width);
        let half_height = i32::from(self.half_height);

        let x = i32::from(self.position.x) + i32::from(self.displacement.x);
        let left = i32::from(frustum.x0) - half_width;
        let right = i32::from(frustum.x1) + half_width;

        if (x - left) as u32 >= (right - left) as u32 {
            return false;
        }

        let y = i32::from(self.position.y) + i32::from(self.displacement.y);
        let top = i32::from(frustum.y0) - half_height;
        let bottom = i32::from(frustum.y1) + half_height;

        ((y - top) as u32) < ((bottom - top) as u32)
    }

    /// Box covered by the sprite in world units
    #[must_use]
    pub fn right_box(&self) -> RightBox {
        let x = i32::from(self.position.x) + i32::from(self.displacement.x);
        let y = i32::from(self.position.y) + i32::from(self.displacement.y);
        let z = self.depth();
        let half_width = i32::from(self.half_width);
        let half_height = i32::from(self.half_height);

        RightBox::new(
            pixels_to_meters(x - half_width),
            pixels_to_meters(y - half_height),
            pixels_to_meters(z),
            pixels_to_meters(x + half_width),
            pixels_to_meters(y + half_height),
            pixels_to_meters(z),
        )
    }

    /// Whether the sprite can take a layer this frame
    pub(crate) fn prepare_to_render(&self, frustum: &CameraFrustum, textures: &BgmapTextureManager) -> bool {
        if let SpriteKind::Bgmap { texture } = &self.kind {
            let ready = (*texture)
                .and_then(|id| textures.texture(id))
                .is_some_and(|texture| TextureStatus::PendingWriting < texture.status());

            if !ready {
                return false;
            }
        }

        if !self.positioned {
            return false;
        }

        !self.check_if_within_screen_space || self.is_within_screen_space(frustum)
    }

    /// Fill `world` for layer `index`; returns the layer taken or
    /// [`NO_RENDER_INDEX`]
    pub(crate) fn render(
        &mut self,
        index: i16,
        world: &mut WorldAttributes,
        frustum: &CameraFrustum,
        textures: &BgmapTextureManager,
    ) -> i16 {
        self.index = if self.prepare_to_render(frustum, textures) {
            match &self.kind {
                SpriteKind::Bgmap { .. } => self.render_bgmap(index, world, frustum, textures),
                SpriteKind::ObjectContainer { .. } => index,
                SpriteKind::Object { .. } => NO_RENDER_INDEX,
            }
        } else {
            NO_RENDER_INDEX
        };

        self.index
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn render_bgmap(
        &self,
        index: i16,
        world: &mut WorldAttributes,
        frustum: &CameraFrustum,
        textures: &BgmapTextureManager,
    ) -> i16 {
        let Some(texture) = self.texture().and_then(|id| textures.texture(id)) else {
            return NO_RENDER_INDEX;
        };

        let x0 = i32::from(frustum.x0);
        let y0 = i32::from(frustum.y0);
        let x1 = i32::from(frustum.x1);
        let y1 = i32::from(frustum.y1);

        let mut gx = i32::from(self.position.x) + i32::from(self.displacement.x) - i32::from(self.half_width);
        let mut gy = i32::from(self.position.y) + i32::from(self.displacement.y) - i32::from(self.half_height);
        let gp = i32::from(self.position.parallax) + i32::from(self.displacement.parallax);
        let parallax = gp.abs();

        let mut w = i32::from(self.half_width) << 1;
        let mut h = i32::from(self.half_height) << 1;

        let mut mx = i32::from(texture.x_offset()) << 3;
        let mut my = i32::from(texture.y_offset()) << 3;

        // Affine layers read the texture through the param table
        if x0 - parallax > gx && self.param_table.is_none() {
            mx += x0 - parallax - gx;
            w -= x0 - parallax - gx;
            gx = x0 - parallax;
        }

        let mut my_displacement = 0;

        if y0 > gy {
            my_displacement = y0 - gy;
            my += my_displacement;
            h -= my_displacement;
            gy = y0;
        }

        if w + gx >= x1 + parallax {
            w = x1 - gx + parallax;
        }

        let minimum = i32::from(WORLD_SIZE_DISPLACEMENT);

        if minimum >= w {
            return NO_RENDER_INDEX;
        }

        if h + gy >= y1 {
            h = y1 - gy;
        }

        if minimum >= h {
            return NO_RENDER_INDEX;
        }

        world.head = self.head | WorldHead::from_bits_retain(u16::from(texture.segment()) & WorldHead::SEGMENT.bits());
        world.gx = gx as i16;
        world.gy = gy as i16;
        world.gp = gp as i16;
        world.mx = mx as u16;
        world.my = my as u16;
        world.mp = 0;
        world.w = (w - minimum) as u16;
        world.h = (h - minimum) as u16;

        if let Some(table) = &self.param_table {
            let row_bytes = table.row_words * 2;
            let address = table.offset * 2 + my_displacement as usize * row_bytes;
            world.param = ((address >> 1) & 0xFFF0) as u16;
        }

        index
    }

    /// Write the sprite's characters into `objects` starting at `first`
    ///
    /// Characters that fall outside the frustum are hidden.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub(crate) fn render_objects(&mut self, first: usize, objects: &mut [ObjectAttributes], frustum: &CameraFrustum) -> usize {
        let SpriteKind::Object { spec, .. } = &self.kind else {
            return 0;
        };

        let cols = usize::from(spec.cols);
        let rows = usize::from(spec.rows);

        let x = i32::from(self.position.x) + i32::from(self.displacement.x) - i32::from(self.half_width);
        let y = i32::from(self.position.y) + i32::from(self.displacement.y) - i32::from(self.half_height);
        let parallax = i32::from(self.position.parallax) + i32::from(self.displacement.parallax);

        let head = ObjectAttributes::SHOW_MASK | (parallax as u16 & 0x03FF);
        let flips = (u16::from(self.horizontal_flip) << 13) | (u16::from(self.vertical_flip) << 12);
        let tile_base = (u16::from(spec.palette) << 14) | flips;

        let x0 = i32::from(frustum.x0);
        let y0 = i32::from(frustum.y0);
        let x1 = i32::from(frustum.x1);
        let y1 = i32::from(frustum.y1);

        for row in 0..rows {
            let source_row = if self.vertical_flip { rows - row - 1 } else { row };
            let output_y = y + (row as i32) * 8;
            let row_visible = ((output_y - y0 + 8) as u32) <= ((y1 - y0 + 8) as u32);

            for col in 0..cols {
                let Some(object) = objects.get_mut(first + row * cols + col) else {
                    continue;
                };

                let output_x = x + (col as i32) * 8;

                if !row_visible || ((output_x - x0 + 4) as u32) > ((x1 - x0 + 4) as u32) {
                    object.head = ObjectAttributes::HIDE_MASK;
                    continue;
                }

                let source_col = if self.horizontal_flip { cols - col - 1 } else { col };
                let entry = spec.map.get(source_row * cols + source_col).copied().unwrap_or(0);

                *object = ObjectAttributes {
                    jx: output_x as i16,
                    head,
                    jy: output_y as i16,
                    tile: tile_base | spec.char_offset.wrapping_add(entry & 0x07FF),
                };
            }
        }

        self.index = i16::try_from(first).unwrap_or(NO_RENDER_INDEX);

        cols * rows
    }

    /// Characters an OBJECT sprite needs
    #[must_use]
    pub fn total_objects(&self) -> usize {
        match &self.kind {
            SpriteKind::Object { spec, .. } => usize::from(spec.cols) * usize::from(spec.rows),
            _ => 0,
        }
    }

    /// Pixels the sprite covers when drawn
    #[must_use]
    pub fn total_pixels(&self) -> usize {
        if NO_RENDER_INDEX == self.index {
            return 0;
        }

        match &self.kind {
            SpriteKind::Object { .. } => self.total_objects() * 64,
            SpriteKind::ObjectContainer { .. } => 0,
            SpriteKind::Bgmap { .. } => {
                usize::from(self.half_width.unsigned_abs()) * usize::from(self.half_height.unsigned_abs()) * 4
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TextureConfig;
    use crate::hardware::MemoryDevice;

    fn resident(cols: u8, rows: u8) -> (BgmapTextureManager, TextureId) {
        let mut textures = BgmapTextureManager::new(&TextureConfig::new().with_available_segments(4));
        let id = textures.get_texture(&Arc::new(TextureSpec::new(cols, rows)), 0, false, ScreenCount::Sc1x1).unwrap();
        textures.update_textures(&mut MemoryDevice::new(), None, false);
        (textures, id)
    }

    fn bgmap_sprite(textures: &BgmapTextureManager, id: TextureId) -> Sprite {
        let spec = textures.texture(id).unwrap().spec();
        Sprite::bgmap(&SpriteSpec::bgmap(Arc::clone(spec)), id, None)
    }

    #[test]
    fn test_half_size_from_texture() {
        let (textures, id) = resident(4, 2);
        let sprite = bgmap_sprite(&textures, id);

        assert_eq!(sprite.half_width(), 16);
        assert_eq!(sprite.half_height(), 8);
        assert_eq!(sprite.index(), NO_RENDER_INDEX);
        assert!(!sprite.is_positioned());
    }

    #[test]
    fn test_screen_space_check_wraps() {
        let (textures, id) = resident(4, 4);
        let mut sprite = bgmap_sprite(&textures, id);
        let frustum = CameraFrustum::full_screen();

        sprite.set_position(PixelVector::new(-16, 100, 0, 0));
        assert!(sprite.is_within_screen_space(&frustum));

        sprite.set_position(PixelVector::new(-17, 100, 0, 0));
        assert!(!sprite.is_within_screen_space(&frustum));

        sprite.set_position(PixelVector::new(399, 100, 0, 0));
        assert!(sprite.is_within_screen_space(&frustum));

        sprite.set_position(PixelVector::new(100, 240, 0, 0));
        assert!(!sprite.is_within_screen_space(&frustum));
    }

    #[test]
    fn test_render_fills_world_record() {
        let (textures, id) = resident(4, 2);
        let mut sprite = bgmap_sprite(&textures, id);
        let mut world = WorldAttributes::default();
        sprite.set_position(PixelVector::new(100, 50, 0, 2));

        let index = sprite.render(31, &mut world, &CameraFrustum::full_screen(), &textures);

        assert_eq!(index, 31);
        assert_eq!((world.gx, world.gy, world.gp), (84, 42, 2));
        assert_eq!((world.w, world.h), (31, 15));
        assert_eq!((world.mx, world.my), (0, 0));
        assert_eq!(world.head, WorldHead::ON);
    }

    #[test]
    fn test_render_clips_to_frustum() {
        let (textures, id) = resident(4, 2);
        let mut sprite = bgmap_sprite(&textures, id);
        let mut world = WorldAttributes::default();
        sprite.set_position(PixelVector::new(10, 4, 0, 0));

        sprite.render(5, &mut world, &CameraFrustum::full_screen(), &textures);

        assert_eq!((world.gx, world.gy), (0, 0));
        assert_eq!((world.mx, world.my), (6, 4));
        assert_eq!((world.w, world.h), (25, 11));
    }

    #[test]
    fn test_unwritten_texture_is_not_rendered() {
        let mut textures = BgmapTextureManager::new(&TextureConfig::new());
        let id = textures.get_texture(&Arc::new(TextureSpec::new(2, 2)), 0, false, ScreenCount::Sc1x1).unwrap();
        let mut sprite = bgmap_sprite(&textures, id);
        sprite.set_position(PixelVector::new(100, 100, 0, 0));

        let index = sprite.render(31, &mut WorldAttributes::default(), &CameraFrustum::full_screen(), &textures);

        assert_eq!(index, NO_RENDER_INDEX);
    }

    #[test]
    fn test_rotation_past_quarter_turn_flips() {
        let (textures, id) = resident(1, 1);
        let mut sprite = bgmap_sprite(&textures, id);

        assert_eq!(sprite.set_rotation(Rotation::new(0, 128, 0)), (false, false));
        assert_eq!(sprite.set_rotation(Rotation::new(0, -129, 0)), (true, false));
        assert_eq!(sprite.set_rotation(Rotation::new(200, 0, 0)), (false, true));
        assert_eq!(sprite.set_rotation(Rotation::new(0, 0, 256)), (true, true));
    }

    #[test]
    fn test_object_sprite_characters() {
        let spec = Arc::new(TextureSpec::new(2, 1).with_map(vec![3, 4]));
        let mut sprite = Sprite::object(&SpriteSpec::object(spec), 0, None);
        let mut objects = vec![ObjectAttributes::HIDDEN; 4];
        sprite.set_position(PixelVector::new(100, 60, 0, 1));

        assert_eq!(sprite.render_objects(1, &mut objects, &CameraFrustum::full_screen()), 2);

        assert_eq!(objects[1], ObjectAttributes { jx: 92, head: 0xC001, jy: 56, tile: 3 });
        assert_eq!(objects[2], ObjectAttributes { jx: 100, head: 0xC001, jy: 56, tile: 4 });
        assert!(!objects[0].is_visible());
        assert_eq!(sprite.index(), 1);
    }

    #[test]
    fn test_affine_scale_resizes_and_fills_rows() {
        let (textures, id) = resident(4, 4);
        let spec = SpriteSpec::bgmap(Arc::clone(textures.texture(id).unwrap().spec())).with_mode(WorldHead::AFFINE);
        let mut sprite = Sprite::bgmap(&spec, id, None);
        sprite.attach_param_table(0, 32);

        sprite.set_scale(Scale { x: Fix7_9::from_int(2), y: Fix7_9::from_int(2), z: Fix7_9::ONE });

        assert_eq!((sprite.half_width(), sprite.half_height()), (32, 32));
        let table = sprite.param_table().unwrap();
        assert_eq!(table.len(), 32);
        // Half a texel per pixel, 4 screen rows advance 2 texels (16 in 13.3)
        assert_eq!(table.rows[3], 0x100);
        assert_eq!(table.rows[4 * AFFINE_ROW_WORDS + 2], 16);
    }

    #[test]
    fn test_right_box_spans_sprite() {
        let (textures, id) = resident(2, 2);
        let mut sprite = bgmap_sprite(&textures, id);
        sprite.set_position(PixelVector::new(16, 16, 4, 0));

        let right_box = sprite.right_box();

        assert_eq!(right_box.x0, pixels_to_meters(8));
        assert_eq!(right_box.x1, pixels_to_meters(24));
        assert_eq!(right_box.z0, pixels_to_meters(4));
    }
}
