//! BGMAP texture allocator
//!
//! Packs textures into the 64x64 tile BGMAP segments. Each segment is split
//! into up to sixteen horizontal bands; a band grows to the right until it
//! is full and the next band starts below the tallest texture placed in it.
//! The last available segment gives its bottom rows to printing.
//!
//! Textures are never moved once placed. Space is only given back by
//! [`BgmapTextureManager::reset`]; released textures keep their slot so that
//! the same spec, or a recyclable spec of similar size, can take it again.

use super::texture::{BgmapTexture, TextureSpec, TextureStatus, SEGMENT_COLS, SEGMENT_ROWS};
use crate::core::config::{TextureConfig, MAX_SEGMENTS};
use crate::core::error::{EngineError, EngineResult, ResourceExhausted};
use crate::foundation::collections::TextureId;
use crate::foundation::logging::{debug, trace, warn};
use crate::hardware::{Device, ScreenCount};
use std::collections::VecDeque;
use std::sync::Arc;

/// Bands per segment
const SEGMENT_BANDS: usize = 16;

/// Tiles per segment
const SEGMENT_TILES: u16 = SEGMENT_COLS * SEGMENT_ROWS;

/// Where a texture was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextureSlot {
    x_offset: u16,
    y_offset: u16,
    cols: u16,
    rows: u16,
}

/// # BGMAP Texture Manager
///
/// Owns every resident texture and the bookkeeping of free BGMAP space.
#[derive(Debug)]
pub struct BgmapTextureManager {
    textures: Vec<BgmapTexture>,
    slots: Vec<TextureSlot>,
    x_offsets: Vec<[u16; SEGMENT_BANDS]>,
    y_offsets: Vec<[u16; SEGMENT_BANDS]>,
    used_tiles: Vec<u16>,
    available_segments: u8,
    printing_rows: u8,
    pending: VecDeque<TextureId>,
}

impl BgmapTextureManager {
    /// Create an empty manager
    #[must_use]
    pub fn new(config: &TextureConfig) -> Self {
        let segments = usize::from(config.max_segments.min(MAX_SEGMENTS));

        let mut manager = Self {
            textures: Vec::new(),
            slots: Vec::new(),
            x_offsets: vec![[0; SEGMENT_BANDS]; segments],
            y_offsets: vec![[0; SEGMENT_BANDS]; segments],
            used_tiles: vec![0; segments],
            available_segments: 0,
            printing_rows: config.printing_rows.min(64),
            pending: VecDeque::new(),
        };

        manager.configure(config.available_segments);
        manager
    }

    /// Forget every texture and free every segment
    pub fn reset(&mut self) {
        self.textures.clear();
        self.slots.clear();
        self.pending.clear();

        for bands in &mut self.x_offsets {
            *bands = [0; SEGMENT_BANDS];
        }

        for bands in &mut self.y_offsets {
            *bands = [0; SEGMENT_BANDS];
        }

        self.used_tiles.fill(0);
    }

    /// Limit the allocator to the first `available_segments` segments
    ///
    /// The last of them becomes the printing segment.
    pub fn configure(&mut self, available_segments: u8) {
        let max = u8::try_from(self.used_tiles.len()).unwrap_or(MAX_SEGMENTS);
        self.available_segments = available_segments.clamp(1, max.max(1));

        debug!(
            "BGMAP allocator uses {} segments, printing in segment {}",
            self.available_segments,
            self.printing_segment()
        );
    }

    /// Segments given to textures
    #[must_use]
    pub const fn available_segments(&self) -> u8 {
        self.available_segments
    }

    /// Segment whose bottom rows are reserved for printing
    #[must_use]
    pub const fn printing_segment(&self) -> u8 {
        self.available_segments.saturating_sub(1)
    }

    /// Get a texture for `spec`, reusing a resident one when allowed
    ///
    /// Shared specs resolve to the texture already holding the very same
    /// spec. Recyclable specs take a free recyclable slot of similar size.
    /// Any other spec first takes back a released texture that held it.
    /// The texture is queued for writing unless it is already resident.
    ///
    /// # Errors
    ///
    /// [`ResourceExhausted::OutOfTextureMemory`] when nothing fits; the
    /// allocator is left untouched.
    pub fn get_texture(
        &mut self,
        spec: &Arc<TextureSpec>,
        minimum_segment: u8,
        must_live_at_even_segment: bool,
        screen_count: ScreenCount,
    ) -> EngineResult<TextureId> {
        let found = if spec.shared {
            self.find_same_spec(spec, false)
        } else if spec.recyclable {
            self.find_recyclable(spec)
        } else {
            self.find_same_spec(spec, true)
        };

        let id = match found {
            Some(id) => {
                let texture = &mut self.textures[id.index()];
                texture.increase_usage_count();
                texture.set_spec(Arc::clone(spec));
                trace!("Reusing texture {} for a {}x{} spec", id.0, spec.cols, spec.rows);
                id
            }
            None => self.allocate_texture(spec, minimum_segment, must_live_at_even_segment, screen_count)?,
        };

        self.prepare(id);

        Ok(id)
    }

    /// Give a texture back; it stays resident for later reuse
    pub fn release_texture(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.get_mut(id.index()) {
            if texture.decrease_usage_count() {
                trace!("Texture {} is free", id.0);
            }
        }
    }

    /// Place recyclable and shared specs ahead of time, tallest first, so
    /// that they end up packed tightly
    ///
    /// With `remove_old` the allocator is reset first. The loaded textures
    /// are released right away and remain resident.
    ///
    /// # Errors
    ///
    /// [`ResourceExhausted::OutOfTextureMemory`] when a spec does not fit.
    pub fn load_textures(&mut self, specs: &[Arc<TextureSpec>], remove_old: bool) -> EngineResult<()> {
        if remove_old {
            self.reset();
        }

        let mut sorted: Vec<&Arc<TextureSpec>> = Vec::new();

        for spec in specs.iter().filter(|spec| spec.recyclable || spec.shared) {
            if sorted.iter().any(|sorted| Arc::ptr_eq(sorted, spec)) {
                continue;
            }

            let position = sorted.iter().position(|sorted| spec.rows >= sorted.rows).unwrap_or(sorted.len());
            sorted.insert(position, spec);
        }

        let mut loaded = Vec::with_capacity(sorted.len());

        for spec in sorted {
            match self.get_texture(spec, 0, false, ScreenCount::Sc1x1) {
                Ok(id) => loaded.push(id),
                Err(err) => {
                    for id in loaded {
                        self.release_texture(id);
                    }

                    return Err(err);
                }
            }
        }

        debug!("Preloaded {} textures", loaded.len());

        for id in loaded {
            self.release_texture(id);
        }

        Ok(())
    }

    /// Write queued textures through `device`
    ///
    /// Without `defer`, every queued texture gets up to `max_rows` rows
    /// (`None` is unlimited). With `defer`, only the first queued texture is
    /// written, whole. Returns the number of rows written.
    pub fn update_textures(&mut self, device: &mut dyn Device, max_rows: Option<u8>, defer: bool) -> usize {
        let mut written = 0;
        let mut index = 0;

        while let Some(&id) = self.pending.get(index) {
            let Some(texture) = self.textures.get_mut(id.index()) else {
                self.pending.remove(index);
                continue;
            };

            if TextureStatus::Invalid == texture.status() {
                texture.set_queued(false);
                self.pending.remove(index);
                continue;
            }

            written += texture.write(device, if defer { None } else { max_rows });

            if texture.is_written() {
                texture.set_queued(false);
                self.pending.remove(index);
            } else {
                index += 1;
            }

            if defer {
                break;
            }
        }

        written
    }

    /// Whether any texture is waiting to be written
    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Mirror a texture horizontally
    pub fn set_horizontal_flip(&mut self, id: TextureId, value: bool) {
        if let Some(texture) = self.textures.get_mut(id.index()) {
            if texture.set_horizontal_flip(value) {
                self.prepare(id);
            }
        }
    }

    /// Mirror a texture vertically
    pub fn set_vertical_flip(&mut self, id: TextureId, value: bool) {
        if let Some(texture) = self.textures.get_mut(id.index()) {
            if texture.set_vertical_flip(value) {
                self.prepare(id);
            }
        }
    }

    /// Change the palette of a texture
    pub fn set_palette(&mut self, id: TextureId, palette: u8) {
        if let Some(texture) = self.textures.get_mut(id.index()) {
            if texture.set_palette(palette & 0x03) {
                self.prepare(id);
            }
        }
    }

    /// Resident texture
    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&BgmapTexture> {
        self.textures.get(id.index())
    }

    /// Number of textures ever placed since the last reset
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether no texture is placed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Column offset of a texture inside its segment
    #[must_use]
    pub fn x_offset(&self, id: TextureId) -> Option<u16> {
        self.slots.get(id.index()).map(|slot| slot.x_offset)
    }

    /// Row offset of a texture inside its segment
    #[must_use]
    pub fn y_offset(&self, id: TextureId) -> Option<u16> {
        self.slots.get(id.index()).map(|slot| slot.y_offset)
    }

    /// Segment of a texture
    #[must_use]
    pub fn segment(&self, id: TextureId) -> Option<u8> {
        self.texture(id).map(BgmapTexture::segment)
    }

    /// Holders of a texture
    #[must_use]
    pub fn usage_count(&self, id: TextureId) -> Option<u16> {
        self.texture(id).map(BgmapTexture::usage_count)
    }

    /// Tiles taken in `segment`, padding included
    #[must_use]
    pub fn used_tiles(&self, segment: u8) -> u16 {
        self.used_tiles.get(usize::from(segment)).copied().unwrap_or(0)
    }

    /// Zero a whole BGMAP segment
    pub fn clear_bgmap_segment(device: &mut dyn Device, segment: u8) {
        device.write_bgmap(segment, 0, &[0; SEGMENT_TILES as usize]);
    }

    fn prepare(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.get_mut(id.index()) {
            if !texture.is_written() && !texture.is_queued() {
                texture.set_queued(true);
                self.pending.push_back(id);
            }
        }
    }

    /// A texture that already holds `spec`
    fn find_same_spec(&self, spec: &Arc<TextureSpec>, free_only: bool) -> Option<TextureId> {
        self.textures
            .iter()
            .filter(|texture| !free_only || 0 == texture.usage_count())
            .find(|texture| {
                Arc::ptr_eq(texture.spec(), spec)
                    && texture.spec().padding_cols == spec.padding_cols
                    && texture.spec().padding_rows == spec.padding_rows
            })
            .map(BgmapTexture::id)
    }

    /// A free recyclable slot no more than four times larger than `spec`
    ///
    /// An exact fit wins outright, otherwise the smallest candidate.
    fn find_recyclable(&self, spec: &TextureSpec) -> Option<TextureId> {
        let cols = u16::from(spec.cols);
        let rows = u16::from(spec.rows);
        let mut selected: Option<(TextureId, TextureSlot)> = None;

        for texture in self.textures.iter().filter(|texture| texture.spec().recyclable && 0 == texture.usage_count()) {
            let slot = self.slots[texture.id().index()];

            if cols <= slot.cols >> 2 || cols > slot.cols || rows <= slot.rows >> 2 || rows > slot.rows {
                continue;
            }

            if cols == slot.cols && rows == slot.rows {
                return Some(texture.id());
            }

            match selected {
                Some((_, best)) if !(slot.cols < best.cols || slot.rows < best.rows) => {}
                _ => selected = Some((texture.id(), slot)),
            }
        }

        selected.map(|(id, _)| id)
    }

    fn allocate_texture(
        &mut self,
        spec: &Arc<TextureSpec>,
        minimum_segment: u8,
        must_live_at_even_segment: bool,
        screen_count: ScreenCount,
    ) -> EngineResult<TextureId> {
        let index = u16::try_from(self.textures.len())
            .map_err(|_| EngineError::InvalidArgument("too many textures".to_string()))?;
        let id = TextureId(index);

        let (segment, slot) = self
            .allocate(spec, minimum_segment, must_live_at_even_segment, screen_count)
            .ok_or_else(|| {
                let err = ResourceExhausted::OutOfTextureMemory { cols: spec.total_cols(), rows: spec.total_rows() };
                warn!("{err}");
                err
            })?;

        debug!("Texture {} ({}x{}) placed in segment {segment} at {}, {}", id.0, slot.cols, slot.rows, slot.x_offset, slot.y_offset);

        self.textures.push(BgmapTexture::new(id, Arc::clone(spec), segment, slot.x_offset, slot.y_offset));
        self.slots.push(slot);

        Ok(id)
    }

    /// Find room for `spec` and book it
    fn allocate(
        &mut self,
        spec: &TextureSpec,
        minimum_segment: u8,
        must_live_at_even_segment: bool,
        screen_count: ScreenCount,
    ) -> Option<(u8, TextureSlot)> {
        let cols = spec.total_cols();
        let rows = spec.total_rows();
        let cols_padding = u16::from(spec.padding_cols) << 1;
        let rows_padding = u16::from(spec.padding_rows) << 1;
        let width = cols + cols_padding;
        let height = rows + rows_padding;
        let area = width.checked_mul(height)?;

        let step = if must_live_at_even_segment { screen_count.segments().max(1) } else { 1 };
        let mut segment = minimum_segment.div_ceil(step).checked_mul(step)?;

        while segment < self.available_segments {
            let index = usize::from(segment);
            let maximum_row =
                if segment == self.printing_segment() { SEGMENT_ROWS - u16::from(self.printing_rows) } else { SEGMENT_ROWS };

            if SEGMENT_TILES - self.used_tiles[index] >= area {
                let x_offsets = &mut self.x_offsets[index];
                let y_offsets = &mut self.y_offsets[index];

                for band in 0..SEGMENT_BANDS - 1 {
                    let top = y_offsets[band];
                    let next = y_offsets[band + 1];
                    let bottom = if 0 == next { maximum_row } else { next };

                    if 0 == next || height <= bottom.saturating_sub(top) {
                        if height > maximum_row.saturating_sub(top) {
                            break;
                        }

                        if width <= SEGMENT_COLS - x_offsets[band] {
                            let slot = TextureSlot {
                                x_offset: x_offsets[band] + (cols_padding >> 1),
                                y_offset: top + (rows_padding >> 1),
                                cols,
                                rows,
                            };

                            x_offsets[band] += width;

                            if next.saturating_sub(top) < height {
                                y_offsets[band + 1] = top + height;
                            }

                            self.used_tiles[index] += area;

                            return Some((segment, slot));
                        }
                    } else if height > SEGMENT_ROWS - top {
                        break;
                    }
                }
            }

            segment = segment.checked_add(step)?;
        }

        None
    }
}
