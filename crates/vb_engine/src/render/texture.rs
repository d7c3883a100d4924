//! BGMAP textures
//!
//! A [`TextureSpec`] is the immutable description a game ships; a
//! [`BgmapTexture`] is its resident copy inside a BGMAP segment. Specs are
//! shared through `Arc` and compared by identity, the way the allocator
//! recognises "the same texture" when deciding whether to reuse a slot.

use crate::foundation::collections::TextureId;
use crate::hardware::Device;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Map entries per BGMAP segment row
pub const SEGMENT_COLS: u16 = 64;

/// Rows per BGMAP segment
pub const SEGMENT_ROWS: u16 = 64;

/// Bits of a map entry holding the character index
const CHAR_MASK: u16 = 0x07FF;

/// Description of a texture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSpec {
    /// Width in tiles
    pub cols: u8,
    /// Height in tiles
    pub rows: u8,
    /// Empty tiles kept left and right
    #[serde(default)]
    pub padding_cols: u8,
    /// Empty tiles kept above and below
    #[serde(default)]
    pub padding_rows: u8,
    /// Frames laid out side by side
    #[serde(default = "single_frame")]
    pub frames: u8,
    /// A free slot of similar size may be reused for another spec
    #[serde(default)]
    pub recyclable: bool,
    /// Every request for this spec gets the same resident texture
    #[serde(default)]
    pub shared: bool,
    /// Palette, 0-3
    #[serde(default)]
    pub palette: u8,
    /// Mirror horizontally
    #[serde(default)]
    pub horizontal_flip: bool,
    /// Mirror vertically
    #[serde(default)]
    pub vertical_flip: bool,
    /// First character of the texture's charset
    #[serde(default)]
    pub char_offset: u16,
    /// `cols * rows` map entries per frame, row-major
    pub map: Vec<u16>,
}

const fn single_frame() -> u8 {
    1
}

impl TextureSpec {
    /// Single-frame spec with a zeroed map
    #[must_use]
    pub fn new(cols: u8, rows: u8) -> Self {
        Self {
            cols,
            rows,
            padding_cols: 0,
            padding_rows: 0,
            frames: 1,
            recyclable: false,
            shared: false,
            palette: 0,
            horizontal_flip: false,
            vertical_flip: false,
            char_offset: 0,
            map: vec![0; usize::from(cols) * usize::from(rows)],
        }
    }

    /// Set the map entries
    #[must_use]
    pub fn with_map(mut self, map: Vec<u16>) -> Self {
        self.map = map;
        self
    }

    /// Mark textures built from this recyclable
    #[must_use]
    pub const fn recyclable(mut self) -> Self {
        self.recyclable = true;
        self
    }

    /// Mark textures built from this shared
    #[must_use]
    pub const fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    /// Set the padding
    #[must_use]
    pub const fn with_padding(mut self, cols: u8, rows: u8) -> Self {
        self.padding_cols = cols;
        self.padding_rows = rows;
        self
    }

    /// Set the number of frames
    #[must_use]
    pub fn with_frames(mut self, frames: u8) -> Self {
        self.frames = frames.max(1);
        self
    }

    /// Whether the texture has a single frame
    #[must_use]
    pub const fn is_single_frame(&self) -> bool {
        1 >= self.frames
    }

    fn frames_per_row(&self) -> u16 {
        (SEGMENT_COLS / u16::from(self.cols.max(1))).max(1)
    }

    /// Columns a resident copy needs, every frame included
    #[must_use]
    pub fn total_cols(&self) -> u16 {
        let cols = u16::from(self.cols);

        if self.is_single_frame() {
            return cols;
        }

        self.frames_per_row().min(u16::from(self.frames)) * cols
    }

    /// Rows a resident copy needs, every frame included
    #[must_use]
    pub fn total_rows(&self) -> u16 {
        let rows = u16::from(self.rows);

        if self.is_single_frame() {
            return rows;
        }

        rows * u16::from(self.frames).div_ceil(self.frames_per_row())
    }
}

/// Where a texture is in its write cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextureStatus {
    /// Not backed by BGMAP memory
    Invalid,
    /// Rows remain to be written
    PendingWriting,
    /// Rows remain to be written over a previous copy
    PendingRewriting,
    /// Fully resident
    Written,
}

/// A texture resident in a BGMAP segment
#[derive(Debug, Clone)]
pub struct BgmapTexture {
    id: TextureId,
    spec: Arc<TextureSpec>,
    segment: u8,
    x_offset: u16,
    y_offset: u16,
    usage_count: u16,
    status: TextureStatus,
    remaining_rows: u16,
    palette: u8,
    horizontal_flip: bool,
    vertical_flip: bool,
    queued: bool,
}

impl BgmapTexture {
    /// A texture placed at `x_offset, y_offset` tiles in `segment`
    #[must_use]
    pub fn new(id: TextureId, spec: Arc<TextureSpec>, segment: u8, x_offset: u16, y_offset: u16) -> Self {
        Self {
            id,
            segment,
            x_offset,
            y_offset,
            usage_count: 1,
            status: TextureStatus::PendingWriting,
            remaining_rows: u16::from(spec.rows),
            palette: spec.palette,
            horizontal_flip: spec.horizontal_flip,
            vertical_flip: spec.vertical_flip,
            queued: false,
            spec,
        }
    }

    /// Handle
    #[must_use]
    pub const fn id(&self) -> TextureId {
        self.id
    }

    /// Spec currently held
    #[must_use]
    pub fn spec(&self) -> &Arc<TextureSpec> {
        &self.spec
    }

    /// BGMAP segment
    #[must_use]
    pub const fn segment(&self) -> u8 {
        self.segment
    }

    /// Column of the first tile inside the segment
    #[must_use]
    pub const fn x_offset(&self) -> u16 {
        self.x_offset
    }

    /// Row of the first tile inside the segment
    #[must_use]
    pub const fn y_offset(&self) -> u16 {
        self.y_offset
    }

    /// Number of holders
    #[must_use]
    pub const fn usage_count(&self) -> u16 {
        self.usage_count
    }

    /// Write status
    #[must_use]
    pub const fn status(&self) -> TextureStatus {
        self.status
    }

    /// Whether the texture is fully resident
    #[must_use]
    pub fn is_written(&self) -> bool {
        TextureStatus::Written == self.status
    }

    /// Rows still to be written in the current pass
    #[must_use]
    pub const fn remaining_rows(&self) -> u16 {
        self.remaining_rows
    }

    /// Width in tiles
    #[must_use]
    pub fn cols(&self) -> u8 {
        self.spec.cols
    }

    /// Height in tiles
    #[must_use]
    pub fn rows(&self) -> u8 {
        self.spec.rows
    }

    /// Palette
    #[must_use]
    pub const fn palette(&self) -> u8 {
        self.palette
    }

    pub(crate) fn increase_usage_count(&mut self) {
        self.usage_count = self.usage_count.saturating_add(1);
    }

    /// Returns whether the texture became free
    pub(crate) fn decrease_usage_count(&mut self) -> bool {
        self.usage_count = self.usage_count.saturating_sub(1);

        if 0 == self.usage_count && !self.spec.recyclable {
            self.status = TextureStatus::Invalid;
        }

        0 == self.usage_count
    }

    pub(crate) const fn is_queued(&self) -> bool {
        self.queued
    }

    pub(crate) fn set_queued(&mut self, queued: bool) {
        self.queued = queued;
    }

    /// Hold `spec` instead of the current one, rewriting if anything changed
    pub(crate) fn set_spec(&mut self, spec: Arc<TextureSpec>) {
        if !Arc::ptr_eq(&self.spec, &spec) || TextureStatus::Written != self.status {
            self.palette = spec.palette;
            self.horizontal_flip = spec.horizontal_flip;
            self.vertical_flip = spec.vertical_flip;
            self.spec = spec;
            self.status = TextureStatus::PendingWriting;
            self.remaining_rows = u16::from(self.spec.rows);
        }
    }

    /// Schedule a full rewrite
    pub(crate) fn rewrite(&mut self) {
        if TextureStatus::PendingWriting < self.status {
            self.status = TextureStatus::PendingRewriting;
        } else if TextureStatus::Invalid == self.status {
            self.status = TextureStatus::PendingWriting;
        }

        self.remaining_rows = u16::from(self.spec.rows);
    }

    /// Change the palette; returns whether a rewrite is needed
    pub(crate) fn set_palette(&mut self, palette: u8) -> bool {
        let changed = self.palette != palette;
        self.palette = palette;

        if changed {
            self.rewrite();
        }

        changed
    }

    /// Mirror horizontally; returns whether a rewrite is needed
    pub(crate) fn set_horizontal_flip(&mut self, value: bool) -> bool {
        let value = value != self.spec.horizontal_flip;
        let changed = self.horizontal_flip != value;
        self.horizontal_flip = value;

        if changed {
            self.rewrite();
        }

        changed
    }

    /// Mirror vertically; returns whether a rewrite is needed
    pub(crate) fn set_vertical_flip(&mut self, value: bool) -> bool {
        let value = value != self.spec.vertical_flip;
        let changed = self.vertical_flip != value;
        self.vertical_flip = value;

        if changed {
            self.rewrite();
        }

        changed
    }

    /// Write up to `max_rows` rows (all when `None`) and return how many
    /// were written
    ///
    /// Multi-frame textures are always written whole.
    pub(crate) fn write(&mut self, device: &mut dyn Device, max_rows: Option<u8>) -> usize {
        if TextureStatus::Written == self.status {
            return 0;
        }

        if 0 == self.remaining_rows {
            self.remaining_rows = u16::from(self.spec.rows);
        }

        let written = if self.spec.is_single_frame() {
            self.write_frame(device, max_rows, self.x_offset, self.y_offset, 0)
        } else {
            self.write_all_frames(device)
        };

        if 0 == self.remaining_rows {
            self.status = TextureStatus::Written;
        }

        written
    }

    fn write_all_frames(&mut self, device: &mut dyn Device) -> usize {
        let cols = u16::from(self.spec.cols);
        let rows = u16::from(self.spec.rows);
        let mut x_offset = self.x_offset;
        let mut y_offset = self.y_offset;
        let mut written = 0;

        for frame in 0..u16::from(self.spec.frames) {
            self.remaining_rows = rows;
            written += self.write_frame(device, None, x_offset, y_offset, frame);

            x_offset += cols;

            if SEGMENT_COLS < x_offset + cols {
                x_offset = self.x_offset;
                y_offset += rows;

                if SEGMENT_ROWS <= y_offset {
                    break;
                }
            }
        }

        self.remaining_rows = 0;
        written
    }

    /// Rows are written bottom-up so an interrupted pass resumes where it
    /// stopped
    fn write_frame(
        &mut self,
        device: &mut dyn Device,
        max_rows: Option<u8>,
        x_offset: u16,
        y_offset: u16,
        frame: u16,
    ) -> usize {
        let cols = usize::from(self.spec.cols);
        let rows = usize::from(self.spec.rows);
        let frame_start = cols * rows * usize::from(frame);
        let flip = (u16::from(self.horizontal_flip) << 13) | (u16::from(self.vertical_flip) << 12);
        let offset = self.spec.char_offset | (u16::from(self.palette) << 14);
        let mut budget = max_rows.map_or(usize::MAX, usize::from);
        let mut written = 0;
        let mut line = Vec::with_capacity(cols);

        while 0 < budget && 0 < self.remaining_rows {
            self.remaining_rows -= 1;
            budget -= 1;

            let row = usize::from(self.remaining_rows);
            let source_row = if self.vertical_flip { rows - row - 1 } else { row };
            let start = frame_start + source_row * cols;

            line.clear();
            line.extend(
                (0..cols)
                    .map(|col| self.spec.map.get(start + col).copied().unwrap_or(0))
                    .map(|entry| ((entry & CHAR_MASK) ^ flip).wrapping_add(offset)),
            );

            if self.horizontal_flip {
                line.reverse();
            }

            let destination = usize::from(x_offset) + ((usize::from(y_offset) + row) << 6);
            device.write_bgmap(self.segment, destination, &line);
            written += 1;
        }

        if 0 == self.remaining_rows && 0 < self.spec.padding_rows {
            let destination = usize::from(x_offset) + ((usize::from(y_offset) + rows) << 6);
            device.write_bgmap(self.segment, destination, &vec![0; cols]);
        }

        written
    }
}
