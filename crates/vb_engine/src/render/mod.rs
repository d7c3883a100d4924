//! # Rendering System
//!
//! Sprites and the BGMAP memory that backs them.
//!
//! ## Architecture
//!
//! - **Texture**: a character map and its placement in a BGMAP segment
//! - **BGMAP Texture Manager**: packs textures into segments and streams
//!   their rows to DRAM
//! - **Sprite**: one drawable, either a WORLD layer or a run of OBJECT
//!   characters
//! - **Sprite Manager**: sorts sprites by depth and assigns layers and
//!   OBJECT slots every frame
//! - **Frame Renderer**: binds the managers to the VIP frame pipeline
//!
//! Nothing here writes DRAM outside XPEND: rendering fills CPU-side caches
//! and [`SpriteManager::write_dram`] flushes them.

pub mod bgmap_texture_manager;
pub mod frame_renderer;
pub mod sprite;
pub mod sprite_manager;
pub mod texture;

pub use bgmap_texture_manager::BgmapTextureManager;
pub use frame_renderer::FrameRenderer;
pub use sprite::{ParamTable, Sprite, SpriteKind, SpriteSpec, Transparency, NO_RENDER_INDEX};
pub use sprite_manager::{RenderStats, SpriteManager};
pub use texture::{BgmapTexture, TextureSpec, TextureStatus};
