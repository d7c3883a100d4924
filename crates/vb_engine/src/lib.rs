//! # VB Engine
//!
//! Collision and rendering pipeline for the Virtual Boy video hardware.
//!
//! ## Features
//!
//! - **Fixed Point Math**: 19.13 coordinates, 7.9 and 10.6 numbers, sine
//!   table, vectors and boxes
//! - **Collision Detection**: separating axis tests between balls, boxes,
//!   inverse boxes and line fields, with per-pair collision state
//! - **BGMAP Allocation**: textures packed into the 64x64 character segments
//! - **Sprite Scheduling**: depth-sorted WORLD layers and OBJECT characters
//! - **VIP Interrupts**: GAMESTART / XPEND frame pipeline with
//!   post-processing effects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vb_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut device = MemoryDevice::new();
//!     let mut vip = VipManager::new(&config);
//!     let mut renderer = FrameRenderer::new(&config);
//!
//!     let spec = SpriteSpec::bgmap(Arc::new(TextureSpec::new(4, 4)));
//!     let sprite = renderer.create_sprite(&spec, None)?;
//!     renderer.sprites_mut().set_sprite_position(sprite, PixelVector::new(192, 112, 0, 0))?;
//!
//!     vip.start_drawing(&mut device);
//!     device.raise(Interrupt::GAMESTART | Interrupt::XPEND);
//!     vip.interrupt_handler(&mut device, &mut renderer);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod events;
pub mod foundation;
pub mod hardware;
pub mod physics;
pub mod render;

pub use crate::core::config::EngineConfig;
pub use crate::core::error::{EngineError, EngineResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::{
            config::{CameraFrustum, EngineConfig, SpriteManagerConfig, TextureConfig, VipConfig},
            error::{EngineError, EngineResult, ResourceExhausted},
        },
        events::{Event, EventArg, EventSystem, EventType},
        foundation::{
            collections::{OwnerId, ShapeId, SpriteId, TextureId},
            fixed::{Fix7_9, Fixed},
            math::{PixelVector, RightBox, Rotation, Scale, Vector3D},
        },
        hardware::{Device, FramePipeline, Interrupt, MemoryDevice, VipManager},
        physics::{CollisionLayers, ShapeArena, ShapeSpec},
        render::{BgmapTextureManager, FrameRenderer, SpriteManager, SpriteSpec, TextureSpec},
    };
}
