//! Frame pipeline demo
//!
//! Spawns a fleet of ball-shaped ships with random positions and speeds,
//! bounces them around the screen and off each other, and drives the VIP
//! interrupt pipeline against an in-memory device for a fixed number of
//! frames. Pass a `.toml` or `.ron` engine config as the first argument to
//! override the defaults.

use rand::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use vb_engine::config::Config;
use vb_engine::core::config::{CameraFrustum, EngineConfig};
use vb_engine::core::error::EngineResult;
use vb_engine::events::{Event, EventHandler, EventType};
use vb_engine::foundation::collections::{OwnerId, ShapeId, SpriteId};
use vb_engine::foundation::math::{PixelVector, Size, Vector3D};
use vb_engine::hardware::{Device, FramePipeline, Interrupt, MemoryDevice, VipManager};
use vb_engine::physics::{CollisionLayers, CollisionResult, ShapeArena, ShapeSpec, ShapeType};
use vb_engine::render::{FrameRenderer, SpriteSpec, TextureSpec, Transparency};

// Configuration constants
const SHIPS: usize = 12;
const FRAMES: u32 = 300;
const SHIP_TILES: u8 = 2;

struct Ship {
    sprite: SpriteId,
    shape: ShapeId,
    position: PixelVector,
    velocity: (i16, i16),
}

/// The game: ships, their colliders and the renderer they draw through
struct FleetScene {
    renderer: FrameRenderer,
    arena: ShapeArena,
    ships: Vec<Ship>,
    bounces: u32,
}

impl FleetScene {
    fn new(config: &EngineConfig, rng: &mut impl Rng) -> EngineResult<Self> {
        let mut renderer = FrameRenderer::new(config);
        let mut arena = ShapeArena::new();
        let frustum = config.frustum;

        // Every ship shares one texture
        let texture = Arc::new(TextureSpec::new(SHIP_TILES, SHIP_TILES).shared().with_map((1..=4).collect()));
        let shape_spec = ShapeSpec::new(ShapeType::Ball, Size::from_pixels(16, 16, 16))
            .with_layers(CollisionLayers::ENEMY, CollisionLayers::NONE);

        let mut ships = Vec::with_capacity(SHIPS);

        for index in 0..SHIPS {
            let owner = OwnerId(u32::try_from(index).unwrap_or(u32::MAX));
            let mut spec = SpriteSpec::bgmap(Arc::clone(&texture));

            if 0 == index % 4 {
                spec = spec.with_transparency(Transparency::Odd);
            }

            let sprite = renderer.create_sprite(&spec, Some(owner))?;
            let shape = arena.create(&shape_spec, owner);

            let position = PixelVector::new(
                rng.gen_range(frustum.x0 + 16..frustum.x1 - 16),
                rng.gen_range(frustum.y0 + 16..frustum.y1 - 16),
                rng.gen_range(0..64),
                0,
            );
            let velocity = (rng.gen_range(-3..=3), rng.gen_range(-2..=2));

            renderer.sprites_mut().set_sprite_position(sprite, position)?;
            arena.set_position(shape, Vector3D::from_pixel_vector(position))?;

            ships.push(Ship { sprite, shape, position, velocity });
        }

        log::info!("Spawned {} ships", ships.len());

        Ok(Self { renderer, arena, ships, bounces: 0 })
    }

    /// Move every ship, bounce it off the screen edges and push it out of
    /// the ships it ran into
    fn update(&mut self) -> EngineResult<()> {
        let frustum: CameraFrustum = *self.renderer.frustum();

        for ship in &mut self.ships {
            let (mut dx, mut dy) = ship.velocity;
            let x = ship.position.x + dx;
            let y = ship.position.y + dy;

            if x < frustum.x0 || x > frustum.x1 {
                dx = -dx;
            }

            if y < frustum.y0 || y > frustum.y1 {
                dy = -dy;
            }

            ship.velocity = (dx, dy);
            ship.position.x += dx;
            ship.position.y += dy;
            self.arena.set_position(ship.shape, Vector3D::from_pixel_vector(ship.position))?;
        }

        for index in 0..self.ships.len() {
            for other in 0..self.ships.len() {
                if index == other {
                    continue;
                }

                let (shape, partner) = (self.ships[index].shape, self.ships[other].shape);

                if !self.arena.can_collide(shape, partner) {
                    continue;
                }

                let collision = self.arena.collides(shape, partner)?;

                if CollisionResult::Enter == collision.result {
                    let displacement = self.arena.resolve_collision(shape, &collision.information, false)?;
                    let ship = &mut self.ships[index];
                    let offset = displacement.to_pixel_vector();

                    ship.position.x += offset.x;
                    ship.position.y += offset.y;
                    ship.velocity = (-ship.velocity.0, -ship.velocity.1);
                    self.bounces += 1;
                }
            }
        }

        for ship in &self.ships {
            self.renderer.sprites_mut().set_sprite_position(ship.sprite, ship.position)?;
        }

        self.arena.events_mut().dispatch();

        Ok(())
    }
}

impl FramePipeline for FleetScene {
    fn game_start(&mut self, device: &mut dyn Device) -> EngineResult<()> {
        self.update()?;
        self.renderer.game_start(device)
    }

    fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()> {
        self.renderer.xpend(device)
    }
}

/// Counts the resource errors the VIP reports
struct ResourceErrors(Rc<Cell<u32>>);

impl EventHandler for ResourceErrors {
    fn on_event(&mut self, event: &Event) -> bool {
        log::warn!("Frame failed: {:?}", event.get_arg("message"));
        self.0.set(self.0.get() + 1);
        true
    }
}

fn load_config() -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading engine config from {path}");
            EngineConfig::load_from_file(path)?
        }
        None => EngineConfig::default().with_fail_fast(false),
    };

    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env().filter_level(log::LevelFilter::Info).init();

    log::info!("Starting frame pipeline demo");

    let config = load_config()?;
    let mut rng = rand::thread_rng();
    let mut device = MemoryDevice::new();
    let mut vip = VipManager::new(&config);
    let mut scene = FleetScene::new(&config, &mut rng)?;
    let exhausted = Rc::new(Cell::new(0));

    vip.events_mut().register_handler(EventType::ResourceExhausted, Box::new(ResourceErrors(Rc::clone(&exhausted))));

    vip.reset(&mut device);
    scene.renderer.sprites_mut().clear_dram(&mut device);
    vip.start_displaying(&mut device);
    vip.start_drawing(&mut device);

    for frame in 0..FRAMES {
        device.raise(Interrupt::FRAMESTART | Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut scene);

        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut scene);

        if 0 == frame % 60 {
            let stats = scene.renderer.last_stats();
            log::info!(
                "Frame {frame}: {} sprites drawn, free layer {}, {} pixels, {} bounces",
                stats.rendered_sprites,
                stats.free_layer,
                scene.renderer.sprites().total_pixels_drawn(),
                scene.bounces
            );
        }
    }

    // The last frame's events are still queued
    vip.events_mut().dispatch();
    let counters = vip.counters();

    log::info!(
        "Done: {} frames, {} resource errors, {} GAMESTART during XPEND, {} XPEND during GAMESTART",
        counters.frames,
        exhausted.get(),
        counters.game_start_during_xpend,
        counters.xpend_during_game_start
    );
    log::info!("WORLD memory image is {} bytes", device.world_image().len());

    Ok(())
}
