//! VIP interrupt pipeline
//!
//! The VIP multiplexes every video interrupt onto one line. The handler reads
//! `INTPND`, masks the line, services the pending reasons in a fixed order and
//! finally re-enables GAMESTART and XPEND. GAMESTART runs the game tick and the
//! render pass; XPEND is the window in which DRAM may be written.
//!
//! Re-entrancy is modelled with the `processing_*` flags: a GAMESTART that
//! arrives while XPEND is being serviced (or the other way around) is counted
//! and reported instead of being processed twice.

use super::device::Device;
use super::registers::{DisplayControl, DrawingStatus, Interrupt, Register};
use crate::core::config::{DrawingStrategy, EngineConfig, MultiplexedInterrupts};
use crate::core::error::{escalate, EngineError, EngineResult};
use crate::events::{EventArg, EventSystem, EventType};
use crate::foundation::collections::OwnerId;
use crate::foundation::time::{FrameClock, FRAME_MILLISECONDS};
use log::{debug, trace, warn};

/// Largest supported frame cycle
pub const MAX_FRAME_CYCLE: u8 = 3;

/// Largest background color index
pub const MAX_BACKGROUND_COLOR: u16 = 3;

/// Order in which pending interrupts are serviced
const INTERRUPT_ORDER: [Interrupt; 5] =
    [Interrupt::FRAMESTART, Interrupt::GAMESTART, Interrupt::XPEND, Interrupt::TIMEERR, Interrupt::SCANERR];

/// Work the VIP schedules each frame
pub trait FramePipeline {
    /// A new game frame started drawing: run the game tick and render
    ///
    /// # Errors
    ///
    /// Whatever the render pass reports; the VIP logs it and carries on.
    fn game_start(&mut self, device: &mut dyn Device) -> EngineResult<()>;

    /// Drawing finished: write DRAM
    ///
    /// # Errors
    ///
    /// Whatever the DRAM write reports; the VIP logs it and carries on.
    fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()>;
}

/// Callback run after each DRAM write with the frame buffer set being drawn
pub type PostProcessingEffect = Box<dyn FnMut(&mut dyn Device, u16)>;

/// Identity of a registered post-processing effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectKey {
    /// Effect name
    pub name: &'static str,
    /// Object the effect works for
    pub owner: OwnerId,
}

struct PostProcessingEffectRegistry {
    key: EffectKey,
    effect: PostProcessingEffect,
    remove: bool,
}

/// Brightness of the three shades, red LED units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Brightness {
    /// Darkest shade
    pub dark: u16,
    /// Middle shade
    pub medium: u16,
    /// Brightest shade
    pub bright: u16,
}

/// Palette registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteConfig {
    /// `GPLT0-3`
    pub bgmap: [u16; 4],
    /// `JPLT0-3`
    pub object: [u16; 4],
}

/// Occurrence counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VipCounters {
    /// GAMESTART arrived while XPEND was in flight
    pub game_start_during_xpend: u32,
    /// XPEND arrived while GAMESTART was in flight
    pub xpend_during_game_start: u32,
    /// TIMEERR raised
    pub time_errors: u32,
    /// SCANERR raised
    pub scan_errors: u32,
    /// FRAMESTART raised
    pub frames: u32,
}

/// Owner of the VIP registers and the interrupt state machine
pub struct VipManager {
    processing_game_start: bool,
    processing_xpend: bool,
    frame_start_during_xpend: bool,
    drawing_ended: bool,
    drawing_allowed: bool,
    current_interrupt: Interrupt,
    current_drawing_frame_buffer_set: u16,
    custom_interrupts: Interrupt,
    multiplexed_interrupts: MultiplexedInterrupts,
    drawing_strategy: DrawingStrategy,
    game_frame_duration: u32,
    configured_frame_cycle: u8,
    shipping: bool,
    fail_fast: bool,
    counters: VipCounters,
    post_processing_effects: Vec<PostProcessingEffectRegistry>,
    clock: FrameClock,
    events: EventSystem,
}

impl std::fmt::Debug for VipManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VipManager")
            .field("processing_game_start", &self.processing_game_start)
            .field("processing_xpend", &self.processing_xpend)
            .field("current_interrupt", &self.current_interrupt)
            .field("counters", &self.counters)
            .field("post_processing_effects", &self.post_processing_effects.len())
            .finish_non_exhaustive()
    }
}

impl VipManager {
    /// Create a manager configured from `config`
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let frame_cycle = config.vip.frame_cycle.min(MAX_FRAME_CYCLE);

        Self {
            processing_game_start: false,
            processing_xpend: false,
            frame_start_during_xpend: false,
            drawing_ended: false,
            drawing_allowed: false,
            current_interrupt: Interrupt::empty(),
            current_drawing_frame_buffer_set: 0,
            custom_interrupts: Interrupt::empty(),
            multiplexed_interrupts: config.vip.multiplexed_interrupts,
            drawing_strategy: config.vip.drawing_strategy,
            game_frame_duration: FRAME_MILLISECONDS << frame_cycle,
            configured_frame_cycle: frame_cycle,
            shipping: config.shipping,
            fail_fast: config.fail_fast,
            counters: VipCounters::default(),
            post_processing_effects: Vec::new(),
            clock: FrameClock::new(),
            events: EventSystem::new(),
        }
    }

    /// Return to the power-on state and clear the effect registry
    pub fn reset(&mut self, device: &mut dyn Device) {
        self.custom_interrupts = Interrupt::empty();
        self.current_interrupt = Interrupt::empty();
        self.processing_game_start = false;
        self.processing_xpend = false;
        self.frame_start_during_xpend = false;
        self.drawing_ended = false;
        self.drawing_allowed = false;
        self.counters = VipCounters::default();
        self.post_processing_effects.clear();
        self.clock.reset();

        self.set_frame_cycle(device, self.configured_frame_cycle);
    }

    /// Service the interrupt line
    pub fn interrupt_handler(&mut self, device: &mut dyn Device, pipeline: &mut dyn FramePipeline) {
        let previous = self.current_interrupt;
        self.current_interrupt = Interrupt::from_bits_truncate(device.read_register(Register::IntPnd));

        trace!("VIP interrupt {:?}", self.current_interrupt);

        self.disable_interrupts(device);
        self.process_interrupt(device, pipeline, self.current_interrupt);

        self.current_interrupt = previous;
        self.enable_interrupts(device, Interrupt::GAMESTART | Interrupt::XPEND);
    }

    /// Service every reason in `interrupt`, FRAMESTART first
    pub fn process_interrupt(
        &mut self,
        device: &mut dyn Device,
        pipeline: &mut dyn FramePipeline,
        interrupt: Interrupt,
    ) {
        for reason in INTERRUPT_ORDER {
            if !interrupt.contains(reason) {
                continue;
            }

            if reason == Interrupt::FRAMESTART {
                self.frame_start();
            } else if reason == Interrupt::GAMESTART {
                self.game_start(device, pipeline, interrupt);
            } else if reason == Interrupt::XPEND {
                self.xpend(device, pipeline, interrupt);
            } else if !self.shipping {
                self.fault(reason);
            }
        }
    }

    fn fault(&mut self, reason: Interrupt) {
        if reason == Interrupt::TIMEERR {
            self.counters.time_errors += 1;
            warn!("VIP drawing overran the frame ({} so far)", self.counters.time_errors);
            self.events.fire(EventType::TimeError, [("count", EventArg::Count(self.counters.time_errors))]);
        } else {
            self.counters.scan_errors += 1;
            warn!("VIP scan error ({} so far)", self.counters.scan_errors);
            self.events.fire(EventType::ScanError, [("count", EventArg::Count(self.counters.scan_errors))]);
        }
    }

    fn frame_start(&mut self) {
        self.frame_start_during_xpend = self.processing_xpend;
        self.counters.frames += 1;
        self.clock.tick(FRAME_MILLISECONDS);
        self.events.update_time(self.clock.seconds());

        // Deliver the previous frame's events
        self.events.dispatch();
        self.events.fire(EventType::FrameStart, [("count", EventArg::Count(self.counters.frames))]);
    }

    fn game_start(&mut self, device: &mut dyn Device, pipeline: &mut dyn FramePipeline, interrupt: Interrupt) {
        self.processing_game_start = true;
        self.drawing_ended = false;
        self.register_current_drawing_frame_buffer_set(device);

        if self.processing_xpend {
            self.counters.game_start_during_xpend += 1;
            debug!("GAMESTART during XPEND ({} so far)", self.counters.game_start_during_xpend);
            self.events.fire(
                EventType::GameStartDuringXpend,
                [("count", EventArg::Count(self.counters.game_start_during_xpend))],
            );
        } else {
            if !interrupt.contains(Interrupt::XPEND) && self.multiplexes(Interrupt::XPEND) {
                self.enable_interrupts(device, Interrupt::XPEND);
            }

            self.events.fire(EventType::GameStart, [("interrupt", EventArg::Interrupt(interrupt.bits()))]);
        }

        if let Err(err) = pipeline.game_start(device) {
            self.report(err);
        }

        self.service_nested(device, pipeline);
        self.processing_game_start = false;

        // Drawing finished while the game tick ran and nobody serviced it
        let pending = Interrupt::from_bits_truncate(device.read_register(Register::IntPnd));

        if pending.contains(Interrupt::XPEND) && !interrupt.contains(Interrupt::XPEND) && !self.processing_xpend {
            device.write_register(Register::IntClr, Interrupt::XPEND.bits());
            debug!("Drawing ended during GAMESTART, writing DRAM now");
            self.xpend(device, pipeline, pending);
        }
    }

    fn xpend(&mut self, device: &mut dyn Device, pipeline: &mut dyn FramePipeline, interrupt: Interrupt) {
        self.processing_xpend = true;

        if self.processing_game_start {
            self.counters.xpend_during_game_start += 1;
            debug!("XPEND during GAMESTART ({} so far)", self.counters.xpend_during_game_start);
            self.events.fire(
                EventType::XpendDuringGameStart,
                [("count", EventArg::Count(self.counters.xpend_during_game_start))],
            );
        } else {
            if DrawingStrategy::FavorStability == self.drawing_strategy {
                self.suspend_drawing(device);
            }

            // Frame buffers may swap mid drawing
            if !interrupt.contains(Interrupt::GAMESTART) && self.multiplexes(Interrupt::GAMESTART) {
                self.enable_interrupts(device, Interrupt::GAMESTART);
            }

            self.events.fire(EventType::Xpend, [("interrupt", EventArg::Interrupt(interrupt.bits()))]);
        }

        if let Err(err) = pipeline.xpend(device) {
            self.report(err);
        }

        self.service_nested(device, pipeline);
        self.apply_post_processing_effects(device);

        self.drawing_ended = true;
        self.processing_xpend = false;

        if !self.processing_game_start {
            self.resume_drawing(device);
        }
    }

    /// Re-enter the handler for interrupts raised while a phase ran
    fn service_nested(&mut self, device: &mut dyn Device, pipeline: &mut dyn FramePipeline) {
        let pending = device.read_register(Register::IntPnd) & device.read_register(Register::IntEnb);
        let pending = Interrupt::from_bits_truncate(pending);

        if INTERRUPT_ORDER.iter().any(|&reason| pending.contains(reason) && self.multiplexes(reason)) {
            self.interrupt_handler(device, pipeline);
        }
    }

    /// Whether `interrupt` may pre-empt the phase in flight
    const fn multiplexes(&self, interrupt: Interrupt) -> bool {
        match self.multiplexed_interrupts {
            MultiplexedInterrupts::All => true,
            MultiplexedInterrupts::None => false,
            MultiplexedInterrupts::GameStartOnly => interrupt.bits() != Interrupt::XPEND.bits(),
            MultiplexedInterrupts::XpendOnly => interrupt.bits() != Interrupt::GAMESTART.bits(),
        }
    }

    fn report(&mut self, err: EngineError) {
        let err = escalate(err, self.fail_fast);
        self.events.fire(EventType::ResourceExhausted, [("message", EventArg::Message(err.to_string()))]);
    }

    fn apply_post_processing_effects(&mut self, device: &mut dyn Device) {
        if self.frame_start_during_xpend {
            return;
        }

        let mut index = self.post_processing_effects.len();

        while 0 < index {
            index -= 1;

            if self.post_processing_effects[index].remove {
                self.post_processing_effects.remove(index);
            } else {
                (self.post_processing_effects[index].effect)(device, self.current_drawing_frame_buffer_set);
            }
        }
    }

    fn register_current_drawing_frame_buffer_set(&mut self, device: &dyn Device) {
        let busy = DrawingStatus::from_bits_truncate(device.read_register(Register::XpStts)) & DrawingStatus::XPBSY;

        if busy == DrawingStatus::XPBSY0 {
            self.current_drawing_frame_buffer_set = 0;
        } else if busy == DrawingStatus::XPBSY1 {
            self.current_drawing_frame_buffer_set = 0x8000;
        }
    }

    /// Acknowledge pending interrupts and enable `interrupt`
    ///
    /// FRAMESTART and the custom interrupts are always enabled; so are the
    /// fault interrupts outside shipping builds.
    pub fn enable_interrupts(&self, device: &mut dyn Device, interrupt: Interrupt) {
        let pending = device.read_register(Register::IntPnd);
        device.write_register(Register::IntClr, pending);

        let mut enabled = interrupt | self.custom_interrupts | Interrupt::FRAMESTART;

        if !self.shipping {
            enabled |= Interrupt::TIMEERR | Interrupt::SCANERR;
        }

        device.write_register(Register::IntEnb, enabled.bits());
    }

    /// Mask every interrupt and acknowledge pending ones
    pub fn disable_interrupts(&self, device: &mut dyn Device) {
        device.write_register(Register::IntEnb, 0);

        let pending = device.read_register(Register::IntPnd);
        device.write_register(Register::IntClr, pending);
    }

    /// Interrupts kept enabled on top of the pipeline's own
    pub fn enable_custom_interrupts(&mut self, interrupt: Interrupt) {
        self.custom_interrupts = interrupt;
    }

    /// Change the re-entrancy policy
    pub fn enable_multiplexed_interrupts(&mut self, policy: MultiplexedInterrupts) {
        self.multiplexed_interrupts = policy;
    }

    /// Change the drawing strategy
    pub fn set_drawing_strategy(&mut self, strategy: DrawingStrategy) {
        self.drawing_strategy = strategy;
    }

    /// Current drawing strategy
    #[must_use]
    pub const fn drawing_strategy(&self) -> DrawingStrategy {
        self.drawing_strategy
    }

    /// Allow drawing and listen for FRAMESTART and XPEND
    pub fn start_drawing(&mut self, device: &mut dyn Device) {
        self.drawing_allowed = true;
        self.enable_interrupts(device, Interrupt::FRAMESTART | Interrupt::XPEND);
        Self::set_drawing_enabled(device, true);
    }

    /// Resume drawing if it is allowed
    pub fn resume_drawing(&self, device: &mut dyn Device) {
        if self.drawing_allowed {
            Self::set_drawing_enabled(device, true);
        }
    }

    /// Pause drawing, remembering whether it was enabled
    pub fn suspend_drawing(&mut self, device: &mut dyn Device) {
        self.drawing_allowed = Self::is_drawing_enabled(device);
        Self::set_drawing_enabled(device, false);
    }

    /// Disallow drawing and mask every interrupt
    pub fn stop_drawing(&mut self, device: &mut dyn Device) {
        self.drawing_allowed = false;
        self.disable_interrupts(device);
        Self::set_drawing_enabled(device, false);
    }

    /// Whether the VIP is drawing
    #[must_use]
    pub fn is_drawing_enabled(device: &dyn Device) -> bool {
        DrawingStatus::from_bits_truncate(device.read_register(Register::XpStts)).contains(DrawingStatus::XPEN)
    }

    fn set_drawing_enabled(device: &mut dyn Device, enabled: bool) {
        let mut control = DrawingStatus::from_bits_truncate(device.read_register(Register::XpStts));
        control.set(DrawingStatus::XPEN, enabled);
        device.write_register(Register::XpCtrl, (control & (DrawingStatus::XPEN | DrawingStatus::XPRST)).bits());
    }

    /// Turn the display on with the column table unlocked
    pub fn start_displaying(&self, device: &mut dyn Device) {
        device.write_register(Register::Rest, 0);
        let control = (DisplayControl::SYNCE | DisplayControl::RE | DisplayControl::DISP) - DisplayControl::LOCK;
        device.write_register(Register::DpCtrl, control.bits());
    }

    /// Turn the display off
    pub fn stop_displaying(&self, device: &mut dyn Device) {
        device.write_register(Register::Rest, 0);
        device.write_register(Register::DpCtrl, 0);
    }

    /// Draw one game frame every `2^frame_cycle` display frames
    pub fn set_frame_cycle(&mut self, device: &mut dyn Device, frame_cycle: u8) {
        let frame_cycle = frame_cycle.min(MAX_FRAME_CYCLE);

        self.game_frame_duration = FRAME_MILLISECONDS << frame_cycle;
        device.write_register(Register::FrmCyc, u16::from(frame_cycle));
    }

    /// Milliseconds per game frame
    #[must_use]
    pub const fn game_frame_duration(&self) -> u32 {
        self.game_frame_duration
    }

    /// Load the palette registers
    pub fn configure_palettes(&self, device: &mut dyn Device, palettes: &PaletteConfig) {
        for (register, value) in Register::GPLT.into_iter().zip(palettes.bgmap) {
            device.write_register(register, value);
        }

        for (register, value) in Register::JPLT.into_iter().zip(palettes.object) {
            device.write_register(register, value);
        }
    }

    /// Load the brightness registers
    ///
    /// `BRTC` holds what the bright shade adds on top of the other two.
    pub fn configure_brightness(&self, device: &mut dyn Device, brightness: &Brightness) {
        device.write_register(Register::BrtA, brightness.dark);
        device.write_register(Register::BrtB, brightness.medium);
        device.write_register(
            Register::BrtC,
            brightness.bright.wrapping_sub(brightness.medium.wrapping_add(brightness.dark)),
        );
    }

    /// Default brightness
    pub fn up_brightness(&self, device: &mut dyn Device) {
        device.write_register(Register::BrtA, 32);
        device.write_register(Register::BrtB, 64);
        device.write_register(Register::BrtC, 32);
    }

    /// All shades black
    pub fn lower_brightness(&self, device: &mut dyn Device) {
        device.write_register(Register::BrtA, 0);
        device.write_register(Register::BrtB, 0);
        device.write_register(Register::BrtC, 0);
    }

    /// Set the background color, clamped to the last shade
    pub fn set_background_color(&self, device: &mut dyn Device, color: u16) {
        device.write_register(Register::BkCol, color.min(MAX_BACKGROUND_COLOR));
    }

    /// Block row the VIP is drawing, if it reports one
    #[must_use]
    pub fn current_block_being_drawn(&self, device: &dyn Device) -> Option<u16> {
        let status = DrawingStatus::from_bits_retain(device.read_register(Register::XpStts));

        if status.contains(DrawingStatus::SBOUT) {
            return Some(status.block_count());
        }

        None
    }

    /// Register an effect run before the existing ones are
    pub fn push_front_post_processing_effect(&mut self, key: EffectKey, effect: PostProcessingEffect) {
        if let Some(registry) = self.find_effect(key) {
            registry.remove = false;
            return;
        }

        self.post_processing_effects.insert(0, PostProcessingEffectRegistry { key, effect, remove: false });
    }

    /// Register an effect run after the existing ones are
    pub fn push_back_post_processing_effect(&mut self, key: EffectKey, effect: PostProcessingEffect) {
        if let Some(registry) = self.find_effect(key) {
            registry.remove = false;
            return;
        }

        self.post_processing_effects.push(PostProcessingEffectRegistry { key, effect, remove: false });
    }

    /// Drop an effect at the next XPEND
    pub fn remove_post_processing_effect(&mut self, key: EffectKey) {
        if let Some(registry) = self.find_effect(key) {
            registry.remove = true;
        }
    }

    /// Drop every effect now
    pub fn remove_post_processing_effects(&mut self) {
        self.post_processing_effects.clear();
    }

    /// Number of registered effects, including those pending removal
    #[must_use]
    pub fn post_processing_effects(&self) -> usize {
        self.post_processing_effects.len()
    }

    fn find_effect(&mut self, key: EffectKey) -> Option<&mut PostProcessingEffectRegistry> {
        self.post_processing_effects.iter_mut().find(|registry| registry.key == key)
    }

    /// Interrupt being serviced, empty outside the handler
    #[must_use]
    pub const fn current_interrupt(&self) -> Interrupt {
        self.current_interrupt
    }

    /// Frame buffer set being drawn: 0 or 0x8000
    #[must_use]
    pub const fn current_drawing_frame_buffer_set(&self) -> u16 {
        self.current_drawing_frame_buffer_set
    }

    /// Whether GAMESTART is being serviced
    #[must_use]
    pub const fn is_processing_game_start(&self) -> bool {
        self.processing_game_start
    }

    /// Whether XPEND is being serviced
    #[must_use]
    pub const fn is_processing_xpend(&self) -> bool {
        self.processing_xpend
    }

    /// Whether the last drawing pass has been flushed
    #[must_use]
    pub const fn has_drawing_ended(&self) -> bool {
        self.drawing_ended
    }

    /// Occurrence counters
    #[must_use]
    pub const fn counters(&self) -> &VipCounters {
        &self.counters
    }

    /// Clock advanced by FRAMESTART
    #[must_use]
    pub const fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Events fired by the pipeline
    ///
    /// Each FRAMESTART delivers the queued events to their handlers, so
    /// only the current frame's events are pending.
    #[must_use]
    pub const fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Mutable access to the events, to register handlers
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::VipConfig;
    use crate::core::error::ResourceExhausted;
    use crate::events::{Event, EventHandler};
    use crate::hardware::MemoryDevice;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Hook {
        GameStart,
        Xpend,
    }

    /// Records every hook with the interrupts enabled at that point
    #[derive(Default)]
    struct RecordingPipeline {
        hooks: Vec<(Hook, Interrupt)>,
        raise_during_game_start: Interrupt,
        fail_game_start: bool,
    }

    impl FramePipeline for RecordingPipeline {
        fn game_start(&mut self, device: &mut dyn Device) -> EngineResult<()> {
            let enabled = Interrupt::from_bits_truncate(device.read_register(Register::IntEnb));
            self.hooks.push((Hook::GameStart, enabled));

            if !self.raise_during_game_start.is_empty() {
                let pending = device.read_register(Register::IntPnd) | self.raise_during_game_start.bits();
                device.write_register(Register::IntPnd, pending);
            }

            if self.fail_game_start {
                return Err(ResourceExhausted::OutOfRenderLayers { requested: 40, available: 32 }.into());
            }

            Ok(())
        }

        fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()> {
            let enabled = Interrupt::from_bits_truncate(device.read_register(Register::IntEnb));
            self.hooks.push((Hook::Xpend, enabled));
            Ok(())
        }
    }

    fn manager(policy: MultiplexedInterrupts) -> VipManager {
        let config = EngineConfig::new()
            .with_fail_fast(false)
            .with_vip(VipConfig::new().with_multiplexed_interrupts(policy));
        VipManager::new(&config)
    }

    fn fault_bits() -> Interrupt {
        Interrupt::FRAMESTART | Interrupt::TIMEERR | Interrupt::SCANERR
    }

    #[test]
    fn test_combined_game_start_and_xpend() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline::default();
        vip.start_drawing(&mut device);

        device.raise(Interrupt::GAMESTART | Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut pipeline);

        // Both arrived together, so neither re-enables the other mid-handler
        assert_eq!(pipeline.hooks, vec![(Hook::GameStart, Interrupt::empty()), (Hook::Xpend, Interrupt::empty())]);
        assert_eq!(vip.counters().game_start_during_xpend, 0);
        assert_eq!(vip.counters().xpend_during_game_start, 0);
        assert_eq!(device.enabled(), Interrupt::GAMESTART | Interrupt::XPEND | fault_bits());
        assert!(device.pending().is_empty());
        assert!(vip.has_drawing_ended());
        assert!(vip.current_interrupt().is_empty());
        assert!(device.is_drawing_enabled());
    }

    #[test]
    fn test_game_start_enables_xpend() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline::default();

        device.raise(Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut pipeline);

        assert_eq!(pipeline.hooks, vec![(Hook::GameStart, Interrupt::XPEND | fault_bits())]);
        assert!(!vip.has_drawing_ended());
    }

    #[test]
    fn test_xpend_enables_game_start_and_suspends_drawing() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        vip.start_drawing(&mut device);

        struct DrawingProbe(Vec<bool>);

        impl FramePipeline for DrawingProbe {
            fn game_start(&mut self, _device: &mut dyn Device) -> EngineResult<()> {
                Ok(())
            }

            fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()> {
                self.0.push(VipManager::is_drawing_enabled(device));
                assert_eq!(
                    Interrupt::from_bits_truncate(device.read_register(Register::IntEnb)),
                    Interrupt::GAMESTART | fault_bits()
                );
                Ok(())
            }
        }

        let mut probe = DrawingProbe(Vec::new());
        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut probe);

        assert_eq!(probe.0, vec![false]);
        assert!(device.is_drawing_enabled());
    }

    #[test]
    fn test_nested_xpend_during_game_start_is_counted() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline { raise_during_game_start: Interrupt::XPEND, ..Default::default() };
        vip.start_drawing(&mut device);

        device.raise(Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut pipeline);

        assert_eq!(vip.counters().xpend_during_game_start, 1);
        assert_eq!(pipeline.hooks.iter().map(|(hook, _)| *hook).collect::<Vec<_>>(), vec![Hook::GameStart, Hook::Xpend]);
        assert!(vip.events().pending().iter().any(|event| event.event_type == EventType::XpendDuringGameStart));
        assert_eq!(device.enabled(), Interrupt::GAMESTART | Interrupt::XPEND | fault_bits());
        assert!(!vip.is_processing_game_start());
        assert!(!vip.is_processing_xpend());
    }

    #[test]
    fn test_unmultiplexed_xpend_is_flushed_after_game_start() {
        let mut vip = manager(MultiplexedInterrupts::None);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline { raise_during_game_start: Interrupt::XPEND, ..Default::default() };

        device.raise(Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut pipeline);

        // XPEND is never enabled, so it is serviced right after the game tick
        assert_eq!(pipeline.hooks, vec![(Hook::GameStart, Interrupt::empty()), (Hook::Xpend, Interrupt::empty())]);
        assert_eq!(vip.counters().xpend_during_game_start, 0);
        assert!(vip.has_drawing_ended());
    }

    #[test]
    fn test_game_start_during_xpend_is_counted() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();

        struct RaiseGameStart(u32);

        impl FramePipeline for RaiseGameStart {
            fn game_start(&mut self, _device: &mut dyn Device) -> EngineResult<()> {
                self.0 += 1;
                Ok(())
            }

            fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()> {
                let pending = device.read_register(Register::IntPnd) | Interrupt::GAMESTART.bits();
                device.write_register(Register::IntPnd, pending);
                Ok(())
            }
        }

        let mut pipeline = RaiseGameStart(0);
        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut pipeline);

        assert_eq!(pipeline.0, 1);
        assert_eq!(vip.counters().game_start_during_xpend, 1);
    }

    #[test]
    fn test_frame_start_ticks_clock() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline::default();

        for _ in 0..3 {
            device.raise(Interrupt::FRAMESTART);
            vip.interrupt_handler(&mut device, &mut pipeline);
        }

        assert_eq!(vip.counters().frames, 3);
        assert_eq!(vip.clock().milliseconds(), 60);
        assert!(pipeline.hooks.is_empty());
        // Earlier frames were delivered, only the latest is queued
        assert_eq!(vip.events().pending().len(), 1);
    }

    #[test]
    fn test_events_are_delivered_each_frame() {
        struct Tally(Rc<RefCell<Vec<EventType>>>);

        impl EventHandler for Tally {
            fn on_event(&mut self, event: &Event) -> bool {
                self.0.borrow_mut().push(event.event_type);
                false
            }
        }

        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline { fail_game_start: true, ..Default::default() };
        let seen = Rc::new(RefCell::new(Vec::new()));
        vip.events_mut().register_handler(EventType::ResourceExhausted, Box::new(Tally(Rc::clone(&seen))));
        vip.events_mut().register_handler(EventType::FrameStart, Box::new(Tally(Rc::clone(&seen))));
        vip.start_drawing(&mut device);

        for _ in 0..50 {
            device.raise(Interrupt::FRAMESTART | Interrupt::GAMESTART);
            vip.interrupt_handler(&mut device, &mut pipeline);
            device.raise(Interrupt::XPEND);
            vip.interrupt_handler(&mut device, &mut pipeline);

            // FRAMESTART, GAMESTART, the failure, XPEND
            assert_eq!(vip.events().pending().len(), 4);
        }

        let seen = seen.borrow();
        assert_eq!(seen.iter().filter(|&&event_type| event_type == EventType::FrameStart).count(), 49);
        assert_eq!(seen.iter().filter(|&&event_type| event_type == EventType::ResourceExhausted).count(), 49);
    }

    #[test]
    fn test_fault_interrupts_are_counted_not_fatal() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline::default();

        device.raise(Interrupt::TIMEERR | Interrupt::SCANERR);
        vip.interrupt_handler(&mut device, &mut pipeline);

        assert_eq!(vip.counters().time_errors, 1);
        assert_eq!(vip.counters().scan_errors, 1);

        let mut shipping = VipManager::new(&EngineConfig::new().with_shipping(true));
        device.raise(Interrupt::TIMEERR);
        shipping.interrupt_handler(&mut device, &mut pipeline);

        assert_eq!(shipping.counters().time_errors, 0);
        assert_eq!(device.enabled(), Interrupt::GAMESTART | Interrupt::XPEND | Interrupt::FRAMESTART);
    }

    #[test]
    fn test_pipeline_errors_are_reported() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline { fail_game_start: true, ..Default::default() };

        device.raise(Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut pipeline);

        let reported = vip.events().pending().iter().find(|event| event.event_type == EventType::ResourceExhausted);
        assert!(reported.is_some());
        assert!(matches!(
            EngineError::from(ResourceExhausted::OutOfRenderLayers { requested: 40, available: 32 }),
            EngineError::Resource(_)
        ));
    }

    #[test]
    fn test_custom_interrupts_stay_enabled() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        vip.enable_custom_interrupts(Interrupt::SBHIT);

        vip.enable_interrupts(&mut device, Interrupt::XPEND);

        assert_eq!(device.enabled(), Interrupt::XPEND | Interrupt::SBHIT | fault_bits());
    }

    #[test]
    fn test_frame_buffer_set_follows_xpbsy() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline::default();

        device.set_drawing_status(DrawingStatus::XPBSY1);
        device.raise(Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut pipeline);
        assert_eq!(vip.current_drawing_frame_buffer_set(), 0x8000);

        device.set_drawing_status(DrawingStatus::XPBSY0);
        device.raise(Interrupt::GAMESTART);
        vip.interrupt_handler(&mut device, &mut pipeline);
        assert_eq!(vip.current_drawing_frame_buffer_set(), 0);
    }

    #[test]
    fn test_post_processing_effects_run_tail_first_and_remove_lazily() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let mut pipeline = RecordingPipeline::default();
        let order = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second"] {
            let order = Rc::clone(&order);
            vip.push_back_post_processing_effect(
                EffectKey { name, owner: OwnerId(1) },
                Box::new(move |_device, _set| order.borrow_mut().push(name)),
            );
        }

        // Re-adding an existing effect keeps the original registration
        vip.push_front_post_processing_effect(EffectKey { name: "second", owner: OwnerId(1) }, Box::new(|_, _| {}));
        assert_eq!(vip.post_processing_effects(), 2);

        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut pipeline);
        assert_eq!(*order.borrow(), vec!["second", "first"]);

        vip.remove_post_processing_effect(EffectKey { name: "first", owner: OwnerId(1) });
        assert_eq!(vip.post_processing_effects(), 2);

        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut pipeline);
        assert_eq!(*order.borrow(), vec!["second", "first", "second"]);
        assert_eq!(vip.post_processing_effects(), 1);
    }

    #[test]
    fn test_effects_skipped_when_frame_started_during_xpend() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        let runs = Rc::new(RefCell::new(0));

        struct FrameStartDuringXpend;

        impl FramePipeline for FrameStartDuringXpend {
            fn game_start(&mut self, _device: &mut dyn Device) -> EngineResult<()> {
                Ok(())
            }

            fn xpend(&mut self, device: &mut dyn Device) -> EngineResult<()> {
                let pending = device.read_register(Register::IntPnd) | Interrupt::FRAMESTART.bits();
                device.write_register(Register::IntPnd, pending);
                Ok(())
            }
        }

        let counter = Rc::clone(&runs);
        vip.push_back_post_processing_effect(
            EffectKey { name: "fade", owner: OwnerId(2) },
            Box::new(move |_, _| *counter.borrow_mut() += 1),
        );

        // FRAMESTART is always enabled, so it nests while DRAM is written
        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut FrameStartDuringXpend);
        assert_eq!(*runs.borrow(), 0);
        assert_eq!(vip.counters().frames, 1);

        // A regular FRAMESTART clears the race
        device.raise(Interrupt::FRAMESTART);
        vip.interrupt_handler(&mut device, &mut RecordingPipeline::default());
        device.raise(Interrupt::XPEND);
        vip.interrupt_handler(&mut device, &mut RecordingPipeline::default());
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn test_display_and_drawing_control() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();

        vip.start_displaying(&mut device);
        assert_eq!(device.read_register(Register::DpCtrl), 0x0302);

        vip.stop_displaying(&mut device);
        assert_eq!(device.read_register(Register::DpCtrl), 0);

        vip.start_drawing(&mut device);
        assert!(device.is_drawing_enabled());
        assert_eq!(device.enabled(), Interrupt::XPEND | fault_bits());

        vip.suspend_drawing(&mut device);
        assert!(!device.is_drawing_enabled());
        vip.resume_drawing(&mut device);
        assert!(device.is_drawing_enabled());

        vip.stop_drawing(&mut device);
        assert!(!device.is_drawing_enabled());
        assert!(device.enabled().is_empty());
        vip.resume_drawing(&mut device);
        assert!(!device.is_drawing_enabled());
    }

    #[test]
    fn test_frame_cycle_is_clamped() {
        let mut vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();

        vip.set_frame_cycle(&mut device, 7);
        assert_eq!(device.read_register(Register::FrmCyc), 3);
        assert_eq!(vip.game_frame_duration(), 160);

        vip.set_frame_cycle(&mut device, 1);
        assert_eq!(vip.game_frame_duration(), 40);
    }

    #[test]
    fn test_brightness_palettes_and_background() {
        let vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();

        vip.configure_brightness(&mut device, &Brightness { dark: 16, medium: 48, bright: 128 });
        assert_eq!(device.read_register(Register::BrtA), 16);
        assert_eq!(device.read_register(Register::BrtB), 48);
        assert_eq!(device.read_register(Register::BrtC), 64);

        vip.up_brightness(&mut device);
        assert_eq!(device.read_register(Register::BrtB), 64);
        vip.lower_brightness(&mut device);
        assert_eq!(device.read_register(Register::BrtC), 0);

        vip.configure_palettes(&mut device, &PaletteConfig { bgmap: [0xE4, 0xE0, 0x90, 0x50], object: [0xE4; 4] });
        assert_eq!(device.read_register(Register::Gplt2), 0x90);
        assert_eq!(device.read_register(Register::Jplt3), 0xE4);

        vip.set_background_color(&mut device, 9);
        assert_eq!(device.read_register(Register::BkCol), 3);
    }

    #[test]
    fn test_current_block_being_drawn() {
        let vip = manager(MultiplexedInterrupts::All);
        let mut device = MemoryDevice::new();
        assert_eq!(vip.current_block_being_drawn(&device), None);

        device.set_drawing_status(DrawingStatus::SBOUT | DrawingStatus::XPBSY0 | DrawingStatus::from_bits_retain(5 << 8));
        assert_eq!(vip.current_block_being_drawn(&device), Some(5));
    }
}
