//! Event system following Game Engine Architecture Ch 16.8
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queuing support (immediate + deferred delivery)
//!
//! The collision arena and the VIP pipeline fire into an [`EventSystem`];
//! the game drains it once per frame with [`EventSystem::dispatch`].

use crate::foundation::collections::{OwnerId, ShapeId};
use std::collections::HashMap;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A shape was destroyed
    ShapeDeleted,
    /// A shape was enabled or disabled
    ShapeChanged,
    /// Two shapes started overlapping
    CollisionEnter,
    /// Two shapes stopped overlapping
    CollisionExit,
    /// The display started a new refresh
    FrameStart,
    /// The drawing process started
    GameStart,
    /// GAMESTART arrived while XPEND was being serviced
    GameStartDuringXpend,
    /// The drawing process finished
    Xpend,
    /// XPEND arrived while GAMESTART was being serviced
    XpendDuringGameStart,
    /// The drawing process overran its frame
    TimeError,
    /// The display scan failed
    ScanError,
    /// A hardware resource ran out
    ResourceExhausted,
}

/// Variant for type-safe event arguments
/// Uses key-value pairs to avoid order dependency problems
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Shape handle
    Shape(ShapeId),
    /// Owner of a shape or sprite
    Owner(OwnerId),
    /// Interrupt bitmask
    Interrupt(u16),
    /// Counter value
    Count(u32),
    /// Free-form description
    Message(String),
}

/// Event with type ID and key-value arguments
#[derive(Debug, Clone)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Timestamp when event was created (seconds)
    pub timestamp: f64,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event with the given type and timestamp
    #[must_use]
    pub fn new(event_type: EventType, timestamp: f64) -> Self {
        Self { event_type, timestamp, args: HashMap::new() }
    }

    /// Add an argument to the event (builder pattern)
    #[must_use]
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    #[must_use]
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get the `shape` argument if present
    #[must_use]
    pub fn get_shape(&self) -> Option<ShapeId> {
        if let Some(EventArg::Shape(id)) = self.get_arg("shape") {
            Some(*id)
        } else {
            None
        }
    }

    /// Get the `other` shape argument if present
    #[must_use]
    pub fn get_other_shape(&self) -> Option<ShapeId> {
        if let Some(EventArg::Shape(id)) = self.get_arg("other") {
            Some(*id)
        } else {
            None
        }
    }

    /// Get the `interrupt` argument if present
    #[must_use]
    pub fn get_interrupt(&self) -> Option<u16> {
        if let Some(EventArg::Interrupt(bits)) = self.get_arg("interrupt") {
            Some(*bits)
        } else {
            None
        }
    }

    /// Get the `count` argument if present
    #[must_use]
    pub fn get_count(&self) -> Option<u32> {
        if let Some(EventArg::Count(count)) = self.get_arg("count") {
            Some(*count)
        } else {
            None
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
pub struct EventSystem {
    immediate_queue: Vec<Event>,
    deferred_queue: Vec<(f64, Event)>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
    current_time: f64,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("immediate", &self.immediate_queue.len())
            .field("deferred", &self.deferred_queue.len())
            .field("handler_types", &self.handlers.len())
            .finish()
    }
}

impl EventSystem {
    /// Create a new empty event system
    #[must_use]
    pub fn new() -> Self {
        Self {
            immediate_queue: Vec::new(),
            deferred_queue: Vec::new(),
            handlers: HashMap::new(),
            current_time: 0.0,
        }
    }

    /// Update current time (seconds since start)
    pub fn update_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Current time (seconds since start)
    #[must_use]
    pub const fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Send event for handling at the next dispatch
    pub fn send(&mut self, event: Event) {
        self.immediate_queue.push(event);
    }

    /// Build and send an event stamped with the current time
    pub fn fire(&mut self, event_type: EventType, args: impl IntoIterator<Item = (&'static str, EventArg)>) {
        let event = args
            .into_iter()
            .fold(Event::new(event_type, self.current_time), |event, (key, value)| event.with_arg(key, value));

        self.send(event);
    }

    /// Post event for deferred delivery at specified time
    pub fn post(&mut self, delivery_time: f64, event: Event) {
        self.deferred_queue.push((delivery_time, event));
    }

    /// Events waiting for the next dispatch
    #[must_use]
    pub fn pending(&self) -> &[Event] {
        &self.immediate_queue
    }

    /// Dispatch all pending events
    /// Processes immediate queue first, then due deferred events
    pub fn dispatch(&mut self) {
        let immediate = std::mem::take(&mut self.immediate_queue);
        for event in immediate {
            self.dispatch_event(&event);
        }

        let mut i = 0;
        while i < self.deferred_queue.len() {
            if self.deferred_queue[i].0 <= self.current_time {
                let (_, event) = self.deferred_queue.remove(i);
                self.dispatch_event(&event);
            } else {
                i += 1;
            }
        }
    }

    /// Dispatch single event to registered handlers
    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Clear all queued events (useful for state transitions)
    pub fn clear(&mut self) {
        self.immediate_queue.clear();
        self.deferred_queue.clear();
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
