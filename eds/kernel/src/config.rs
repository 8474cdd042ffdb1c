//! Kernel and EPA configuration.

use core::fmt;

use alloc::sync::Arc;

use eds_core::{Priority, Timestamp};
use eds_hsm::MAX_STATE_DEPTH;
use eds_mem::{HeapClass, MemoryClassRef};

/// Byte budget of the default event class
pub const DEFAULT_EVENT_HEAP: usize = 4 * 1024;

/// Kernel sizing and hooks.
#[derive(Clone)]
pub struct KernelConfig {
    pub name: &'static str,
    /// Entries in the EPA table
    pub max_epas: u16,
    /// Slots in the event table
    pub max_events: u16,
    /// Record the executing EPA in every new event
    pub stamp_generator: bool,
    /// Clock read when an event is created
    pub timestamp: Option<fn() -> Timestamp>,
    /// Called by [`Kernel::run`](crate::Kernel::run) whenever nothing is ready
    pub idle_callback: Option<fn()>,
    /// Class used by [`Kernel::create_event`](crate::Kernel::create_event)
    pub event_class: Option<MemoryClassRef>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "EDS",
            max_epas: 16,
            max_events: 64,
            stamp_generator: true,
            timestamp: None,
            idle_callback: None,
            event_class: None,
        }
    }
}

impl KernelConfig {
    pub fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder::default()
    }

    /// The configured event class, or a heap class of
    /// [`DEFAULT_EVENT_HEAP`] bytes
    pub(crate) fn take_event_class(&mut self) -> MemoryClassRef {
        self.event_class
            .get_or_insert_with(|| Arc::new(HeapClass::new(DEFAULT_EVENT_HEAP)))
            .clone()
    }
}

impl fmt::Debug for KernelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelConfig")
            .field("name", &self.name)
            .field("max_epas", &self.max_epas)
            .field("max_events", &self.max_events)
            .field("stamp_generator", &self.stamp_generator)
            .field("timestamp", &self.timestamp.is_some())
            .field("idle_callback", &self.idle_callback.is_some())
            .field("event_class", &self.event_class.as_ref().map(|c| c.name()))
            .finish()
    }
}

/// Builder for [`KernelConfig`].
#[derive(Debug, Clone, Default)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub fn max_epas(mut self, max: u16) -> Self {
        self.config.max_epas = max;
        self
    }

    pub fn max_events(mut self, max: u16) -> Self {
        self.config.max_events = max;
        self
    }

    pub fn stamp_generator(mut self, enabled: bool) -> Self {
        self.config.stamp_generator = enabled;
        self
    }

    pub fn timestamp(mut self, now: fn() -> Timestamp) -> Self {
        self.config.timestamp = Some(now);
        self
    }

    pub fn idle_callback(mut self, callback: fn()) -> Self {
        self.config.idle_callback = Some(callback);
        self
    }

    pub fn event_class(mut self, class: MemoryClassRef) -> Self {
        self.config.event_class = Some(class);
        self
    }

    pub fn build(self) -> KernelConfig {
        self.config
    }
}

/// Static description of one EPA.
///
/// ```
/// use eds_kernel::EpaDef;
///
/// static BLINKY: EpaDef = EpaDef::new("blinky", 3, 8).with_max_depth(4);
/// assert_eq!(BLINKY.priority.raw(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpaDef {
    pub name: &'static str,
    pub priority: Priority,
    /// Event queue slots, fixed for the lifetime of the EPA
    pub queue_capacity: usize,
    /// State nesting limit, at most [`MAX_STATE_DEPTH`]
    pub max_depth: usize,
}

impl EpaDef {
    /// Priority 0 is rejected, at compile time when used in a `static`.
    pub const fn new(name: &'static str, priority: u8, queue_capacity: usize) -> Self {
        assert!(priority != 0, "priority 0 is reserved for idle");
        Self {
            name,
            priority: Priority::new_unchecked(priority),
            queue_capacity,
            max_depth: MAX_STATE_DEPTH,
        }
    }

    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
