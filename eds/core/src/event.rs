//! Signals, event handles and the read-only event view handed to state handlers.

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type-safe event signal identifier
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signal(pub u16);

impl Signal {
    /// Empty event, never dispatched to user code
    pub const EMPTY: Signal = Signal(0);
    /// State entry action
    pub const ENTRY: Signal = Signal(1);
    /// State exit action
    pub const EXIT: Signal = Signal(2);
    /// Initial transition / first dispatch of a fresh EPA
    pub const INIT: Signal = Signal(3);
    /// Superstate query
    pub const SUPER: Signal = Signal(4);
    /// No-event continuation of a flowchart pseudostate
    pub const NOEX: Signal = Signal(5);

    /// First user-defined signal
    pub const USER: Signal = Signal(6);

    /// Create a new signal from a raw value
    pub const fn new(signal: u16) -> Self {
        Signal(signal)
    }

    /// Get the raw signal value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if this is one of the built-in control signals
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::USER.0
    }
}

impl From<u16> for Signal {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Signal::EMPTY => f.write_str("SIG_EMPTY"),
            Signal::ENTRY => f.write_str("SIG_ENTRY"),
            Signal::EXIT => f.write_str("SIG_EXIT"),
            Signal::INIT => f.write_str("SIG_INIT"),
            Signal::SUPER => f.write_str("SIG_SUPER"),
            Signal::NOEX => f.write_str("SIG_NOEX"),
            Signal(raw) => write!(f, "SIG({:#06x})", raw),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Signal {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Signal({})", self.0);
    }
}

/// Process id of a live EPA.
///
/// The index names a slot of the EPA table. The generation changes every
/// time that slot is vacated, so a pid kept past `destroy` stops resolving
/// instead of aliasing the next EPA built in the same slot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid {
    index: u16,
    generation: u16,
}

impl Pid {
    pub const fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> u16 {
        self.index
    }

    pub const fn generation(self) -> u16 {
        self.generation
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid:{}.{}", self.index, self.generation)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Pid {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "pid:{}.{}", self.index, self.generation);
    }
}

/// Event creation timestamp, as produced by the platform's time callback.
pub type Timestamp = u32;

/// Dynamic attributes of an event.
///
/// Packed the way the header byte is laid out on target:
/// bit 7 is the reserved flag, bit 6 the constant flag and bits 0..=5 hold
/// the number of queues currently referencing the event.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventAttr(u8);

impl EventAttr {
    /// Largest reference count the header can hold
    pub const MAX_REFS: u8 = 0x3f;

    const RESERVED: u8 = 0x80;
    const CONSTANT: u8 = 0x40;

    /// Attributes of a freshly allocated event: no references, not reserved
    pub const fn dynamic() -> Self {
        Self(0)
    }

    /// Attributes of a read-only event
    pub const fn constant() -> Self {
        Self(Self::CONSTANT)
    }

    pub const fn refs(self) -> u8 {
        self.0 & Self::MAX_REFS
    }

    pub const fn is_reserved(self) -> bool {
        self.0 & Self::RESERVED != 0
    }

    pub const fn is_constant(self) -> bool {
        self.0 & Self::CONSTANT != 0
    }

    pub fn set_reserved(&mut self, reserved: bool) {
        if reserved {
            self.0 |= Self::RESERVED;
        } else {
            self.0 &= !Self::RESERVED;
        }
    }

    /// Adds one queue reference. Returns `false` when the count is saturated.
    pub fn add_ref(&mut self) -> bool {
        if self.refs() == Self::MAX_REFS {
            return false;
        }
        self.0 += 1;
        true
    }

    /// Drops one queue reference. Returns `false` when there was none.
    pub fn release_ref(&mut self) -> bool {
        if self.refs() == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }

    /// True when nothing holds the event any more and its memory may go
    pub const fn is_releasable(self) -> bool {
        !self.is_constant() && !self.is_reserved() && self.refs() == 0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EventAttr {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "EventAttr{{ refs: {}, reserved: {}, constant: {} }}",
            self.refs(),
            self.is_reserved(),
            self.is_constant()
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Handle {
    Constant(Signal),
    Slot { index: u16, generation: u16 },
}

/// Copyable handle to an event.
///
/// Constant events are identified by their signal alone and never touch an
/// allocator. Dynamic events point at a generation-checked slot of the
/// kernel's event table, so a handle that outlives its event is detected
/// instead of aliasing a recycled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRef(Handle);

impl EventRef {
    /// Handle to a read-only event carrying only a signal
    pub const fn constant(signal: Signal) -> Self {
        Self(Handle::Constant(signal))
    }

    /// Handle to a slot of an event table
    pub const fn slot(index: u16, generation: u16) -> Self {
        Self(Handle::Slot { index, generation })
    }

    pub const fn is_constant(self) -> bool {
        matches!(self.0, Handle::Constant(_))
    }

    /// Signal of a constant event
    pub const fn constant_signal(self) -> Option<Signal> {
        match self.0 {
            Handle::Constant(signal) => Some(signal),
            Handle::Slot { .. } => None,
        }
    }

    /// `(index, generation)` of a dynamic event
    pub const fn slot_parts(self) -> Option<(u16, u16)> {
        match self.0 {
            Handle::Slot { index, generation } => Some((index, generation)),
            Handle::Constant(_) => None,
        }
    }
}

impl Default for EventRef {
    fn default() -> Self {
        Self::constant(Signal::EMPTY)
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Handle::Constant(signal) => write!(f, "const {}", signal),
            Handle::Slot { index, generation } => write!(f, "evt#{}.{}", index, generation),
        }
    }
}

/// Read-only view of an event during one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    signal: Signal,
    handle: EventRef,
    payload: &'a [u8],
    generator: Option<Pid>,
    timestamp: Option<Timestamp>,
}

impl Event<'static> {
    /// One of the built-in control events (`SIG_ENTRY`, `SIG_EXIT`, ...)
    pub const fn reserved(signal: Signal) -> Self {
        Self {
            signal,
            handle: EventRef::constant(signal),
            payload: &[],
            generator: None,
            timestamp: None,
        }
    }
}

impl<'a> Event<'a> {
    pub const fn new(signal: Signal, handle: EventRef, payload: &'a [u8]) -> Self {
        Self {
            signal,
            handle,
            payload,
            generator: None,
            timestamp: None,
        }
    }

    pub fn with_generator(mut self, generator: Option<Pid>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<Timestamp>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub const fn signal(&self) -> Signal {
        self.signal
    }

    /// Handle that can be used to forward or re-post this event
    pub const fn handle(&self) -> EventRef {
        self.handle
    }

    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// EPA that was executing when the event was created
    pub const fn generator(&self) -> Option<Pid> {
        self.generator
    }

    pub const fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }
}
