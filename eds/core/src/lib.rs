#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # EDS Core
//!
//! Allocation-free building blocks shared by every layer of the EDS active
//! object executive: signals and event views, priorities and the ready-set
//! bitmap, the bounded ring buffer underneath event queues, the index-linked
//! list used for registries, and the fatal assertion policy.

#[cfg(all(test, not(feature = "std")))]
extern crate std;

pub mod assert;
pub mod event;
pub mod list;
pub mod priority;
pub mod ready;
pub mod ring;

pub use event::*;
pub use list::{IndexList, NodeId};
pub use priority::*;
pub use ready::ReadySet;
pub use ring::RingBuffer;

/// EDS framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used by the fallible (non-fatal) EDS operations
pub type EdsResult<T> = Result<T, EdsError>;

/// Recoverable error conditions.
///
/// Programmer errors (double registration, full queues on a plain post, stale
/// event handles, ...) never show up here; they go through
/// [`eds_assert!`](crate::eds_assert) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EdsError {
    /// Memory class could not satisfy the request
    #[error("memory class exhausted")]
    OutOfMemory,
    /// Event queue has fewer free slots than requested
    #[error("event queue is full")]
    QueueFull,
    /// Priority outside 1..=255
    #[error("invalid priority level")]
    InvalidPriority,
    /// Priority slot already bound to another EPA
    #[error("priority {0} already in use")]
    PriorityInUse(u8),
    /// No live EPA matches the lookup
    #[error("no such EPA")]
    UnknownEpa,
    /// Event handle outlived its event
    #[error("stale event handle")]
    StaleEvent,
    /// EPA table has no free entry
    #[error("EPA table is full")]
    TooManyEpas,
    /// Event arena has no free slot
    #[error("event table is full")]
    EventTableFull,
}

#[cfg(feature = "defmt")]
impl defmt::Format for EdsError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            EdsError::OutOfMemory => defmt::write!(fmt, "OutOfMemory"),
            EdsError::QueueFull => defmt::write!(fmt, "QueueFull"),
            EdsError::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
            EdsError::PriorityInUse(prio) => defmt::write!(fmt, "PriorityInUse({})", prio),
            EdsError::UnknownEpa => defmt::write!(fmt, "UnknownEpa"),
            EdsError::StaleEvent => defmt::write!(fmt, "StaleEvent"),
            EdsError::TooManyEpas => defmt::write!(fmt, "TooManyEpas"),
            EdsError::EventTableFull => defmt::write!(fmt, "EventTableFull"),
        }
    }
}
