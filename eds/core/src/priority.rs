//! Priority levels of EPAs

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{EdsError, EdsResult};

/// Fixed scheduling priority of an EPA.
///
/// Numerically larger priorities are more urgent. Level 0 is reserved for
/// the idle point of the scheduler and is never assigned to an EPA.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// Minimum priority level (lowest priority)
    pub const MIN: Priority = Priority(1);

    /// Maximum priority level (highest priority)
    pub const MAX: Priority = Priority(u8::MAX);

    /// Idle level, below every EPA
    pub const IDLE: Priority = Priority(0);

    /// Number of distinct levels, idle included
    pub const LEVELS: usize = 256;

    /// Create a new priority level
    pub fn new(priority: u8) -> EdsResult<Self> {
        if priority == 0 {
            Err(EdsError::InvalidPriority)
        } else {
            Ok(Priority(priority))
        }
    }

    /// Create priority without validation (const fn)
    pub const fn new_unchecked(priority: u8) -> Self {
        Priority(priority)
    }

    /// Get the raw priority value
    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this priority may be assigned to an EPA
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Priority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}

/// Macro to create compile-time priority constants
#[macro_export]
macro_rules! priority {
    ($value:literal) => {
        $crate::Priority::new_unchecked($value)
    };
}
