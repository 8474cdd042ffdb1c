#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # EDS Memory Classes
//!
//! The executive never manages memory itself. Events and EPAs are backed by
//! a *memory class*: a small allocate/deallocate capability chosen per object
//! at creation time. This crate defines that interface and three reference
//! classes sized once at start-up:
//!
//! - [`StaticClass`]: bump budget, nothing is ever given back.
//! - [`PoolClass`]: fixed-size blocks on a free list.
//! - [`HeapClass`]: variable-size blocks against a byte budget.
//!
//! [`CountingClass`] wraps any class and records every call, which is what
//! the reference-counting tests use to prove each event is released exactly
//! once.

extern crate alloc;

mod block;
mod classes;
mod counting;

pub use block::Block;
pub use classes::{HeapClass, PoolClass, StaticClass};
pub use counting::CountingClass;

use alloc::sync::Arc;

/// Shared handle to a memory class
pub type MemoryClassRef = Arc<dyn MemoryClass>;

/// Allocation strategy backing events and EPAs.
///
/// Implementations are called from inside the executive's critical sections
/// and must therefore be short and non-blocking.
pub trait MemoryClass: Send + Sync {
    /// Human-readable name for diagnostics
    fn name(&self) -> &'static str;

    /// Hands out a zeroed block of at least `size` bytes
    fn allocate(&self, size: usize) -> Option<Block>;

    /// Takes a block back. Blocks are moved in, so a block can be returned
    /// at most once.
    fn deallocate(&self, block: Block);

    /// Size of the underlying block, which may exceed the requested size
    fn block_size(&self, block: &Block) -> usize {
        block.capacity()
    }

    /// Usage statistics
    fn stats(&self) -> ClassStats;
}

/// Memory class statistics for debugging and monitoring.
///
/// Units are blocks for pools and bytes for budgeted classes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    /// Total capacity of the class
    pub total: usize,
    /// Capacity currently handed out
    pub used: usize,
    /// Minimum free capacity ever reached
    pub min_free: usize,
    /// Requests that could not be satisfied
    pub failures: usize,
}

impl ClassStats {
    /// Create new statistics
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            used: 0,
            min_free: total,
            failures: 0,
        }
    }

    pub const fn free(&self) -> usize {
        self.total - self.used
    }

    /// Update statistics after allocation
    pub fn on_alloc(&mut self, amount: usize) {
        self.used += amount;
        if self.free() < self.min_free {
            self.min_free = self.free();
        }
    }

    /// Update statistics after deallocation
    pub fn on_dealloc(&mut self, amount: usize) {
        self.used = self.used.saturating_sub(amount);
    }

    pub fn on_failure(&mut self) {
        self.failures += 1;
    }

    /// Get utilization as a percentage (0-100)
    pub fn utilization(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.used * 100) / self.total) as u8
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ClassStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "ClassStats{{ total: {}, used: {}, min_free: {}, failures: {} }}",
            self.total,
            self.used,
            self.min_free,
            self.failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_stats() {
        let mut stats = ClassStats::new(10);
        assert_eq!(stats.free(), 10);
        assert_eq!(stats.min_free, 10);

        stats.on_alloc(3);
        assert_eq!(stats.free(), 7);
        assert_eq!(stats.utilization(), 30);

        stats.on_dealloc(3);
        assert_eq!(stats.free(), 10);
        assert_eq!(stats.min_free, 7, "low-water mark sticks");
    }
}
