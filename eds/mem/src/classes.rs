//! Reference memory classes.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use critical_section::Mutex;
use eds_core::eds_assert;

use crate::{Block, ClassStats, MemoryClass};

fn zeroed(size: usize) -> Box<[u8]> {
    vec![0u8; size].into_boxed_slice()
}

/// Bump budget for objects that live until reset.
///
/// Blocks handed back are discarded without returning their budget, which
/// is exactly the behavior of a static arena on target.
pub struct StaticClass {
    stats: Mutex<RefCell<ClassStats>>,
}

impl StaticClass {
    /// Create a class able to hand out `capacity` bytes in total
    pub const fn new(capacity: usize) -> Self {
        Self {
            stats: Mutex::new(RefCell::new(ClassStats::new(capacity))),
        }
    }
}

impl MemoryClass for StaticClass {
    fn name(&self) -> &'static str {
        "static"
    }

    fn allocate(&self, size: usize) -> Option<Block> {
        critical_section::with(|cs| {
            let mut stats = self.stats.borrow_ref_mut(cs);
            if size > stats.free() {
                stats.on_failure();
                return None;
            }
            stats.on_alloc(size);
            Some(Block::new(zeroed(size), size))
        })
    }

    fn deallocate(&self, block: Block) {
        log::warn!("static class never frees, dropping {} bytes", block.capacity());
    }

    fn stats(&self) -> ClassStats {
        critical_section::with(|cs| *self.stats.borrow_ref(cs))
    }
}

struct PoolState {
    free: Vec<Box<[u8]>>,
    stats: ClassStats,
}

/// Fixed-size blocks on a free list, all allocated at construction.
pub struct PoolClass {
    block_size: usize,
    state: Mutex<RefCell<PoolState>>,
}

impl PoolClass {
    /// Create a pool of `count` blocks of `block_size` bytes each
    pub fn new(block_size: usize, count: usize) -> Self {
        let free = (0..count).map(|_| zeroed(block_size)).collect();
        Self {
            block_size,
            state: Mutex::new(RefCell::new(PoolState {
                free,
                stats: ClassStats::new(count),
            })),
        }
    }

    /// Size of every block in the pool
    pub fn fixed_size(&self) -> usize {
        self.block_size
    }
}

impl MemoryClass for PoolClass {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn allocate(&self, size: usize) -> Option<Block> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if size > self.block_size {
                state.stats.on_failure();
                return None;
            }
            match state.free.pop() {
                Some(mut bytes) => {
                    bytes.fill(0);
                    state.stats.on_alloc(1);
                    Some(Block::new(bytes, size))
                }
                None => {
                    state.stats.on_failure();
                    None
                }
            }
        })
    }

    fn deallocate(&self, block: Block) {
        let bytes = block.into_bytes();
        let fits = bytes.len() == self.block_size;
        eds_assert!(fits, "mem", "block returned to the wrong pool");
        if !fits {
            return;
        }
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.free.push(bytes);
            state.stats.on_dealloc(1);
        });
    }

    fn stats(&self) -> ClassStats {
        critical_section::with(|cs| self.state.borrow_ref(cs).stats)
    }
}

/// Variable-size blocks drawn against a byte budget.
///
/// The actual placement is left to the global allocator; the class enforces
/// the arena size and keeps the statistics a first-fit heap would.
pub struct HeapClass {
    stats: Mutex<RefCell<ClassStats>>,
}

impl HeapClass {
    /// Create a heap of `capacity` bytes
    pub const fn new(capacity: usize) -> Self {
        Self {
            stats: Mutex::new(RefCell::new(ClassStats::new(capacity))),
        }
    }
}

impl MemoryClass for HeapClass {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn allocate(&self, size: usize) -> Option<Block> {
        critical_section::with(|cs| {
            let mut stats = self.stats.borrow_ref_mut(cs);
            if size > stats.free() {
                stats.on_failure();
                return None;
            }
            stats.on_alloc(size);
            Some(Block::new(zeroed(size), size))
        })
    }

    fn deallocate(&self, block: Block) {
        critical_section::with(|cs| {
            self.stats.borrow_ref_mut(cs).on_dealloc(block.capacity());
        });
    }

    fn stats(&self) -> ClassStats {
        critical_section::with(|cs| *self.stats.borrow_ref(cs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_class_never_returns_budget() {
        let class = StaticClass::new(16);
        let a = class.allocate(10).expect("fits");
        assert!(class.allocate(10).is_none());
        class.deallocate(a);
        assert!(class.allocate(10).is_none());
        assert_eq!(class.stats().failures, 2);
    }

    #[test]
    fn pool_recycles_fixed_blocks() {
        let pool = PoolClass::new(8, 2);
        let mut a = pool.allocate(5).expect("first block");
        assert_eq!(a.len(), 5);
        assert_eq!(pool.block_size(&a), 8);
        a.as_mut_slice().copy_from_slice(&[1, 2, 3, 4, 5]);

        let b = pool.allocate(8).expect("second block");
        assert!(pool.allocate(1).is_none());
        assert!(pool.allocate(9).is_none(), "oversized request");

        pool.deallocate(a);
        let c = pool.allocate(3).expect("recycled block");
        assert_eq!(c.as_slice(), &[0, 0, 0], "recycled blocks are zeroed");

        pool.deallocate(b);
        pool.deallocate(c);
        let stats = pool.stats();
        assert_eq!(stats.used, 0);
        assert_eq!(stats.min_free, 0);
        assert_eq!(stats.failures, 2);
    }

    #[test]
    #[should_panic(expected = "eds assertion failed: mem: block returned to the wrong pool")]
    fn pool_rejects_foreign_block() {
        let pool = PoolClass::new(16, 2);
        pool.deallocate(Block::new(zeroed(8), 8));
    }

    #[test]
    fn heap_returns_budget() {
        let heap = HeapClass::new(32);
        let a = heap.allocate(20).expect("fits");
        assert!(heap.allocate(20).is_none());
        heap.deallocate(a);
        assert!(heap.allocate(20).is_some());
        assert_eq!(heap.stats().min_free, 12);
    }
}
