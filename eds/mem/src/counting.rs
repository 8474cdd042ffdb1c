use core::cell::RefCell;

use critical_section::Mutex;

use crate::{Block, ClassStats, MemoryClass, MemoryClassRef};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    allocations: usize,
    deallocations: usize,
    failures: usize,
    live_bytes: usize,
}

/// Instrumented wrapper recording every call made to the inner class.
pub struct CountingClass {
    inner: MemoryClassRef,
    counters: Mutex<RefCell<Counters>>,
}

impl CountingClass {
    pub fn new(inner: MemoryClassRef) -> Self {
        Self {
            inner,
            counters: Mutex::new(RefCell::new(Counters::default())),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Counters) -> R) -> R {
        critical_section::with(|cs| f(&self.counters.borrow_ref(cs)))
    }

    /// Blocks handed out and not yet returned
    pub fn live(&self) -> usize {
        self.read(|c| c.allocations - c.deallocations)
    }

    pub fn live_bytes(&self) -> usize {
        self.read(|c| c.live_bytes)
    }

    pub fn allocations(&self) -> usize {
        self.read(|c| c.allocations)
    }

    pub fn deallocations(&self) -> usize {
        self.read(|c| c.deallocations)
    }

    pub fn failures(&self) -> usize {
        self.read(|c| c.failures)
    }
}

impl MemoryClass for CountingClass {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn allocate(&self, size: usize) -> Option<Block> {
        let block = self.inner.allocate(size);
        critical_section::with(|cs| {
            let mut counters = self.counters.borrow_ref_mut(cs);
            match &block {
                Some(b) => {
                    counters.allocations += 1;
                    counters.live_bytes += b.len();
                }
                None => counters.failures += 1,
            }
        });
        block
    }

    fn deallocate(&self, block: Block) {
        critical_section::with(|cs| {
            let mut counters = self.counters.borrow_ref_mut(cs);
            counters.deallocations += 1;
            counters.live_bytes = counters.live_bytes.saturating_sub(block.len());
        });
        self.inner.deallocate(block);
    }

    fn block_size(&self, block: &Block) -> usize {
        self.inner.block_size(block)
    }

    fn stats(&self) -> ClassStats {
        self.inner.stats()
    }
}
