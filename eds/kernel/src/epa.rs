//! Event processing agents.

use alloc::boxed::Box;

use eds_core::{Event, EventRef, Pid, Priority, RingBuffer};
use eds_hsm::{Dispatch, Hsm, StateMachine};
use eds_mem::{Block, MemoryClassRef};
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::Kernel;

/// Object-safe view of an EPA's state machine used by the scheduler.
pub trait Agent: Send {
    fn dispatch(&mut self, kernel: &Kernel, event: &Event<'_>) -> Dispatch;
}

impl<M> Agent for Hsm<M>
where
    M: StateMachine<Context = Kernel> + Send,
    M::State: Send,
{
    fn dispatch(&mut self, kernel: &Kernel, event: &Event<'_>) -> Dispatch {
        Hsm::dispatch(self, kernel, event)
    }
}

pub(crate) type EventQueue = RingBuffer<EventRef, Box<[EventRef]>>;

/// Block charged to a memory class for the lifetime of an EPA
pub(crate) struct Footprint {
    block: Block,
    class: MemoryClassRef,
}

impl Footprint {
    pub fn new(block: Block, class: MemoryClassRef) -> Self {
        Self { block, class }
    }

    pub fn release(self) {
        self.class.deallocate(self.block);
    }
}

/// Scheduler-side record of a live EPA
pub(crate) struct EpaRecord {
    pub name: &'static str,
    pub priority: Priority,
    pub queue: EventQueue,
    pub footprint: Option<Footprint>,
}

impl EpaRecord {
    pub fn new(name: &'static str, priority: Priority, capacity: usize) -> Self {
        Self {
            name,
            priority,
            queue: RingBuffer::new(alloc::vec![EventRef::default(); capacity].into_boxed_slice()),
            footprint: None,
        }
    }

    pub fn info(&self, pid: Pid) -> EpaInfo {
        EpaInfo {
            pid,
            name: self.name,
            priority: self.priority,
            capacity: self.queue.capacity(),
            queued: self.queue.occupied(),
            min_free: self.queue.min_free(),
        }
    }
}

/// Snapshot of one live EPA.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpaInfo {
    pub pid: Pid,
    pub name: &'static str,
    pub priority: Priority,
    pub capacity: usize,
    /// Events waiting in the queue
    pub queued: usize,
    /// Lowest free space the queue ever had
    pub min_free: usize,
}

impl EpaInfo {
    pub fn free(&self) -> usize {
        self.capacity - self.queued
    }
}
