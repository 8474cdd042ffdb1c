//! Event table.
//!
//! Dynamic events live in a fixed arena of slots. A slot carries the event
//! header (signal, attributes, generator, timestamp) and a shared handle to
//! the payload block. Handles are `(index, generation)` pairs; freeing a slot
//! bumps its generation, so a handle that outlived its event no longer
//! resolves.
//!
//! Reclaim rule: a slot is freed once its reference count is zero, it is not
//! reserved and no dispatch is reading it. Dropping the last payload handle
//! returns the block to the memory class it came from.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use eds_core::{eds_assert, EdsError, EdsResult, EventAttr, EventRef, Pid, Signal, Timestamp};
use eds_mem::{Block, MemoryClassRef};

/// Payload bytes of one event.
pub(crate) struct Payload {
    block: Option<(Block, MemoryClassRef)>,
}

impl Payload {
    pub(crate) const EMPTY: Payload = Payload { block: None };

    pub(crate) fn new(block: Block, class: MemoryClassRef) -> Self {
        Self {
            block: Some((block, class)),
        }
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        match &self.block {
            Some((block, _)) => block.as_slice(),
            None => &[],
        }
    }
}

impl Drop for Payload {
    fn drop(&mut self) {
        if let Some((block, class)) = self.block.take() {
            log::trace!("event: {} bytes back to {}", block.capacity(), class.name());
            class.deallocate(block);
        }
    }
}

pub(crate) struct EventEntry {
    pub signal: Signal,
    pub attr: EventAttr,
    pub generator: Option<Pid>,
    pub timestamp: Option<Timestamp>,
    pub payload: Arc<Payload>,
    /// Dispatches currently reading this event
    pub dispatching: u8,
}

impl EventEntry {
    pub fn new(
        signal: Signal,
        payload: Payload,
        generator: Option<Pid>,
        timestamp: Option<Timestamp>,
    ) -> Self {
        Self {
            signal,
            attr: EventAttr::dynamic(),
            generator,
            timestamp,
            payload: Arc::new(payload),
            dispatching: 0,
        }
    }

    fn is_collectable(&self) -> bool {
        self.attr.is_releasable() && self.dispatching == 0
    }
}

struct Slot {
    generation: u16,
    entry: Option<EventEntry>,
}

pub(crate) struct EventTable {
    slots: Box<[Slot]>,
    free: Vec<u16>,
}

impl EventTable {
    pub fn new(capacity: usize) -> Self {
        eds_assert!(capacity <= u16::MAX as usize, "event", "event table too large");
        let capacity = capacity.min(u16::MAX as usize);
        Self {
            slots: (0..capacity)
                .map(|_| Slot {
                    generation: 0,
                    entry: None,
                })
                .collect(),
            free: (0..capacity as u16).rev().collect(),
        }
    }

    /// Slots currently holding an event
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn insert(&mut self, entry: EventEntry) -> Result<EventRef, EventEntry> {
        let Some(index) = self.free.pop() else {
            return Err(entry);
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(entry);
        Ok(EventRef::slot(index, slot.generation))
    }

    pub fn get(&self, evt: EventRef) -> EdsResult<&EventEntry> {
        let (index, generation) = evt.slot_parts().ok_or(EdsError::StaleEvent)?;
        match self.slots.get(index as usize) {
            Some(Slot {
                generation: current,
                entry: Some(entry),
            }) if *current == generation => Ok(entry),
            _ => Err(EdsError::StaleEvent),
        }
    }

    pub fn get_mut(&mut self, evt: EventRef) -> EdsResult<&mut EventEntry> {
        let (index, generation) = evt.slot_parts().ok_or(EdsError::StaleEvent)?;
        match self.slots.get_mut(index as usize) {
            Some(Slot {
                generation: current,
                entry: Some(entry),
            }) if *current == generation => Ok(entry),
            _ => Err(EdsError::StaleEvent),
        }
    }

    /// Frees the slot unconditionally. The caller drops the returned entry,
    /// ideally outside any critical section.
    pub fn remove(&mut self, evt: EventRef) -> Option<EventEntry> {
        let (index, generation) = evt.slot_parts()?;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(entry)
    }

    /// Frees the slot if nothing holds the event any more.
    pub fn collect(&mut self, evt: EventRef) -> Option<EventEntry> {
        match self.get(evt) {
            Ok(entry) if entry.is_collectable() => self.remove(evt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eds_mem::{CountingClass, HeapClass};

    fn entry(signal: u16) -> EventEntry {
        EventEntry::new(Signal(signal), Payload::EMPTY, None, None)
    }

    #[test]
    fn insert_and_lookup() {
        let mut table = EventTable::new(2);
        let a = table.insert(entry(10)).ok().unwrap();
        let b = table.insert(entry(11)).ok().unwrap();
        assert_ne!(a, b);
        assert_eq!(table.live(), 2);
        assert_eq!(table.get(a).unwrap().signal, Signal(10));
        assert_eq!(table.get(b).unwrap().signal, Signal(11));
        assert!(table.insert(entry(12)).is_err(), "table is full");
    }

    #[test]
    fn freed_handle_goes_stale() {
        let mut table = EventTable::new(1);
        let old = table.insert(entry(10)).ok().unwrap();
        assert!(table.remove(old).is_some());
        assert_eq!(table.get(old).err(), Some(EdsError::StaleEvent));

        let new = table.insert(entry(20)).ok().unwrap();
        assert_eq!(new.slot_parts().unwrap().0, old.slot_parts().unwrap().0);
        assert_eq!(table.get(old).err(), Some(EdsError::StaleEvent));
        assert_eq!(table.get(new).unwrap().signal, Signal(20));
        assert!(table.remove(old).is_none());
    }

    #[test]
    fn constant_handles_never_resolve() {
        let table = EventTable::new(4);
        assert!(table.get(EventRef::constant(Signal::INIT)).is_err());
    }

    #[test]
    fn collect_respects_refs_reserve_and_dispatch() {
        let mut table = EventTable::new(1);
        let evt = table.insert(entry(10)).ok().unwrap();

        table.get_mut(evt).unwrap().attr.add_ref();
        assert!(table.collect(evt).is_none());
        table.get_mut(evt).unwrap().attr.release_ref();

        table.get_mut(evt).unwrap().attr.set_reserved(true);
        assert!(table.collect(evt).is_none());
        table.get_mut(evt).unwrap().attr.set_reserved(false);

        table.get_mut(evt).unwrap().dispatching = 1;
        assert!(table.collect(evt).is_none());
        table.get_mut(evt).unwrap().dispatching = 0;

        assert!(table.collect(evt).is_some());
        assert_eq!(table.live(), 0);
    }

    #[test]
    fn dropping_last_payload_handle_deallocates() {
        let counting = Arc::new(CountingClass::new(Arc::new(HeapClass::new(64))));
        let class: MemoryClassRef = counting.clone();
        let block = class.allocate(8).unwrap();

        let mut table = EventTable::new(1);
        let evt = table
            .insert(EventEntry::new(Signal(10), Payload::new(block, class), None, None))
            .ok()
            .unwrap();
        let reader = Arc::clone(&table.get(evt).unwrap().payload);
        assert_eq!(reader.bytes().len(), 8);

        drop(table.remove(evt));
        assert_eq!(counting.live(), 1, "reader still holds the payload");
        drop(reader);
        assert_eq!(counting.live(), 0);
        assert_eq!(counting.deallocations(), 1);
    }
}
