//! Kernel facade: event lifecycle, EPA table and the fixed-priority scheduler.
//!
//! Everything the scheduler and interrupt handlers share (ready set,
//! priority map, queues, event table) lives in one [`KernelState`] behind a
//! `critical_section::Mutex`. Critical sections only flip bits, move handles
//! and adjust counters. State machines run outside of them, each behind its
//! own [`Lock`].

use core::cell::RefCell;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use critical_section::{CriticalSection, Mutex};
use eds_core::list::Node;
use eds_core::{
    eds_assert, eds_error, EdsError, EdsResult, Event, EventRef, IndexList, NodeId, Pid, Priority,
    ReadySet, Signal, Timestamp,
};
use eds_hsm::{Dispatch, Hsm, StateMachine};
use eds_mem::MemoryClassRef;
use log::{debug, info, trace, warn};

use crate::config::{EpaDef, KernelConfig};
use crate::epa::{Agent, EpaInfo, EpaRecord, Footprint};
use crate::event::{EventEntry, EventTable, Payload};
use crate::sync::Lock;

/// Scheduler status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Back,
    Front,
}

/// What is executing right now
#[derive(Debug, Clone, Copy)]
struct Cursor {
    priority: Priority,
    pid: Option<Pid>,
}

/// One event taken off a queue
struct Fetched {
    pid: Pid,
    evt: EventRef,
    signal: Signal,
    payload: Option<Arc<Payload>>,
    generator: Option<Pid>,
    timestamp: Option<Timestamp>,
}

struct KernelState {
    status: Status,
    ready: ReadySet,
    /// Priority level -> EPA bound to it
    slots: Box<[Option<Pid>]>,
    current: Cursor,
    epas: IndexList<EpaRecord, Box<[Node<EpaRecord>]>>,
    /// Bumped each time an EPA slot is vacated
    generations: Box<[u16]>,
    busy: Box<[bool]>,
    events: EventTable,
}

impl KernelState {
    fn new(max_epas: usize, max_events: usize) -> Self {
        Self {
            status: Status::Stopped,
            ready: ReadySet::new(),
            slots: alloc::vec![None; Priority::LEVELS].into_boxed_slice(),
            current: Cursor {
                priority: Priority::IDLE,
                pid: None,
            },
            epas: IndexList::new((0..max_epas).map(|_| Node::VACANT).collect()),
            generations: alloc::vec![0; max_epas].into_boxed_slice(),
            busy: alloc::vec![false; max_epas].into_boxed_slice(),
            events: EventTable::new(max_events),
        }
    }

    /// Table slot of `pid`, unless that EPA has been destroyed since
    fn node(&self, pid: Pid) -> Option<NodeId> {
        let generation = self.generations.get(usize::from(pid.index()))?;
        (*generation == pid.generation()).then(|| NodeId::new(pid.index()))
    }

    fn pid(&self, id: NodeId) -> Pid {
        let generation = self.generations.get(id.index()).copied().unwrap_or_default();
        Pid::new(id.index() as u16, generation)
    }

    fn record(&self, pid: Pid) -> EdsResult<&EpaRecord> {
        self.node(pid)
            .and_then(|id| self.epas.get(id))
            .ok_or(EdsError::UnknownEpa)
    }

    fn register(&mut self, record: EpaRecord) -> Result<Pid, (EdsError, EpaRecord)> {
        let prio = record.priority;
        let taken = self.slots[prio.index()].is_some();
        eds_assert!(!taken, "sched", "priority already in use");
        if taken {
            return Err((EdsError::PriorityInUse(prio.raw()), record));
        }

        let id = match self.epas.add_tail(record) {
            Ok(id) => id,
            Err(record) => {
                eds_error!("epa", "EPA table is full");
                return Err((EdsError::TooManyEpas, record));
            }
        };
        let pid = self.pid(id);
        self.slots[prio.index()] = Some(pid);
        Ok(pid)
    }

    fn unregister(&mut self, pid: Pid) -> EdsResult<EpaRecord> {
        let id = self.node(pid);
        let busy = id
            .and_then(|id| self.busy.get(id.index()).copied())
            .unwrap_or(false);
        eds_assert!(!busy, "epa", "EPA destroyed while dispatching");
        if busy {
            return Err(EdsError::UnknownEpa);
        }

        let record = id.and_then(|id| self.epas.remove(id));
        eds_assert!(record.is_some(), "epa", "destroy of an unknown EPA");
        let record = record.ok_or(EdsError::UnknownEpa)?;
        if let Some(generation) = self.generations.get_mut(usize::from(pid.index())) {
            *generation = generation.wrapping_add(1);
        }
        self.slots[record.priority.index()] = None;
        self.ready.remove(record.priority);
        Ok(record)
    }

    fn reprioritize(&mut self, pid: Pid, prio: Priority) -> EdsResult<()> {
        eds_assert!(prio.is_valid(), "sched", "priority 0 is reserved for idle");
        if !prio.is_valid() {
            return Err(EdsError::InvalidPriority);
        }

        let old = self.record(pid)?.priority;
        if old == prio {
            return Ok(());
        }
        let taken = self.slots[prio.index()].is_some();
        eds_assert!(!taken, "sched", "priority already in use");
        if taken {
            return Err(EdsError::PriorityInUse(prio.raw()));
        }

        let id = self.node(pid).ok_or(EdsError::UnknownEpa)?;
        let record = self.epas.get_mut(id).ok_or(EdsError::UnknownEpa)?;
        let was_ready = !record.queue.is_empty();
        record.priority = prio;
        self.ready.remove(old);
        self.slots[old.index()] = None;
        self.slots[prio.index()] = Some(pid);
        if was_ready {
            self.ready.insert(prio);
        }
        Ok(())
    }

    fn enqueue(&mut self, pid: Pid, evt: EventRef, end: End) -> EdsResult<()> {
        if !evt.is_constant() {
            let live = self.events.get(evt).is_ok();
            eds_assert!(live, "event", "stale event handle");
            if !live {
                return Err(EdsError::StaleEvent);
            }
        }

        let record = self.node(pid).and_then(|id| self.epas.get_mut(id));
        eds_assert!(record.is_some(), "event", "post to an unknown EPA");
        let record = record.ok_or(EdsError::UnknownEpa)?;
        let queued = match end {
            End::Back => record.queue.put(evt),
            End::Front => record.queue.put_ahead(evt),
        };
        eds_assert!(queued.is_ok(), "event", "event queue overflow");
        queued.map_err(|_| EdsError::QueueFull)?;

        let prio = record.priority;
        if let Ok(entry) = self.events.get_mut(evt) {
            let counted = entry.attr.add_ref();
            eds_assert!(counted, "event", "reference count overflow");
        }
        self.ready.insert(prio);
        trace!("post {} to {} ({:?})", evt, pid, end);
        Ok(())
    }

    /// Takes the next event of the highest ready EPA above `floor`.
    fn fetch_above(&mut self, floor: Priority) -> Option<Fetched> {
        let prio = self.ready.highest().filter(|&p| p > floor)?;
        let Some(pid) = self.slots[prio.index()] else {
            eds_error!("sched", "ready priority without an EPA");
            self.ready.remove(prio);
            return None;
        };
        let busy = self.busy.get_mut(usize::from(pid.index()))?;
        // an EPA whose priority was raised mid-dispatch waits for the outer loop
        if *busy {
            return None;
        }

        let record = self.epas.get_mut(NodeId::new(pid.index()))?;
        let evt = record.queue.get();
        if record.queue.is_empty() {
            self.ready.remove(prio);
        }
        let evt = evt?;

        let fetched = match evt.constant_signal() {
            Some(signal) => Fetched {
                pid,
                evt,
                signal,
                payload: None,
                generator: None,
                timestamp: None,
            },
            None => {
                let Ok(entry) = self.events.get_mut(evt) else {
                    eds_error!("event", "stale event in queue");
                    return None;
                };
                entry.attr.release_ref();
                entry.dispatching = entry.dispatching.saturating_add(1);
                Fetched {
                    pid,
                    evt,
                    signal: entry.signal,
                    payload: Some(Arc::clone(&entry.payload)),
                    generator: entry.generator,
                    timestamp: entry.timestamp,
                }
            }
        };

        *busy = true;
        self.current = Cursor {
            priority: prio,
            pid: Some(pid),
        };
        Some(fetched)
    }

    /// Applies the dispatch outcome and hands back a freed event, if any.
    fn finish(&mut self, fetched: &Fetched, outcome: Dispatch, saved: Cursor) -> Option<EventEntry> {
        match outcome {
            Dispatch::Deferred => {
                let _ = self.enqueue(fetched.pid, fetched.evt, End::Back);
            }
            Dispatch::Continue => {
                let _ = self.enqueue(fetched.pid, EventRef::constant(Signal::NOEX), End::Front);
            }
            Dispatch::Handled | Dispatch::Ignored | Dispatch::Transitioned => {}
        }

        if let Some(busy) = self.busy.get_mut(usize::from(fetched.pid.index())) {
            *busy = false;
        }
        self.current = saved;

        if let Ok(entry) = self.events.get_mut(fetched.evt) {
            entry.dispatching = entry.dispatching.saturating_sub(1);
        }
        self.events.collect(fetched.evt)
    }
}

/// The executive.
///
/// Handlers receive `&Kernel` as their context and use it to create and
/// post events. Posting from task level runs every EPA that became ready
/// above the current priority before returning, which is what makes a
/// higher-priority EPA preempt the one that posted to it.
pub struct Kernel {
    config: KernelConfig,
    event_class: MemoryClassRef,
    state: Mutex<RefCell<KernelState>>,
    agents: Box<[Lock<Option<Box<dyn Agent>>>]>,
}

impl Kernel {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(mut config: KernelConfig) -> Self {
        let event_class = config.take_event_class();
        let max_epas = (config.max_epas as usize).min(u16::MAX as usize - 1);
        let max_events = config.max_events as usize;
        info!(
            "kernel {}: {} EPAs, {} events, event class {}",
            config.name,
            max_epas,
            max_events,
            event_class.name()
        );

        Self {
            state: Mutex::new(RefCell::new(KernelState::new(max_epas, max_events))),
            agents: (0..max_epas).map(|_| Lock::new(None)).collect(),
            event_class,
            config,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut KernelState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    // ---- EPA lifecycle ----

    /// Creates an EPA running `machine` and queues its `SIG_INIT`.
    pub fn construct<M>(&self, def: &EpaDef, machine: M) -> EdsResult<Pid>
    where
        M: StateMachine<Context = Kernel> + Send + 'static,
        M::State: Send + 'static,
    {
        let agent = Box::new(Hsm::with_max_depth(machine, def.max_depth));
        self.install(def, None, agent)
    }

    /// Like [`construct`](Self::construct), charging the EPA's footprint to
    /// `class` until it is destroyed.
    pub fn construct_in<M>(&self, def: &EpaDef, class: &MemoryClassRef, machine: M) -> EdsResult<Pid>
    where
        M: StateMachine<Context = Kernel> + Send + 'static,
        M::State: Send + 'static,
    {
        let size = core::mem::size_of::<Hsm<M>>()
            + def.queue_capacity * core::mem::size_of::<EventRef>();
        let block = class.allocate(size);
        eds_assert!(block.is_some(), "epa", "memory class exhausted");
        let block = block.ok_or(EdsError::OutOfMemory)?;

        let agent = Box::new(Hsm::with_max_depth(machine, def.max_depth));
        self.install(def, Some(Footprint::new(block, Arc::clone(class))), agent)
    }

    fn install(
        &self,
        def: &EpaDef,
        footprint: Option<Footprint>,
        agent: Box<dyn Agent>,
    ) -> EdsResult<Pid> {
        eds_assert!(def.priority.is_valid(), "epa", "priority 0 is reserved for idle");
        eds_assert!(def.queue_capacity > 0, "epa", "queue capacity must be positive");
        if !def.priority.is_valid() || def.queue_capacity == 0 {
            if let Some(footprint) = footprint {
                footprint.release();
            }
            return Err(EdsError::InvalidPriority);
        }

        let mut record = EpaRecord::new(def.name, def.priority, def.queue_capacity);
        record.footprint = footprint;
        let pid = match self.with_state(|st| st.register(record)) {
            Ok(pid) => pid,
            Err((err, record)) => {
                if let Some(footprint) = record.footprint {
                    footprint.release();
                }
                return Err(err);
            }
        };

        if let Some(slot) = self.agents.get(usize::from(pid.index())) {
            *slot.lock() = Some(agent);
        }
        debug!("epa {} constructed: {} priority {}", def.name, pid, def.priority);

        self.post_ahead(pid, EventRef::constant(Signal::INIT));
        Ok(pid)
    }

    /// Unregisters the EPA, drops its queued events and releases its memory.
    pub fn destroy(&self, pid: Pid) -> EdsResult<()> {
        let mut record = self.with_state(|st| st.unregister(pid))?;
        while let Some(evt) = record.queue.get() {
            self.release(evt);
        }
        if let Some(slot) = self.agents.get(usize::from(pid.index())) {
            drop(slot.lock().take());
        }
        if let Some(footprint) = record.footprint.take() {
            footprint.release();
        }
        debug!("epa {} destroyed: {}", record.name, pid);
        Ok(())
    }

    /// Moves the EPA to another priority level in one critical section.
    pub fn set_priority(&self, pid: Pid, priority: Priority) -> EdsResult<()> {
        self.with_state(|st| st.reprioritize(pid, priority))?;
        debug!("{} now at priority {}", pid, priority);
        self.schedule();
        Ok(())
    }

    // ---- Events ----

    /// Creates an event from the default class, copying `payload` into it.
    ///
    /// Running out of memory or event slots is fatal.
    pub fn create_event(&self, signal: Signal, payload: &[u8]) -> EventRef {
        self.expect_created(self.try_create_event_in(&self.event_class, signal, payload))
    }

    /// Creates an event whose payload comes from `class`.
    pub fn create_event_in(&self, class: &MemoryClassRef, signal: Signal, payload: &[u8]) -> EventRef {
        self.expect_created(self.try_create_event_in(class, signal, payload))
    }

    /// Interrupt-context [`create_event`](Self::create_event).
    pub fn create_event_i(&self, cs: CriticalSection<'_>, signal: Signal, payload: &[u8]) -> EventRef {
        let created = self
            .stage_payload(&self.event_class, payload)
            .and_then(|payload| self.insert_event(cs, signal, payload));
        self.expect_created(created)
    }

    /// Fallible [`create_event`](Self::create_event)
    pub fn try_create_event(&self, signal: Signal, payload: &[u8]) -> EdsResult<EventRef> {
        self.try_create_event_in(&self.event_class, signal, payload)
    }

    pub fn try_create_event_in(
        &self,
        class: &MemoryClassRef,
        signal: Signal,
        payload: &[u8],
    ) -> EdsResult<EventRef> {
        let payload = self.stage_payload(class, payload)?;
        critical_section::with(|cs| self.insert_event(cs, signal, payload))
    }

    fn stage_payload(&self, class: &MemoryClassRef, bytes: &[u8]) -> EdsResult<Payload> {
        if bytes.is_empty() {
            return Ok(Payload::EMPTY);
        }
        let mut block = class.allocate(bytes.len()).ok_or(EdsError::OutOfMemory)?;
        block.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
        Ok(Payload::new(block, Arc::clone(class)))
    }

    fn insert_event(&self, cs: CriticalSection<'_>, signal: Signal, payload: Payload) -> EdsResult<EventRef> {
        let mut st = self.state.borrow_ref_mut(cs);
        let generator = if self.config.stamp_generator {
            st.current.pid
        } else {
            None
        };
        let timestamp = self.config.timestamp.map(|now| now());
        let inserted = st
            .events
            .insert(EventEntry::new(signal, payload, generator, timestamp));
        drop(st);

        match inserted {
            Ok(evt) => {
                trace!("created {} {}", evt, signal);
                Ok(evt)
            }
            Err(_) => Err(EdsError::EventTableFull),
        }
    }

    fn expect_created(&self, created: EdsResult<EventRef>) -> EventRef {
        match created {
            Ok(evt) => evt,
            Err(err) => {
                log::error!("event creation failed: {}", err);
                eds_error!("event", "event allocation failed");
                EventRef::constant(Signal::EMPTY)
            }
        }
    }

    /// Keeps the event alive at zero references until [`unreserve`](Self::unreserve).
    pub fn reserve(&self, evt: EventRef) {
        if evt.is_constant() {
            return;
        }
        self.with_state(|st| {
            let entry = st.events.get_mut(evt);
            eds_assert!(entry.is_ok(), "event", "reserve of a stale event");
            if let Ok(entry) = entry {
                entry.attr.set_reserved(true);
            }
        });
    }

    /// Drops the reservation; an unreferenced event is freed right away.
    pub fn unreserve(&self, evt: EventRef) {
        if evt.is_constant() {
            return;
        }
        let garbage = self.with_state(|st| {
            let entry = st.events.get_mut(evt);
            eds_assert!(entry.is_ok(), "event", "unreserve of a stale event");
            if let Ok(entry) = entry {
                entry.attr.set_reserved(false);
            }
            st.events.collect(evt)
        });
        drop(garbage);
    }

    /// Frees an event that was never posted, or whose posts were all consumed.
    pub fn destroy_event(&self, evt: EventRef) {
        if evt.is_constant() {
            return;
        }
        let garbage = self.with_state(|st| {
            let unused = st
                .events
                .get(evt)
                .map(|entry| entry.attr.refs() == 0 && entry.dispatching == 0)
                .unwrap_or(false);
            eds_assert!(unused, "event", "destroy of a referenced event");
            if unused {
                st.events.remove(evt)
            } else {
                None
            }
        });
        drop(garbage);
    }

    /// Reference count of a dynamic event, `None` for constant or stale handles
    pub fn event_refs(&self, evt: EventRef) -> Option<u8> {
        self.with_state(|st| st.events.get(evt).ok().map(|entry| entry.attr.refs()))
    }

    pub fn is_reserved(&self, evt: EventRef) -> bool {
        self.with_state(|st| {
            st.events
                .get(evt)
                .map(|entry| entry.attr.is_reserved())
                .unwrap_or(false)
        })
    }

    /// Dynamic events currently allocated
    pub fn live_events(&self) -> usize {
        self.with_state(|st| st.events.live())
    }

    fn release(&self, evt: EventRef) {
        let garbage = self.with_state(|st| {
            if let Ok(entry) = st.events.get_mut(evt) {
                entry.attr.release_ref();
            }
            st.events.collect(evt)
        });
        drop(garbage);
    }

    // ---- Posting ----

    /// Queues `evt` at the tail of the EPA's queue. A full queue is fatal.
    pub fn post(&self, pid: Pid, evt: EventRef) {
        critical_section::with(|cs| self.post_i(cs, pid, evt));
        self.schedule();
    }

    /// Queues `evt` at the head of the EPA's queue, then schedules exactly
    /// like [`post`](Self::post).
    pub fn post_ahead(&self, pid: Pid, evt: EventRef) {
        critical_section::with(|cs| self.post_ahead_i(cs, pid, evt));
        self.schedule();
    }

    /// Interrupt-context [`post`](Self::post). Nothing is dispatched; call
    /// [`schedule`](Self::schedule) on the way out of the interrupt.
    pub fn post_i(&self, cs: CriticalSection<'_>, pid: Pid, evt: EventRef) {
        self.enqueue(cs, pid, evt, End::Back);
    }

    /// Interrupt-context [`post_ahead`](Self::post_ahead)
    pub fn post_ahead_i(&self, cs: CriticalSection<'_>, pid: Pid, evt: EventRef) {
        self.enqueue(cs, pid, evt, End::Front);
    }

    fn enqueue(&self, cs: CriticalSection<'_>, pid: Pid, evt: EventRef, end: End) {
        let mut st = self.state.borrow_ref_mut(cs);
        if st.enqueue(pid, evt, end).is_err() {
            let garbage = st.events.collect(evt);
            drop(st);
            drop(garbage);
        }
    }

    /// Posts only if more than `margin` slots are free, leaving room for
    /// producers that must not fail.
    ///
    /// An unreferenced event that could not be posted is freed.
    pub fn post_with_margin(&self, pid: Pid, evt: EventRef, margin: usize) -> EdsResult<()> {
        let (posted, garbage) = self.with_state(|st| {
            let free = st.record(pid).map(|record| record.queue.free_space());
            let posted = match free {
                Ok(free) if free > margin => st.enqueue(pid, evt, End::Back),
                Ok(_) => Err(EdsError::QueueFull),
                Err(err) => Err(err),
            };
            let garbage = posted.is_err().then(|| st.events.collect(evt)).flatten();
            (posted, garbage)
        });
        drop(garbage);

        match posted {
            Ok(()) => {
                self.schedule();
                Ok(())
            }
            Err(err) => {
                warn!("margin post of {} to {} refused: {}", evt, pid, err);
                Err(err)
            }
        }
    }

    /// Posts `evt` to every live EPA.
    pub fn publish(&self, evt: EventRef) {
        let garbage = self.with_state(|st| {
            let mut cursor = st.epas.head();
            while let Some(id) = cursor {
                let pid = st.pid(id);
                let _ = st.enqueue(pid, evt, End::Back);
                cursor = st.epas.next(id);
            }
            st.events.collect(evt)
        });
        drop(garbage);
        self.schedule();
    }

    // ---- Scheduler ----

    /// Moves the kernel to [`Status::Running`] and drains every ready EPA.
    pub fn start(&self) {
        let started = self.with_state(|st| {
            let stopped = st.status == Status::Stopped;
            st.status = Status::Running;
            stopped
        });
        eds_assert!(started, "sched", "kernel already started");
        info!("kernel {} started", self.config.name);
        self.schedule();
    }

    pub fn status(&self) -> Status {
        self.with_state(|st| st.status)
    }

    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    /// Starts the kernel if needed and never returns. The idle callback (or
    /// a wait-for-interrupt) runs whenever nothing is ready.
    pub fn run(&self) -> ! {
        if !self.is_running() {
            self.start();
        }
        loop {
            self.schedule();
            match self.config.idle_callback {
                Some(idle) => idle(),
                None => wait_for_interrupt(),
            }
        }
    }

    /// Runs every EPA ready above the current priority until none is left.
    ///
    /// Safe to call from an interrupt epilogue while a lower-priority
    /// dispatch is in progress. Does nothing until the kernel is started.
    pub fn schedule(&self) {
        let saved = self.with_state(|st| (st.status == Status::Running).then_some(st.current));
        let Some(saved) = saved else {
            return;
        };
        while self.dispatch_above(saved) {}
    }

    /// Dispatches a single event of the highest ready EPA above the current
    /// priority, whether or not the kernel is running.
    pub fn dispatch_once(&self) -> bool {
        let saved = self.with_state(|st| st.current);
        self.dispatch_above(saved)
    }

    fn dispatch_above(&self, saved: Cursor) -> bool {
        let Some(fetched) = self.with_state(|st| st.fetch_above(saved.priority)) else {
            return false;
        };

        let payload = fetched.payload.as_deref().map_or(&[] as &[u8], Payload::bytes);
        let event = Event::new(fetched.signal, fetched.evt, payload)
            .with_generator(fetched.generator)
            .with_timestamp(fetched.timestamp);
        trace!("dispatch {} to {}", fetched.signal, fetched.pid);

        let outcome = match self.agents.get(usize::from(fetched.pid.index())) {
            Some(slot) => {
                let mut agent = slot.lock();
                match agent.as_mut() {
                    Some(agent) => agent.dispatch(self, &event),
                    None => {
                        warn!("{} has no state machine, dropping {}", fetched.pid, fetched.signal);
                        Dispatch::Ignored
                    }
                }
            }
            None => Dispatch::Ignored,
        };
        trace!("{} {}: {}", fetched.pid, fetched.signal, outcome);

        let garbage = self.with_state(|st| st.finish(&fetched, outcome, saved));
        drop(fetched);
        drop(garbage);
        true
    }

    // ---- Registry ----

    /// EPA whose handler is executing, if any
    pub fn current_epa(&self) -> Option<Pid> {
        self.with_state(|st| st.current.pid)
    }

    pub fn current_priority(&self) -> Priority {
        self.with_state(|st| st.current.priority)
    }

    pub fn priority_of(&self, pid: Pid) -> EdsResult<Priority> {
        self.with_state(|st| st.record(pid).map(|record| record.priority))
    }

    /// Finds a live EPA by name
    pub fn lookup(&self, name: &str) -> EdsResult<Pid> {
        self.with_state(|st| {
            st.epas
                .iter()
                .find(|(_, record)| record.name == name)
                .map(|(id, _)| st.pid(id))
                .ok_or(EdsError::UnknownEpa)
        })
    }

    pub fn epa_info(&self, pid: Pid) -> EdsResult<EpaInfo> {
        self.with_state(|st| st.record(pid).map(|record| record.info(pid)))
    }

    /// Every live EPA, in construction order
    pub fn epas(&self) -> Vec<EpaInfo> {
        self.with_state(|st| {
            st.epas
                .iter()
                .map(|(id, record)| record.info(st.pid(id)))
                .collect()
        })
    }

    pub fn epa_count(&self) -> usize {
        self.with_state(|st| st.epas.len())
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

fn wait_for_interrupt() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::asm::wfi();
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    core::hint::spin_loop();
}
