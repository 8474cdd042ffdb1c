//! Shared fixtures for the kernel integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use eds_kernel::{Event, EventRef, Kernel, Pid, Signal, StateMachine, StateReturn, Timestamp};

pub const SIG_A: Signal = Signal::USER;
pub const SIG_B: Signal = Signal(Signal::USER.0 + 1);
pub const SIG_C: Signal = Signal(Signal::USER.0 + 2);
pub const SIG_D: Signal = Signal(Signal::USER.0 + 3);

/// One dispatched user event as seen by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub epa: &'static str,
    pub signal: Signal,
    pub payload: Vec<u8>,
    pub handle: EventRef,
    pub generator: Option<Pid>,
    pub timestamp: Option<Timestamp>,
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Seen>>>);

impl Log {
    pub fn record(&self, epa: &'static str, event: &Event<'_>) {
        self.0.lock().unwrap().push(Seen {
            epa,
            signal: event.signal(),
            payload: event.payload().to_vec(),
            handle: event.handle(),
            generator: event.generator(),
            timestamp: event.timestamp(),
        });
    }

    pub fn note(&self, epa: &'static str, signal: Signal) {
        self.0.lock().unwrap().push(Seen {
            epa,
            signal,
            payload: Vec::new(),
            handle: EventRef::constant(signal),
            generator: None,
            timestamp: None,
        });
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.0.lock().unwrap().clone()
    }

    /// `(epa, signal)` pairs in dispatch order
    pub fn trail(&self) -> Vec<(&'static str, u16)> {
        self.seen().iter().map(|s| (s.epa, s.signal.0)).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Flat EPA that records every user event it receives
pub struct Probe {
    pub name: &'static str,
    pub log: Log,
}

impl Probe {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl StateMachine for Probe {
    type State = ();
    type Context = Kernel;

    fn initial(&mut self, _kernel: &Kernel, _event: &Event<'_>) {}

    fn parent(&self, _state: ()) -> Option<()> {
        None
    }

    fn handle(&mut self, _kernel: &Kernel, _state: (), event: &Event<'_>) -> StateReturn<()> {
        if event.signal().is_reserved() {
            return StateReturn::Super;
        }
        self.log.record(self.name, event);
        StateReturn::Handled
    }
}
