//! Sorter with a choice pseudostate.
//!
//! `Classify` has no behavior of its own: its entry asks for a completion
//! event, and the completion handler picks the bin. While `Paused`, items
//! are deferred and come back once sorting resumes.
//!
//! ```text
//! Sorting ─┬─ Ready
//!          ├─ Classify (choice)
//!          ├─ Small
//!          └─ Large
//! Paused
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use eds_kernel::{EdsResult, EpaDef, Event, Kernel, Pid, Signal, StateMachine, StateReturn};
use log::{debug, info};

pub const SIG_ITEM: Signal = Signal(Signal::USER.0 + 8);
pub const SIG_PAUSE: Signal = Signal(Signal::USER.0 + 9);
pub const SIG_RESUME: Signal = Signal(Signal::USER.0 + 10);

pub static SORTER: EpaDef = EpaDef::new("sorter", 1, 8);

/// Items at or above this go to the large bin
pub const THRESHOLD: u8 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub small: u32,
    pub large: u32,
}

/// Bin counters shared with the caller
#[derive(Debug, Clone, Default)]
pub struct Bins(Arc<Mutex<Counts>>);

impl Bins {
    pub fn counts(&self) -> Counts {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut Counts)) {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sorting,
    Ready,
    Classify,
    Small,
    Large,
    Paused,
}

pub struct Sorter {
    item: u8,
    bins: Bins,
}

impl Sorter {
    pub fn new(bins: &Bins) -> Self {
        Self {
            item: 0,
            bins: bins.clone(),
        }
    }
}

impl StateMachine for Sorter {
    type State = Stage;
    type Context = Kernel;

    fn initial(&mut self, _kernel: &Kernel, _event: &Event<'_>) -> Stage {
        Stage::Sorting
    }

    fn parent(&self, state: Stage) -> Option<Stage> {
        match state {
            Stage::Ready | Stage::Classify | Stage::Small | Stage::Large => Some(Stage::Sorting),
            Stage::Sorting | Stage::Paused => None,
        }
    }

    fn handle(&mut self, _kernel: &Kernel, state: Stage, event: &Event<'_>) -> StateReturn<Stage> {
        match (state, event.signal()) {
            (Stage::Sorting, Signal::INIT) => StateReturn::Transition(Stage::Ready),
            (Stage::Sorting, SIG_ITEM) => {
                let Some(&item) = event.payload().first() else {
                    return StateReturn::Handled;
                };
                self.item = item;
                StateReturn::Transition(Stage::Classify)
            }
            (Stage::Sorting, SIG_PAUSE) => StateReturn::Transition(Stage::Paused),

            (Stage::Classify, Signal::ENTRY) => StateReturn::NoEvent,
            (Stage::Classify, Signal::NOEX) if self.item < THRESHOLD => {
                StateReturn::Transition(Stage::Small)
            }
            (Stage::Classify, Signal::NOEX) => StateReturn::Transition(Stage::Large),

            (Stage::Small, Signal::ENTRY) => {
                debug!("item {} -> small", self.item);
                self.bins.update(|c| c.small += 1);
                StateReturn::Handled
            }
            (Stage::Large, Signal::ENTRY) => {
                debug!("item {} -> large", self.item);
                self.bins.update(|c| c.large += 1);
                StateReturn::Handled
            }

            (Stage::Paused, Signal::ENTRY) => {
                info!("sorter paused");
                StateReturn::Handled
            }
            (Stage::Paused, SIG_ITEM) => StateReturn::Deferred,
            (Stage::Paused, SIG_RESUME) => StateReturn::Transition(Stage::Sorting),
            _ => StateReturn::Super,
        }
    }
}

pub fn construct(kernel: &Kernel, bins: &Bins) -> EdsResult<Pid> {
    kernel.construct(&SORTER, Sorter::new(bins))
}

/// Posts one item per byte of `items`.
pub fn feed(kernel: &Kernel, sorter: Pid, items: &[u8]) {
    for item in items {
        kernel.post(sorter, kernel.create_event(SIG_ITEM, core::slice::from_ref(item)));
    }
}
