#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # EDS Kernel
//!
//! Event-driven executive built from event processing agents (EPAs): each
//! one a hierarchical state machine with a private event queue and a unique
//! fixed priority.
//!
//! - Events are reference counted by the queues holding them and freed when
//!   the last one lets go, unless reserved.
//! - The scheduler always drains the highest-priority ready EPA first. A
//!   post that readies a higher priority than the one executing runs it to
//!   completion before the poster continues.
//! - Interrupt handlers use the `_i` variants inside their own critical
//!   section and call [`Kernel::schedule`] on exit.
//!
//! ```
//! use eds_kernel::{EpaDef, Event, Kernel, Signal, StateMachine, StateReturn};
//!
//! const SIG_PING: Signal = Signal(Signal::USER.0);
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum State {
//!     Waiting,
//! }
//!
//! struct Counter(u32);
//!
//! impl StateMachine for Counter {
//!     type State = State;
//!     type Context = Kernel;
//!
//!     fn initial(&mut self, _k: &Kernel, _e: &Event<'_>) -> State {
//!         State::Waiting
//!     }
//!
//!     fn parent(&self, _s: State) -> Option<State> {
//!         None
//!     }
//!
//!     fn handle(&mut self, _k: &Kernel, _s: State, e: &Event<'_>) -> StateReturn<State> {
//!         match e.signal() {
//!             SIG_PING => {
//!                 self.0 += 1;
//!                 StateReturn::Handled
//!             }
//!             _ => StateReturn::Super,
//!         }
//!     }
//! }
//!
//! let kernel = Kernel::new();
//! let pid = kernel.construct(&EpaDef::new("counter", 1, 4), Counter(0)).unwrap();
//! kernel.start();
//! kernel.post(pid, kernel.create_event(SIG_PING, &[]));
//! assert_eq!(kernel.live_events(), 0);
//! ```

extern crate alloc;

pub mod config;
mod epa;
mod event;
mod kernel;
mod sync;

pub use config::{EpaDef, KernelConfig, KernelConfigBuilder, DEFAULT_EVENT_HEAP};
pub use epa::{Agent, EpaInfo};
pub use kernel::{Kernel, Status};

pub use eds_core::{EdsError, EdsResult, Event, EventRef, Pid, Priority, Signal, Timestamp};
pub use eds_hsm::{Dispatch, Hsm, StateMachine, StateReturn};
