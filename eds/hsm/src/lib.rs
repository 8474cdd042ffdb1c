#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # EDS Hierarchical State Machines
//!
//! Runs one event at a time against a UML-style hierarchical state machine:
//! - unhandled events bubble up the superstate chain,
//! - transitions exit up to the least common ancestor of source and target
//!   and enter down to the target,
//! - composite targets drill down through their initial transitions,
//! - entry actions may request a no-event continuation (flowchart
//!   pseudostates) instead of the initial transition.
//!
//! States are values of a closed `Copy` type chosen by the application. The
//! hierarchy comes from [`StateMachine::parent`], a plain lookup, so no
//! handler is ever invoked just to learn its superstate.

#[cfg(all(test, not(feature = "std")))]
extern crate std;

use core::fmt;

use eds_core::Event;

mod hsm;
mod transition;

pub use hsm::Hsm;


/// Maximum nesting depth for hierarchical states
pub const MAX_STATE_DEPTH: usize = 8;

/// Decision returned by a state handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReturn<S> {
    /// Not handled here, offer the event to the superstate
    Super,
    /// Transition to the given state
    Transition(S),
    /// Consumed, no state change
    Handled,
    /// Not recognized, nothing happens
    Ignored,
    /// Retry this event on a later dispatch
    Deferred,
    /// Continue processing in the current state without a new event
    NoEvent,
}

impl<S> StateReturn<S> {
    /// Check if the event was consumed by the handler
    pub fn is_handled(&self) -> bool {
        matches!(self, StateReturn::Handled | StateReturn::Transition(_))
    }

    /// Check if this is a transition
    pub fn is_transition(&self) -> bool {
        matches!(self, StateReturn::Transition(_))
    }
}

#[cfg(feature = "defmt")]
impl<S> defmt::Format for StateReturn<S> {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            StateReturn::Super => defmt::write!(fmt, "Super"),
            StateReturn::Transition(_) => defmt::write!(fmt, "Transition"),
            StateReturn::Handled => defmt::write!(fmt, "Handled"),
            StateReturn::Ignored => defmt::write!(fmt, "Ignored"),
            StateReturn::Deferred => defmt::write!(fmt, "Deferred"),
            StateReturn::NoEvent => defmt::write!(fmt, "NoEvent"),
        }
    }
}

/// Outcome of one [`Hsm::dispatch`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Ignored,
    /// The event must go back to the tail of the owner's queue
    Deferred,
    /// A transition completed, including the initial drill-down
    Transitioned,
    /// The machine wants a `SIG_NOEX` event before anything else
    Continue,
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dispatch::Handled => "handled",
            Dispatch::Ignored => "ignored",
            Dispatch::Deferred => "deferred",
            Dispatch::Transitioned => "transitioned",
            Dispatch::Continue => "continue",
        };
        f.write_str(name)
    }
}

/// Application state machine.
///
/// `State` does not include the implicit top state: states whose
/// [`parent`](StateMachine::parent) is `None` sit directly under it. The top
/// state ignores every event and can never be a transition target.
pub trait StateMachine {
    type State: Copy + Eq + fmt::Debug;
    /// Whatever handlers need to talk to the outside world
    type Context: ?Sized;

    /// Target of the topmost initial transition, taken on the first `SIG_INIT`
    fn initial(&mut self, ctx: &Self::Context, event: &Event<'_>) -> Self::State;

    /// Superstate of `state`, `None` directly under the top state
    fn parent(&self, state: Self::State) -> Option<Self::State>;

    /// Reacts to `event` in `state`
    fn handle(
        &mut self,
        ctx: &Self::Context,
        state: Self::State,
        event: &Event<'_>,
    ) -> StateReturn<Self::State>;
}
