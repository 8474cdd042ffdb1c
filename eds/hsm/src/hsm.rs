//! Hierarchical state machine instance

use eds_core::{eds_assert, eds_error, Event, Signal};
use log::debug;

use crate::transition::{self, Landing};
use crate::{Dispatch, StateMachine, StateReturn, MAX_STATE_DEPTH};

/// A [`StateMachine`] together with its active state.
///
/// The machine sits in the top state until the first `SIG_INIT` event is
/// dispatched, which runs [`StateMachine::initial`] and drills down to the
/// first leaf.
pub struct Hsm<M: StateMachine> {
    machine: M,
    state: Option<M::State>,
    max_depth: usize,
}

impl<M: StateMachine> Hsm<M> {
    pub fn new(machine: M) -> Self {
        Self::with_max_depth(machine, MAX_STATE_DEPTH)
    }

    /// Limits the nesting depth below [`MAX_STATE_DEPTH`]
    pub fn with_max_depth(machine: M, max_depth: usize) -> Self {
        eds_assert!(
            max_depth > 0 && max_depth <= MAX_STATE_DEPTH,
            "hsm",
            "nesting depth out of range"
        );
        Self {
            machine,
            state: None,
            max_depth: max_depth.clamp(1, MAX_STATE_DEPTH),
        }
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn into_inner(self) -> M {
        self.machine
    }

    /// Active leaf state, `None` while still in the top state
    pub fn state(&self) -> Option<M::State> {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state.is_some()
    }

    /// Check if `state` is the active state or one of its ancestors
    pub fn is_in(&self, state: M::State) -> bool {
        let mut cur = self.state;
        let mut depth = 0;
        while let Some(s) = cur {
            if s == state {
                return true;
            }
            depth += 1;
            if depth >= self.max_depth {
                break;
            }
            cur = self.machine.parent(s);
        }
        false
    }

    /// Processes one event to completion.
    pub fn dispatch(&mut self, ctx: &M::Context, event: &Event<'_>) -> Dispatch {
        let Some(leaf) = self.state else {
            return self.init(ctx, event);
        };

        let mut source = leaf;
        let mut depth = 1;
        let ret = loop {
            match self.machine.handle(ctx, source, event) {
                StateReturn::Super => match self.machine.parent(source) {
                    Some(parent) if depth < self.max_depth => {
                        depth += 1;
                        source = parent;
                    }
                    Some(_) => {
                        eds_error!("hsm", "state nesting depth exceeded");
                        break StateReturn::Ignored;
                    }
                    None => break StateReturn::Ignored,
                },
                ret => break ret,
            }
        };

        match ret {
            StateReturn::Transition(target) => {
                debug!("hsm: {:?} -> {:?} on {}", source, target, event.signal());
                let landing =
                    transition::execute(&mut self.machine, ctx, leaf, source, target, self.max_depth);
                self.land(landing)
            }
            StateReturn::Handled => Dispatch::Handled,
            StateReturn::Deferred => Dispatch::Deferred,
            StateReturn::NoEvent => Dispatch::Continue,
            StateReturn::Ignored | StateReturn::Super => Dispatch::Ignored,
        }
    }

    fn init(&mut self, ctx: &M::Context, event: &Event<'_>) -> Dispatch {
        if event.signal() != Signal::INIT {
            eds_error!("hsm", "event dispatched before SIG_INIT");
            return Dispatch::Ignored;
        }

        let target = self.machine.initial(ctx, event);
        debug!("hsm: initial transition to {:?}", target);
        let landing = transition::initial(&mut self.machine, ctx, target, self.max_depth);
        self.land(landing)
    }

    fn land(&mut self, landing: Landing<M::State>) -> Dispatch {
        self.state = Some(landing.leaf);
        if landing.continuation {
            Dispatch::Continue
        } else {
            Dispatch::Transitioned
        }
    }
}

impl<M: StateMachine> core::fmt::Debug for Hsm<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hsm")
            .field("state", &self.state)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
