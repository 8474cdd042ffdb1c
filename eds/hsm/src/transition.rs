//! Transition execution

use eds_core::{eds_assert, eds_error, Event, Signal};
use heapless::Vec;
use log::trace;

use crate::{StateMachine, StateReturn, MAX_STATE_DEPTH};

const ENTRY_EVT: Event<'static> = Event::reserved(Signal::ENTRY);
const EXIT_EVT: Event<'static> = Event::reserved(Signal::EXIT);
const INIT_EVT: Event<'static> = Event::reserved(Signal::INIT);

/// States ordered innermost first
pub(crate) type Path<S> = Vec<S, MAX_STATE_DEPTH>;

/// Where a transition left the machine
#[derive(Debug, Clone, Copy)]
pub(crate) struct Landing<S> {
    pub leaf: S,
    /// The innermost entered state asked for a `SIG_NOEX` continuation
    pub continuation: bool,
}

fn push<S>(path: &mut Path<S>, state: S, max_depth: usize) -> bool {
    let room = path.len() < max_depth;
    eds_assert!(room, "hsm", "state nesting depth exceeded");
    room && path.push(state).is_ok()
}

fn exit<M: StateMachine>(machine: &mut M, ctx: &M::Context, state: M::State) {
    trace!("hsm: exit {:?}", state);
    let _ = machine.handle(ctx, state, &EXIT_EVT);
}

/// Enters `path` outermost first.
fn enter<M: StateMachine>(machine: &mut M, ctx: &M::Context, path: &Path<M::State>) -> bool {
    let mut continuation = false;
    for (depth, &state) in path.iter().enumerate().rev() {
        trace!("hsm: enter {:?}", state);
        let ret = machine.handle(ctx, state, &ENTRY_EVT);
        continuation = depth == 0 && matches!(ret, StateReturn::NoEvent);
    }
    continuation
}

/// `state` and its ancestors, stopping right below `stop` or at the top.
pub(crate) fn chain<M: StateMachine>(
    machine: &M,
    state: M::State,
    stop: Option<M::State>,
    max_depth: usize,
) -> Path<M::State> {
    let mut path = Path::new();
    let mut cur = Some(state);
    while let Some(s) = cur {
        if Some(s) == stop || !push(&mut path, s, max_depth) {
            break;
        }
        cur = machine.parent(s);
    }
    path
}

/// Enters the topmost initial target from the top state.
pub(crate) fn initial<M: StateMachine>(
    machine: &mut M,
    ctx: &M::Context,
    target: M::State,
    max_depth: usize,
) -> Landing<M::State> {
    let path = chain(machine, target, None, max_depth);
    if enter(machine, ctx, &path) {
        return Landing { leaf: target, continuation: true };
    }
    drill(machine, ctx, target, max_depth)
}

/// Runs `source -> target` while `leaf` is the active state.
///
/// `source` is the state whose handler returned the transition, `leaf` or
/// one of its ancestors.
pub(crate) fn execute<M: StateMachine>(
    machine: &mut M,
    ctx: &M::Context,
    leaf: M::State,
    source: M::State,
    target: M::State,
    max_depth: usize,
) -> Landing<M::State> {
    let mut state = leaf;
    let mut steps = 0;
    while state != source {
        exit(machine, ctx, state);
        steps += 1;
        match machine.parent(state) {
            Some(parent) if steps < max_depth => state = parent,
            _ => {
                eds_error!("hsm", "transition source is not an ancestor of the active state");
                break;
            }
        }
    }

    let mut path = Path::new();
    push(&mut path, target, max_depth);
    let source_parent = machine.parent(source);
    let target_parent = machine.parent(target);

    if source == target {
        exit(machine, ctx, source);
    } else if target_parent == Some(source) {
        // direct substate: source stays active
    } else if target_parent == source_parent {
        exit(machine, ctx, source);
    } else if source_parent == Some(target) {
        exit(machine, ctx, source);
        path.clear();
    } else {
        let mut nested = false;
        let mut cur = target_parent;
        while let Some(ancestor) = cur {
            if ancestor == source {
                nested = true;
                break;
            }
            if !push(&mut path, ancestor, max_depth) {
                break;
            }
            cur = machine.parent(ancestor);
        }

        if !nested {
            exit(machine, ctx, source);
            let mut steps = 0;
            let mut cur = source_parent;
            while let Some(ancestor) = cur {
                if let Some(lca) = path.iter().position(|&s| s == ancestor) {
                    path.truncate(lca);
                    break;
                }
                exit(machine, ctx, ancestor);
                steps += 1;
                if steps >= max_depth {
                    eds_error!("hsm", "state nesting depth exceeded");
                    break;
                }
                cur = machine.parent(ancestor);
            }
        }
    }

    if enter(machine, ctx, &path) {
        return Landing { leaf: target, continuation: true };
    }
    drill(machine, ctx, target, max_depth)
}

/// Follows initial transitions from `leaf` down to a leaf state.
fn drill<M: StateMachine>(
    machine: &mut M,
    ctx: &M::Context,
    mut leaf: M::State,
    max_depth: usize,
) -> Landing<M::State> {
    loop {
        let StateReturn::Transition(sub) = machine.handle(ctx, leaf, &INIT_EVT) else {
            return Landing { leaf, continuation: false };
        };

        let path = chain(machine, sub, Some(leaf), max_depth);
        let inside = path.last().and_then(|&s| machine.parent(s)) == Some(leaf);
        eds_assert!(inside, "hsm", "initial transition must target a substate");
        if !inside {
            return Landing { leaf, continuation: false };
        }

        trace!("hsm: initial {:?} -> {:?}", leaf, sub);
        leaf = sub;
        if enter(machine, ctx, &path) {
            return Landing { leaf, continuation: true };
        }
    }
}
