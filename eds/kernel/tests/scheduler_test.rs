//! Scheduling order, preemption and the EPA registry.

mod common;

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use common::{Log, Probe, SIG_A, SIG_B, SIG_C, SIG_D};
use eds_kernel::{
    EdsError, EpaDef, Event, Kernel, KernelConfig, Pid, Priority, StateMachine, StateReturn,
};

/// Low-priority EPA hit by an interrupt while handling `SIG_A`
struct Interrupted {
    log: Log,
    target: Pid,
    /// Run the scheduler on the way out of the interrupt
    nested: bool,
}

impl StateMachine for Interrupted {
    type State = ();
    type Context = Kernel;

    fn initial(&mut self, _kernel: &Kernel, _event: &Event<'_>) {}

    fn parent(&self, _state: ()) -> Option<()> {
        None
    }

    fn handle(&mut self, kernel: &Kernel, _state: (), event: &Event<'_>) -> StateReturn<()> {
        if event.signal().is_reserved() {
            return StateReturn::Super;
        }
        self.log.record("low", event);
        if event.signal() == SIG_A {
            critical_section::with(|cs| {
                let evt = kernel.create_event_i(cs, SIG_B, &[]);
                kernel.post_i(cs, self.target, evt);
            });
            if self.nested {
                kernel.schedule();
                self.log.note("low", SIG_D);
            }
        }
        StateReturn::Handled
    }
}

fn interrupted_scenario(nested: bool) -> Vec<(&'static str, u16)> {
    let log = Log::default();
    let kernel = Kernel::new();
    let high = kernel
        .construct(&EpaDef::new("high", 5, 4), Probe::new("high", &log))
        .unwrap();
    let low = kernel
        .construct(
            &EpaDef::new("low", 1, 4),
            Interrupted {
                log: log.clone(),
                target: high,
                nested,
            },
        )
        .unwrap();

    for signal in [SIG_A, SIG_C, SIG_C] {
        kernel.post(low, kernel.create_event(signal, &[]));
    }
    kernel.start();
    assert_eq!(kernel.live_events(), 0);
    log.trail()
}

#[test]
fn high_priority_queue_drains_first() {
    let log = Log::default();
    let kernel = Kernel::new();
    let low = kernel
        .construct(&EpaDef::new("low", 1, 4), Probe::new("low", &log))
        .unwrap();
    let high = kernel
        .construct(&EpaDef::new("high", 5, 4), Probe::new("high", &log))
        .unwrap();

    for signal in [SIG_A, SIG_B, SIG_C] {
        kernel.post(low, kernel.create_event(signal, &[]));
    }
    for signal in [SIG_A, SIG_B] {
        kernel.post(high, kernel.create_event(signal, &[]));
    }
    assert!(log.seen().is_empty(), "nothing runs before start");

    kernel.start();
    assert_eq!(
        log.trail(),
        [
            ("high", SIG_A.0),
            ("high", SIG_B.0),
            ("low", SIG_A.0),
            ("low", SIG_B.0),
            ("low", SIG_C.0),
        ]
    );
}

#[test]
fn interrupt_between_dispatches_takes_the_next_slot() {
    let log = Log::default();
    let kernel = Kernel::new();
    let low = kernel
        .construct(&EpaDef::new("low", 1, 4), Probe::new("low", &log))
        .unwrap();
    let high = kernel
        .construct(&EpaDef::new("high", 5, 4), Probe::new("high", &log))
        .unwrap();
    while kernel.dispatch_once() {}

    for signal in [SIG_A, SIG_B, SIG_C] {
        kernel.post(low, kernel.create_event(signal, &[]));
    }
    assert!(kernel.dispatch_once());
    critical_section::with(|cs| {
        let evt = kernel.create_event_i(cs, SIG_D, &[]);
        kernel.post_i(cs, high, evt);
    });
    assert!(kernel.dispatch_once());
    assert_eq!(log.trail(), [("low", SIG_A.0), ("high", SIG_D.0)]);

    while kernel.dispatch_once() {}
    assert_eq!(
        log.trail(),
        [
            ("low", SIG_A.0),
            ("high", SIG_D.0),
            ("low", SIG_B.0),
            ("low", SIG_C.0),
        ]
    );
}

#[test]
fn interrupt_post_is_served_before_the_rest_of_the_low_queue() {
    assert_eq!(
        interrupted_scenario(false),
        [
            ("low", SIG_A.0),
            ("high", SIG_B.0),
            ("low", SIG_C.0),
            ("low", SIG_C.0),
        ]
    );
}

#[test]
fn schedule_on_interrupt_exit_preempts_running_handler() {
    assert_eq!(
        interrupted_scenario(true),
        [
            ("low", SIG_A.0),
            ("high", SIG_B.0),
            ("low", SIG_D.0),
            ("low", SIG_C.0),
            ("low", SIG_C.0),
        ]
    );
}

/// Posts `SIG_B` to `target` from inside its own handler
struct Forwarder {
    log: Log,
    target: Pid,
    /// Use `post_ahead` instead of `post`
    ahead: bool,
}

impl StateMachine for Forwarder {
    type State = ();
    type Context = Kernel;

    fn initial(&mut self, _kernel: &Kernel, _event: &Event<'_>) {}

    fn parent(&self, _state: ()) -> Option<()> {
        None
    }

    fn handle(&mut self, kernel: &Kernel, _state: (), event: &Event<'_>) -> StateReturn<()> {
        if event.signal() != SIG_A {
            return StateReturn::Super;
        }
        self.log.record("mid", event);
        let evt = kernel.create_event(SIG_B, &[]);
        if self.ahead {
            kernel.post_ahead(self.target, evt);
        } else {
            kernel.post(self.target, evt);
        }
        self.log.note("mid", SIG_D);
        StateReturn::Handled
    }
}

#[test]
fn post_to_higher_priority_runs_before_poster_continues() {
    let log = Log::default();
    let kernel = Kernel::new();
    let high = kernel
        .construct(&EpaDef::new("high", 9, 4), Probe::new("high", &log))
        .unwrap();
    let low = kernel
        .construct(&EpaDef::new("low", 2, 4), Probe::new("low", &log))
        .unwrap();
    let mid = kernel
        .construct(
            &EpaDef::new("mid", 4, 4),
            Forwarder {
                log: log.clone(),
                target: high,
                ahead: false,
            },
        )
        .unwrap();
    kernel.start();

    kernel.post(mid, kernel.create_event(SIG_A, &[]));
    assert_eq!(
        log.trail(),
        [("mid", SIG_A.0), ("high", SIG_B.0), ("mid", SIG_D.0)]
    );

    log.clear();
    kernel.post(low, kernel.create_event(SIG_C, &[]));
    assert_eq!(log.trail(), [("low", SIG_C.0)]);
}

#[test]
fn post_ahead_to_higher_priority_preempts_like_post() {
    let log = Log::default();
    let kernel = Kernel::new();
    let high = kernel
        .construct(&EpaDef::new("high", 7, 4), Probe::new("high", &log))
        .unwrap();
    let mid = kernel
        .construct(
            &EpaDef::new("mid", 3, 4),
            Forwarder {
                log: log.clone(),
                target: high,
                ahead: true,
            },
        )
        .unwrap();
    kernel.start();

    kernel.post(mid, kernel.create_event(SIG_A, &[]));
    assert_eq!(
        log.trail(),
        [("mid", SIG_A.0), ("high", SIG_B.0), ("mid", SIG_D.0)]
    );
    assert_eq!(kernel.epa_info(high).unwrap().queued, 0);
    assert_eq!(kernel.live_events(), 0);
}

#[test]
#[should_panic(expected = "eds assertion failed: sched: priority already in use")]
fn duplicate_priority_is_fatal() {
    let log = Log::default();
    let kernel = Kernel::new();
    kernel
        .construct(&EpaDef::new("first", 4, 2), Probe::new("first", &log))
        .unwrap();
    let _ = kernel.construct(&EpaDef::new("second", 4, 2), Probe::new("second", &log));
}

#[test]
#[should_panic(expected = "kernel already started")]
fn starting_twice_is_fatal() {
    let kernel = Kernel::new();
    kernel.start();
    kernel.start();
}

#[test]
fn set_priority_moves_epa_and_frees_old_slot() {
    let log = Log::default();
    let kernel = Kernel::new();
    let low = kernel
        .construct(&EpaDef::new("low", 1, 4), Probe::new("low", &log))
        .unwrap();
    let mid = kernel
        .construct(&EpaDef::new("mid", 3, 4), Probe::new("mid", &log))
        .unwrap();
    kernel.post(low, kernel.create_event(SIG_A, &[]));
    kernel.post(mid, kernel.create_event(SIG_A, &[]));

    kernel.set_priority(low, Priority::new(7).unwrap()).unwrap();
    assert_eq!(kernel.priority_of(low), Ok(Priority::new(7).unwrap()));

    kernel.start();
    assert_eq!(log.trail(), [("low", SIG_A.0), ("mid", SIG_A.0)]);

    // level 1 is free again
    assert!(kernel
        .construct(&EpaDef::new("again", 1, 2), Probe::new("again", &log))
        .is_ok());
}

#[test]
#[should_panic(expected = "priority already in use")]
fn set_priority_onto_occupied_level_is_fatal() {
    let log = Log::default();
    let kernel = Kernel::new();
    let a = kernel
        .construct(&EpaDef::new("a", 1, 2), Probe::new("a", &log))
        .unwrap();
    kernel
        .construct(&EpaDef::new("b", 2, 2), Probe::new("b", &log))
        .unwrap();
    let _ = kernel.set_priority(a, Priority::new(2).unwrap());
}

#[test]
fn nothing_is_dispatched_while_stopped() {
    let log = Log::default();
    let kernel = Kernel::new();
    let a = kernel
        .construct(&EpaDef::new("a", 1, 4), Probe::new("a", &log))
        .unwrap();
    kernel.post(a, kernel.create_event(SIG_A, &[]));
    kernel.schedule();

    assert!(!kernel.is_running());
    assert!(log.seen().is_empty());
    // SIG_INIT and SIG_A
    assert_eq!(kernel.epa_info(a).unwrap().queued, 2);
}

#[test]
fn dispatch_once_steps_a_stopped_kernel() {
    let log = Log::default();
    let kernel = Kernel::new();
    let a = kernel
        .construct(&EpaDef::new("a", 1, 4), Probe::new("a", &log))
        .unwrap();

    assert!(kernel.dispatch_once(), "SIG_INIT");
    assert!(!kernel.dispatch_once());

    kernel.post(a, kernel.create_event(SIG_A, &[]));
    kernel.post(a, kernel.create_event(SIG_B, &[]));
    assert!(kernel.dispatch_once());
    assert_eq!(log.trail(), [("a", SIG_A.0)]);
    assert!(kernel.dispatch_once());
    assert!(!kernel.dispatch_once());
    assert_eq!(log.trail(), [("a", SIG_A.0), ("a", SIG_B.0)]);
}

/// Records the kernel's view of who is executing
struct WhoAmI {
    seen: Arc<Mutex<Vec<(Option<Pid>, Priority)>>>,
}

impl StateMachine for WhoAmI {
    type State = ();
    type Context = Kernel;

    fn initial(&mut self, _kernel: &Kernel, _event: &Event<'_>) {}

    fn parent(&self, _state: ()) -> Option<()> {
        None
    }

    fn handle(&mut self, kernel: &Kernel, _state: (), event: &Event<'_>) -> StateReturn<()> {
        if event.signal() == SIG_A {
            self.seen
                .lock()
                .unwrap()
                .push((kernel.current_epa(), kernel.current_priority()));
        }
        StateReturn::Super
    }
}

#[test]
fn current_epa_is_set_only_while_dispatching() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let kernel = Kernel::new();
    let pid = kernel
        .construct(&EpaDef::new("me", 6, 2), WhoAmI { seen: seen.clone() })
        .unwrap();
    kernel.start();
    assert_eq!(kernel.current_epa(), None);

    kernel.post(pid, kernel.create_event(SIG_A, &[]));
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[(Some(pid), Priority::new(6).unwrap())]
    );
    assert_eq!(kernel.current_epa(), None);
    assert_eq!(kernel.current_priority(), Priority::IDLE);
}

#[test]
fn registry_lookup_enumerate_and_destroy() {
    let log = Log::default();
    let kernel = Kernel::with_config(KernelConfig::builder().max_epas(4).build());
    let alpha = kernel
        .construct(&EpaDef::new("alpha", 2, 3), Probe::new("alpha", &log))
        .unwrap();
    let beta = kernel
        .construct(&EpaDef::new("beta", 3, 5), Probe::new("beta", &log))
        .unwrap();

    assert_eq!(kernel.lookup("beta"), Ok(beta));
    assert_eq!(kernel.lookup("gamma"), Err(EdsError::UnknownEpa));
    assert_eq!(kernel.epa_count(), 2);

    let infos = kernel.epas();
    let names: Vec<_> = infos.iter().map(|info| info.name).collect();
    assert_eq!(names, ["alpha", "beta"]);
    assert_eq!(infos[1].pid, beta);
    assert_eq!(infos[1].capacity, 5);
    assert_eq!(infos[1].queued, 1, "SIG_INIT is waiting");

    kernel.destroy(alpha).unwrap();
    assert_eq!(kernel.lookup("alpha"), Err(EdsError::UnknownEpa));
    assert_eq!(kernel.epa_info(alpha), Err(EdsError::UnknownEpa));
    assert_eq!(kernel.epa_count(), 1);

    let delta = kernel
        .construct(&EpaDef::new("delta", 2, 3), Probe::new("delta", &log))
        .unwrap();
    assert_eq!(kernel.lookup("delta"), Ok(delta));
    assert_eq!(delta.index(), alpha.index(), "slot is reused");
    assert_ne!(delta, alpha);
    assert_eq!(kernel.epa_info(alpha), Err(EdsError::UnknownEpa));
    assert_eq!(kernel.priority_of(alpha), Err(EdsError::UnknownEpa));
}

#[test]
#[should_panic(expected = "eds assertion failed: event: post to an unknown EPA")]
fn post_to_destroyed_pid_is_not_delivered_to_its_successor() {
    let log = Log::default();
    let kernel = Kernel::new();
    let first = kernel
        .construct(&EpaDef::new("first", 1, 4), Probe::new("first", &log))
        .unwrap();
    kernel.start();
    kernel.destroy(first).unwrap();
    let second = kernel
        .construct(&EpaDef::new("second", 2, 4), Probe::new("second", &log))
        .unwrap();
    assert_eq!(second.index(), first.index());

    kernel.post(first, kernel.create_event(SIG_A, &[]));
}

#[test]
#[should_panic(expected = "eds assertion failed: epa: destroy of an unknown EPA")]
fn destroying_a_pid_twice_is_fatal() {
    let log = Log::default();
    let kernel = Kernel::new();
    let once = kernel
        .construct(&EpaDef::new("once", 1, 4), Probe::new("once", &log))
        .unwrap();
    kernel.destroy(once).unwrap();
    kernel
        .construct(&EpaDef::new("again", 1, 4), Probe::new("again", &log))
        .unwrap();
    let _ = kernel.destroy(once);
}

#[test]
#[should_panic(expected = "EPA table is full")]
fn epa_table_capacity_is_enforced() {
    let log = Log::default();
    let kernel = Kernel::with_config(KernelConfig::builder().max_epas(1).build());
    kernel
        .construct(&EpaDef::new("only", 1, 2), Probe::new("only", &log))
        .unwrap();
    let _ = kernel.construct(&EpaDef::new("extra", 2, 2), Probe::new("extra", &log));
}

fn idle_reached() {
    panic!("idle reached");
}

#[test]
fn run_drains_everything_before_idling() {
    let log = Log::default();
    let kernel = Kernel::with_config(KernelConfig::builder().idle_callback(idle_reached).build());
    let a = kernel
        .construct(&EpaDef::new("a", 1, 4), Probe::new("a", &log))
        .unwrap();
    kernel.post(a, kernel.create_event(SIG_A, &[]));
    kernel.post(a, kernel.create_event(SIG_B, &[]));

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        kernel.run();
    }));
    assert!(result.is_err());
    assert!(kernel.is_running());
    assert_eq!(log.trail(), [("a", SIG_A.0), ("a", SIG_B.0)]);
}
