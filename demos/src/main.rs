//! EDS on the host.
//!
//! Runs a ping-pong rally and a sorter with a choice pseudostate on one
//! kernel, drains every queue and prints the per-EPA statistics. Set
//! `EDS_LOG=trace` to watch every post and dispatch.

mod flowchart;
mod pingpong;

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use eds_kernel::{EdsError, Kernel, KernelConfig, Timestamp};
use eds_mem::{CountingClass, HeapClass, MemoryClass};
use log::info;
use tracing_subscriber::EnvFilter;

const RALLY: u32 = 12;

/// Environment variable holding the log filter (`error` .. `trace`)
const LOG_VAR: &str = "EDS_LOG";

static START: OnceLock<Instant> = OnceLock::new();

/// Microseconds since start-up, wrapping at `u32::MAX`.
fn now() -> Timestamp {
    START.get_or_init(Instant::now).elapsed().as_micros() as Timestamp
}

/// Installs the subscriber. Kernel `log` records reach it via `tracing-log`.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}

fn main() -> Result<(), EdsError> {
    init_tracing("info");
    START.get_or_init(Instant::now);

    let events = Arc::new(CountingClass::new(Arc::new(HeapClass::new(1024))));
    let kernel = Kernel::with_config(
        KernelConfig::builder()
            .name("demo")
            .max_epas(4)
            .max_events(32)
            .timestamp(now)
            .event_class(events.clone())
            .build(),
    );

    let tally = pingpong::Tally::default();
    let (ping, _pong) = pingpong::construct(&kernel, RALLY, &tally)?;
    let bins = flowchart::Bins::default();
    let sorter = flowchart::construct(&kernel, &bins)?;

    kernel.post(ping, kernel.create_event(pingpong::SIG_SERVE, &[]));
    flowchart::feed(&kernel, sorter, &[4, 18]);
    kernel.post(sorter, kernel.create_event(flowchart::SIG_PAUSE, &[]));
    flowchart::feed(&kernel, sorter, &[11, 2, 30]);
    kernel.post(sorter, kernel.create_event(flowchart::SIG_RESUME, &[]));

    kernel.start();

    info!("rally: {} hits", tally.hits());
    let counts = bins.counts();
    info!("sorter: {} small, {} large", counts.small, counts.large);
    for epa in kernel.epas() {
        info!(
            "epa {:<6} {} prio {}: {} queued, low-water {}/{}",
            epa.name, epa.pid, epa.priority, epa.queued, epa.min_free, epa.capacity
        );
    }
    let stats = events.stats();
    info!(
        "events: {} allocated, {} freed, {} live, {} of {} bytes never touched",
        events.allocations(),
        events.deallocations(),
        kernel.live_events(),
        stats.min_free,
        stats.total
    );

    for epa in kernel.epas() {
        kernel.destroy(epa.pid)?;
    }
    Ok(())
}
