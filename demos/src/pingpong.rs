//! Ping-pong: two players hit a ball event back and forth until the rally
//! limit, then the last hitter publishes the end of the game.
//!
//! ```text
//! Playing ─┬─ Rallying
//!          │
//! Finished ┘
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use eds_kernel::{EdsResult, EpaDef, Event, Kernel, Pid, Signal, StateMachine, StateReturn};
use log::{debug, info, warn};

pub const SIG_SERVE: Signal = Signal(Signal::USER.0);
pub const SIG_BALL: Signal = Signal(Signal::USER.0 + 1);
pub const SIG_GAME_OVER: Signal = Signal(Signal::USER.0 + 2);

pub static PING: EpaDef = EpaDef::new("ping", 3, 4);
pub static PONG: EpaDef = EpaDef::new("pong", 2, 4);

/// Total hits across both players
#[derive(Debug, Clone, Default)]
pub struct Tally(Arc<AtomicU32>);

impl Tally {
    pub fn hits(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Court {
    Playing,
    Rallying,
    Finished,
}

pub struct Player {
    name: &'static str,
    peer: &'static str,
    limit: u32,
    hits: u32,
    tally: Tally,
}

impl Player {
    pub fn new(name: &'static str, peer: &'static str, limit: u32, tally: &Tally) -> Self {
        Self {
            name,
            peer,
            limit,
            hits: 0,
            tally: tally.clone(),
        }
    }

    fn hit(&mut self, kernel: &Kernel, count: u32) {
        self.hits += 1;
        self.tally.hit();
        match kernel.lookup(self.peer) {
            Ok(peer) => kernel.post(peer, kernel.create_event(SIG_BALL, &count.to_le_bytes())),
            Err(err) => warn!("{}: nobody to play with: {}", self.name, err),
        }
    }
}

fn rally_count(payload: &[u8]) -> Option<u32> {
    payload.try_into().ok().map(u32::from_le_bytes)
}

impl StateMachine for Player {
    type State = Court;
    type Context = Kernel;

    fn initial(&mut self, _kernel: &Kernel, _event: &Event<'_>) -> Court {
        Court::Playing
    }

    fn parent(&self, state: Court) -> Option<Court> {
        match state {
            Court::Rallying => Some(Court::Playing),
            Court::Playing | Court::Finished => None,
        }
    }

    fn handle(&mut self, kernel: &Kernel, state: Court, event: &Event<'_>) -> StateReturn<Court> {
        match (state, event.signal()) {
            (Court::Playing, Signal::INIT) => StateReturn::Transition(Court::Rallying),
            (Court::Playing, SIG_GAME_OVER) => StateReturn::Transition(Court::Finished),
            (Court::Rallying, SIG_SERVE) => {
                info!("{} serves", self.name);
                self.hit(kernel, 1);
                StateReturn::Handled
            }
            (Court::Rallying, SIG_BALL) => {
                let Some(count) = rally_count(event.payload()) else {
                    warn!("{}: malformed ball ({} bytes)", self.name, event.payload().len());
                    return StateReturn::Handled;
                };
                debug!("{} receives ball #{}", self.name, count);
                if count >= self.limit {
                    info!("{} ends the rally at {}", self.name, count);
                    kernel.publish(kernel.create_event(SIG_GAME_OVER, &[]));
                } else {
                    self.hit(kernel, count + 1);
                }
                StateReturn::Handled
            }
            (Court::Finished, Signal::ENTRY) => {
                info!("{} leaves the court after {} hits", self.name, self.hits);
                StateReturn::Handled
            }
            _ => StateReturn::Super,
        }
    }
}

/// Constructs both players; returns `(ping, pong)`.
pub fn construct(kernel: &Kernel, limit: u32, tally: &Tally) -> EdsResult<(Pid, Pid)> {
    let ping = kernel.construct(&PING, Player::new(PING.name, PONG.name, limit, tally))?;
    let pong = kernel.construct(&PONG, Player::new(PONG.name, PING.name, limit, tally))?;
    Ok((ping, pong))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rally_runs_to_the_limit() {
        let kernel = Kernel::new();
        let tally = Tally::default();
        let (ping, _pong) = construct(&kernel, 9, &tally).unwrap();
        kernel.start();

        kernel.post(ping, kernel.create_event(SIG_SERVE, &[]));
        // the player receiving ball #9 ends the game without hitting
        assert_eq!(tally.hits(), 9);
        assert_eq!(kernel.live_events(), 0);
        assert!(kernel.epas().iter().all(|info| info.queued == 0));
    }

    #[test]
    fn payload_must_be_four_bytes() {
        assert_eq!(rally_count(&7u32.to_le_bytes()), Some(7));
        assert_eq!(rally_count(&[1, 2]), None);
    }
}
