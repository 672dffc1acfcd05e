//! Concurrency Gate Module
//!
//! Bounds how many wrapped operations run at once and queues the rest.
//!
//! Waiters are kept as an explicit FIFO of oneshot senders. A freed slot is
//! handed directly to the longest-waiting caller, so a newcomer can never
//! overtake the queue.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

// == Gate State ==
#[derive(Debug)]
struct GateState {
    /// Slots currently held
    active: usize,
    /// Configured maximum
    max: usize,
    /// Suspended callers in arrival order
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl GateState {
    /// Hands free slots to queued callers, skipping ones that gave up.
    fn admit_waiters(&mut self) {
        while self.active < self.max {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.send(()).is_ok() {
                self.active += 1;
            }
        }
    }
}

// == Concurrency Gate ==
/// FIFO admission control with a configurable slot count.
///
/// Cheap to clone; clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    state: Arc<Mutex<GateState>>,
}

impl ConcurrencyGate {
    // == Constructor ==
    /// Creates a gate admitting at most `max` concurrent holders.
    pub fn new(max: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                active: 0,
                max,
                waiters: VecDeque::new(),
            })),
        }
    }

    // == Acquire ==
    /// Waits for a free slot.
    ///
    /// The slot is held until the returned permit is dropped. Dropping this
    /// future while it waits gives up the place in line; a slot handed over
    /// in the meantime is passed on to the next waiter.
    pub async fn acquire(&self) -> GatePermit {
        let rx = {
            let mut state = self.state.lock();
            if state.active < state.max && state.waiters.is_empty() {
                state.active += 1;
                return GatePermit { gate: self.clone() };
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(
                active = state.active,
                queued = state.waiters.len(),
                "Gate full, queueing caller"
            );
            rx
        };

        let mut waiter = Waiter {
            gate: self.clone(),
            rx: Some(rx),
        };
        if let Some(rx) = waiter.rx.as_mut() {
            // The sender is only dropped unsent if the gate itself goes away
            let _ = rx.await;
        }
        waiter.rx = None;
        GatePermit { gate: self.clone() }
    }

    // == Release ==
    /// Frees one slot and wakes the longest-waiting caller, if any.
    fn release(&self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
        state.admit_waiters();
    }

    // == Set Max ==
    /// Changes the slot count. Raising it admits queued callers right away;
    /// lowering it takes effect as current holders release.
    pub fn set_max(&self, max: usize) {
        let mut state = self.state.lock();
        state.max = max;
        state.admit_waiters();
    }

    /// Configured slot count.
    pub fn max(&self) -> usize {
        self.state.lock().max
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.state.lock().active
    }

    /// Callers waiting for a slot.
    pub fn queued(&self) -> usize {
        self.state
            .lock()
            .waiters
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

// == Waiter ==
/// A queued `acquire` call; returns a slot it was granted but never claimed.
struct Waiter {
    gate: ConcurrencyGate,
    rx: Option<oneshot::Receiver<()>>,
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.gate.release();
            }
        }
    }
}

// == Gate Permit ==
/// Proof of a held slot; releases it on drop.
#[derive(Debug)]
pub struct GatePermit {
    gate: ConcurrencyGate,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
