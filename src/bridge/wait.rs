//! Bounded-wait bridge: asynchronous host primitives made synchronous.
//!
//! Capture and script evaluation complete on the host's event loop; the
//! switch path needs them as deterministic sequential steps. The bridge
//! pumps the hosting loop in small increments until the completion slot
//! fills or the timeout elapses - never an unbounded block, never a real
//! thread block. Single-threaded by design (Rc, not Arc): all completion
//! happens on the one event loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Timed-out bounded wait; carries how long was actually waited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout {
    pub waited: Duration,
}

impl std::fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bounded wait timed out after {:?}", self.waited)
    }
}

impl std::error::Error for WaitTimeout {}

/// The hosting event loop. `pump` runs queued callbacks for at most
/// `slice`; `now` is the loop's clock (virtual in tests).
pub trait EventPump {
    fn pump(&mut self, slice: Duration);
    fn now(&self) -> Instant;
}

/// Single-shot completion slot for one asynchronous host operation
#[derive(Debug)]
pub struct PendingOp<T> {
    slot: Rc<RefCell<Option<T>>>,
}

/// Producer half of a [`PendingOp`]; the host completes it from a pumped
/// callback
#[derive(Debug)]
pub struct Completion<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> PendingOp<T> {
    pub fn new() -> (Self, Completion<T>) {
        let slot = Rc::new(RefCell::new(None));
        (
            Self {
                slot: Rc::clone(&slot),
            },
            Completion { slot },
        )
    }

    /// An operation that is already complete (synchronous host paths)
    pub fn ready(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(value))),
        }
    }

    /// Take the result if the operation has completed
    pub fn try_take(&self) -> Option<T> {
        self.slot.borrow_mut().take()
    }
}

impl<T> Completion<T> {
    pub fn complete(&self, value: T) {
        *self.slot.borrow_mut() = Some(value);
    }
}

/// Pump the event loop in `slice` increments until `op` completes or
/// `timeout` elapses. The only suspension primitive in the switch path.
pub fn await_bounded<T>(
    pump: &mut dyn EventPump,
    op: &PendingOp<T>,
    timeout: Duration,
    slice: Duration,
) -> Result<T, WaitTimeout> {
    let started = pump.now();
    loop {
        if let Some(value) = op.try_take() {
            return Ok(value);
        }
        let waited = pump.now().duration_since(started);
        if waited >= timeout {
            return Err(WaitTimeout { waited });
        }
        pump.pump(slice);
    }
}
