//! Cancellable timer slots and an injectable clock.
//!
//! Nothing in the application layer sleeps.  A [`TimerSlot`] only remembers
//! a deadline; whoever owns the session (the tokio driver in production, the
//! test body in tests) asks for the earliest deadline, waits until then by
//! whatever means it likes, and calls back in to let due slots fire.
//!
//! Because a slot is checked against the current time *at the moment it is
//! polled*, cancelling it is deterministic: a slot cancelled before the poll
//! cannot fire, even if its deadline has already passed.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of "now" for every timer in the session.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to the session
/// and keep another to advance.
///
/// ```rust
/// use std::time::Duration;
/// use ghostwriter_client::application::timer::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(600));
/// assert_eq!(clock.now() - start, Duration::from_millis(600));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Moves time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }

    /// Total time advanced since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

/// A single one-shot timer: armed with a deadline, or idle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TimerSlot {
    deadline: Option<Instant>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the slot for `now + delay`, replacing any earlier deadline.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fires the slot if its deadline has been reached.
    ///
    /// Returns `true` at most once per arming; the slot is idle afterwards.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// The earlier of two optional deadlines.
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
