//! Exponential backoff between reconnection attempts.
//!
//! | attempt | delay (ms) |
//! |---------|------------|
//! | 1       | 600        |
//! | 2       | 960        |
//! | 3       | 1536       |
//! | 4       | 2457.6     |
//! | 5       | 3932.16    |
//! | 6+      | 5000       |
//!
//! The delay advances when a scheduled attempt fires and drops back to the
//! floor on every successful handshake.  At most one attempt is pending at a
//! time, so repeated loss notifications for the same outage schedule once.

use std::time::{Duration, Instant};

use crate::application::timer::TimerSlot;
use crate::domain::config::BackoffConfig;

/// Owner of the single pending reconnect timer and the current delay.
#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    floor_ms: f64,
    ceiling_ms: f64,
    factor: f64,
    current_ms: f64,
    slot: TimerSlot,
}

impl ReconnectScheduler {
    pub fn new(config: &BackoffConfig) -> Self {
        let floor_ms = config.floor_ms as f64;
        Self {
            floor_ms,
            ceiling_ms: config.ceiling_ms as f64,
            factor: config.factor,
            current_ms: floor_ms,
            slot: TimerSlot::new(),
        }
    }

    /// Arms the timer for the current delay unless an attempt is already
    /// pending.  Returns the delay when a new attempt was scheduled.
    pub fn schedule_if_idle(&mut self, now: Instant) -> Option<Duration> {
        if self.slot.is_armed() {
            return None;
        }
        let delay = self.current_delay();
        self.slot.arm(now, delay);
        Some(delay)
    }

    /// Returns `true` once when the pending attempt is due, advancing the
    /// delay for the attempt after it.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        if !self.slot.fire_if_due(now) {
            return false;
        }
        self.current_ms = (self.current_ms * self.factor).min(self.ceiling_ms);
        true
    }

    pub fn reset_to_floor(&mut self) {
        self.current_ms = self.floor_ms;
    }

    /// Drops the pending attempt, if any.
    pub fn cancel_pending(&mut self) {
        self.slot.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_armed()
    }

    /// Delay the next scheduled attempt will use.
    pub fn current_delay(&self) -> Duration {
        Duration::from_micros((self.current_ms * 1000.0).round() as u64)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.deadline()
    }
}

impl Default for ReconnectScheduler {
    fn default() -> Self {
        Self::new(&BackoffConfig::default())
    }
}
