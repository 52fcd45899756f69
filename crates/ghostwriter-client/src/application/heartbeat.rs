//! Liveness tracking for one transport instance.
//!
//! The server pings every `ping_interval`; if neither a ping nor any other
//! liveness frame arrives within `ping_interval + ping_timeout` of the last
//! one, the connection is presumed dead even if the socket never reported a
//! close.  The monitor owns the single deadline for that and nothing else.

use std::time::{Duration, Instant};

use crate::application::timer::TimerSlot;
use crate::domain::config::HeartbeatConfig;

/// Deadline keeper for server heartbeats.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    default_interval: Duration,
    default_timeout: Duration,
    interval: Duration,
    timeout: Duration,
    slot: TimerSlot,
}

impl HeartbeatMonitor {
    /// Creates an idle monitor whose parameters start at the given defaults.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            default_interval: interval,
            default_timeout: timeout,
            interval,
            timeout,
            slot: TimerSlot::new(),
        }
    }

    pub fn from_config(config: &HeartbeatConfig) -> Self {
        Self::new(config.ping_interval(), config.ping_timeout())
    }

    /// Restores the default parameters.  Called at the start of every
    /// transport instance, so one server's values never leak into the next.
    pub fn reset_to_defaults(&mut self) {
        self.interval = self.default_interval;
        self.timeout = self.default_timeout;
    }

    /// Records the server's parameters (keeping the current value for any
    /// that is `None`) and schedules the deadline `interval + timeout` from
    /// `now`, replacing any earlier one.
    pub fn arm(&mut self, now: Instant, interval: Option<Duration>, timeout: Option<Duration>) {
        if let Some(interval) = interval {
            self.interval = interval;
        }
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        self.slot.arm(now, self.window());
    }

    /// Pushes the deadline out using the last known parameters.
    pub fn on_liveness_signal(&mut self, now: Instant) {
        self.slot.arm(now, self.window());
    }

    pub fn cancel(&mut self) {
        self.slot.cancel();
    }

    /// Returns `true` exactly once when the deadline has passed; the monitor
    /// is idle afterwards until re-armed.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        self.slot.fire_if_due(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.deadline()
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_armed()
    }

    /// Total silence tolerated before declaring the connection dead.
    pub fn window(&self) -> Duration {
        self.interval + self.timeout
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::from_config(&HeartbeatConfig::default())
    }
}
