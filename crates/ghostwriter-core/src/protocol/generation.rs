//! Per-attempt generation identifiers.
//!
//! Every connection attempt gets a fresh [`Generation`].  Transport callbacks
//! carry the generation they were created for, and the session compares it
//! with its current one before acting.  A callback from a superseded attempt
//! (a late message after `disconnect()`, a close notification from a socket
//! that was already torn down) is therefore a no-op instead of corrupting the
//! state of the attempt that replaced it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one connection attempt.  Later attempts compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Wraps a raw value.  Mostly useful in tests.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A monotonically increasing source of [`Generation`]s.
///
/// The first generation handed out is `#1`; `#0` is never issued, so a zeroed
/// value can safely stand for "no attempt yet".
///
/// # Examples
///
/// ```rust
/// use ghostwriter_core::GenerationCounter;
///
/// let counter = GenerationCounter::new();
/// let first = counter.next();
/// let second = counter.next();
/// assert!(second > first);
/// ```
#[derive(Debug, Default)]
pub struct GenerationCounter {
    inner: AtomicU64,
}

impl GenerationCounter {
    /// Creates a counter that has not issued any generation yet.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Issues the next generation.
    ///
    /// Saturates at `u64::MAX` rather than wrapping.  Every issue after
    /// saturation returns that same value, so past 2^64 - 1 attempts two
    /// attempts can no longer be told apart.
    pub fn next(&self) -> Generation {
        let previous = self
            .inner
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_add(1))
            })
            .unwrap_or(u64::MAX);
        Generation(previous.saturating_add(1))
    }
}
