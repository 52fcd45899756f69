//! Event-name → handler registry with failure isolation.
//!
//! Handlers for one name run in registration order.  A handler that returns
//! an error or panics is reported (to `tracing` and, if installed, to the
//! error hook) and skipped; the remaining handlers for the same dispatch and
//! all later dispatches still run.
//!
//! Registrations belong to the session, not to a transport instance, so they
//! survive reconnects.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use thiserror::Error;
use tracing::{trace, warn};

/// Local event raised when the handshake completes.
pub const EVENT_CONNECT: &str = "connect";
/// Local event raised when a connected session loses its transport.
pub const EVENT_DISCONNECT: &str = "disconnect";
/// Local event raised whenever a retry is about to be scheduled.
pub const EVENT_RECONNECT_ATTEMPT: &str = "reconnect_attempt";
/// Local event raised when the transport could not be created or failed.
/// Its argument is `{"message": "<cause>"}`.
pub const EVENT_CONNECT_ERROR: &str = "connect_error";

/// What a handler reports back.  Errors are isolated, never propagated.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A registered handler.  Receives the event's single argument, if any.
pub type Handler = Box<dyn FnMut(Option<&Value>) -> HandlerResult + Send>;

/// Observer for handler failures.
pub type ErrorHook = Box<dyn FnMut(&HandlerFailure) + Send>;

/// A handler that did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFailure {
    #[error("handler #{index} for '{event}' returned an error: {message}")]
    Returned {
        event: String,
        index: usize,
        message: String,
    },

    #[error("handler #{index} for '{event}' panicked: {message}")]
    Panicked {
        event: String,
        index: usize,
        message: String,
    },
}

impl HandlerFailure {
    pub fn event(&self) -> &str {
        match self {
            HandlerFailure::Returned { event, .. } | HandlerFailure::Panicked { event, .. } => event,
        }
    }
}

/// Ordered handler lists keyed by event name.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<String, Vec<Handler>>,
    error_hook: Option<ErrorHook>,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventRouter")
            .field("handlers", &counts)
            .field("error_hook", &self.error_hook.is_some())
            .finish()
    }
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the list for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(Option<&Value>) -> HandlerResult + Send + 'static,
    {
        self.register_boxed(name, Box::new(handler));
    }

    pub fn register_boxed(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.entry(name.into()).or_default().push(handler);
    }

    /// Installs (or replaces) the observer called for every handler failure.
    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.error_hook = Some(hook);
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }

    /// Runs every handler registered for `name`, in order, with `arg`.
    ///
    /// Returns the number of handlers that completed normally.
    pub fn dispatch(&mut self, name: &str, arg: Option<&Value>) -> usize {
        let Some(handlers) = self.handlers.get_mut(name) else {
            trace!(event = name, "no handlers registered");
            return 0;
        };

        let mut failures = Vec::new();
        let mut completed = 0;
        for (index, handler) in handlers.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(arg))) {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => failures.push(HandlerFailure::Returned {
                    event: name.to_string(),
                    index,
                    message: e.to_string(),
                }),
                Err(payload) => failures.push(HandlerFailure::Panicked {
                    event: name.to_string(),
                    index,
                    message: panic_message(payload.as_ref()),
                }),
            }
        }

        for failure in &failures {
            warn!("{failure}");
            if let Some(hook) = self.error_hook.as_mut() {
                // A panicking hook must not take the dispatch loop down either.
                if catch_unwind(AssertUnwindSafe(|| hook(failure))).is_err() {
                    warn!(event = failure.event(), "error hook panicked");
                }
            }
        }
        completed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
