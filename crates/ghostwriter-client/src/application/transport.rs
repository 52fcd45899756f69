//! The seam between the session and the byte-moving socket.
//!
//! The session never touches a socket.  It asks a [`Connector`] to open one,
//! tagging the request with the attempt's [`Generation`], and receives back a
//! [`TransportHandle`] for writing.  Everything the socket reports afterwards
//! arrives as a [`TransportEvent`] carrying that same generation, delivered
//! by whoever owns the session (the driver task, or a test).

use ghostwriter_core::Generation;
use thiserror::Error;

/// Errors raised by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport could not be created at all.
    #[error("failed to create transport: {0}")]
    Construction(String),

    /// A write was attempted on a transport that has already shut down.
    #[error("transport is closed")]
    Closed,
}

/// Creates one transport instance per connection attempt.
///
/// Implementations must report every later occurrence on the new socket as a
/// [`TransportEvent`] tagged with `generation`, starting with
/// [`TransportEventKind::Opened`] once the socket is ready for writing and
/// ending with exactly one [`TransportEventKind::Closed`].
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send {
    /// Starts opening a socket to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Construction`] if the transport cannot even
    /// be created (bad URL, missing TLS support, and the like).
    fn open(
        &mut self,
        url: &str,
        generation: Generation,
    ) -> Result<Box<dyn TransportHandle>, TransportError>;
}

/// Write side of one transport instance.
pub trait TransportHandle: Send {
    /// Queues one text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the socket has shut down.
    fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Starts closing the socket.  Idempotent.
    fn close(&mut self);
}

/// Something that happened on a transport instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub generation: Generation,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The socket is connected and writable.
    Opened,
    /// One inbound text frame.
    Text(String),
    /// The socket failed; a `Closed` follows.
    Error(String),
    /// The socket is gone.
    Closed,
}

impl TransportEvent {
    pub fn opened(generation: Generation) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Opened,
        }
    }

    pub fn text(generation: Generation, frame: impl Into<String>) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Text(frame.into()),
        }
    }

    pub fn error(generation: Generation, cause: impl Into<String>) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Error(cause.into()),
        }
    }

    pub fn closed(generation: Generation) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Closed,
        }
    }
}
