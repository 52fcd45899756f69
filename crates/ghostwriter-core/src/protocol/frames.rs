//! Typed values for both protocol layers.
//!
//! The outer layer is the Engine.IO v4 *transport envelope*; the inner layer
//! is the Socket.IO v4 *application packet* carried inside a `message`
//! envelope.  Only the WebSocket transport is supported, so every frame is a
//! single text frame whose first character is the tag.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Path and query appended to the server host when opening the socket.
///
/// Long-polling fallback is not supported; the transport is pinned to
/// `websocket`.
pub const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Heartbeat interval used until the server's open payload supplies one.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(25_000);

/// Heartbeat grace period used until the server's open payload supplies one.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(20_000);

// ── Tags ──────────────────────────────────────────────────────────────────────

/// Leading character of every transport envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportTag {
    Open,
    Close,
    Ping,
    Pong,
    Message,
}

impl TransportTag {
    /// Returns the ASCII tag written on the wire.
    pub fn as_char(self) -> char {
        match self {
            TransportTag::Open => '0',
            TransportTag::Close => '1',
            TransportTag::Ping => '2',
            TransportTag::Pong => '3',
            TransportTag::Message => '4',
        }
    }
}

impl TryFrom<char> for TransportTag {
    type Error = ();

    fn try_from(value: char) -> Result<Self, ()> {
        match value {
            '0' => Ok(TransportTag::Open),
            '1' => Ok(TransportTag::Close),
            '2' => Ok(TransportTag::Ping),
            '3' => Ok(TransportTag::Pong),
            '4' => Ok(TransportTag::Message),
            _ => Err(()),
        }
    }
}

/// Leading character of an application packet (after the `4` envelope tag).
///
/// Only the two packet kinds this client speaks are represented; namespaces,
/// acknowledgements, and binary packets are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketTag {
    Connect,
    Event,
}

impl PacketTag {
    /// Returns the ASCII tag written on the wire.
    pub fn as_char(self) -> char {
        match self {
            PacketTag::Connect => '0',
            PacketTag::Event => '2',
        }
    }
}

impl TryFrom<char> for PacketTag {
    type Error = ();

    fn try_from(value: char) -> Result<Self, ()> {
        match value {
            '0' => Ok(PacketTag::Connect),
            '2' => Ok(PacketTag::Event),
            _ => Err(()),
        }
    }
}

// ── Open payload ──────────────────────────────────────────────────────────────

/// JSON body of the server's `open` envelope.
///
/// Unknown fields (`upgrades`, `maxPayload`, ...) are ignored.  Zero values
/// are treated the same as absent ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenPayload {
    /// Engine.IO session identifier assigned by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Milliseconds between server pings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_interval: Option<u64>,
    /// Milliseconds the server allows for a missing ping before giving up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_timeout: Option<u64>,
}

impl OpenPayload {
    /// Server-declared ping interval, if present and non-zero.
    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Server-declared ping timeout, if present and non-zero.
    pub fn ping_timeout(&self) -> Option<Duration> {
        self.ping_timeout
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

// ── Frames ────────────────────────────────────────────────────────────────────

/// An application packet carried inside a `message` envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationPacket {
    /// `0` – connect request (client → server) or acknowledgement
    /// (server → client).  The server may attach a JSON object.
    Connect(Option<Value>),
    /// `2` – a named event with at most one JSON argument.
    ///
    /// `arg` is `None` when the server sent `["name"]` without a payload.
    Event { name: String, arg: Option<Value> },
}

/// A decoded transport envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFrame {
    /// `0` – the server accepted the transport and declares heartbeat timing.
    Open(OpenPayload),
    /// `1` – graceful shutdown requested by the peer.
    Close,
    /// `2` – heartbeat probe (server → client).
    Ping,
    /// `3` – heartbeat reply (client → server).
    Pong,
    /// `4` – wraps an application packet.
    Message(ApplicationPacket),
}

impl TransportFrame {
    /// The transport tag this frame is written with.
    pub fn tag(&self) -> TransportTag {
        match self {
            TransportFrame::Open(_) => TransportTag::Open,
            TransportFrame::Close => TransportTag::Close,
            TransportFrame::Ping => TransportTag::Ping,
            TransportFrame::Pong => TransportTag::Pong,
            TransportFrame::Message(_) => TransportTag::Message,
        }
    }

    /// Returns `true` for frames that prove the peer is still alive and
    /// therefore re-arm the heartbeat deadline.
    pub fn is_liveness_signal(&self) -> bool {
        matches!(
            self,
            TransportFrame::Open(_) | TransportFrame::Ping | TransportFrame::Pong
        )
    }
}
