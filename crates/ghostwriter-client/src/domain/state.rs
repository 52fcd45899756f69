//! Session lifecycle states.

use std::fmt;

/// Where a [`ClientSession`](crate::application::session::ClientSession) is
/// in its connection lifecycle.
///
/// ```text
/// Idle ─connect()→ Connecting ─open frame→ HandshakePending ─connect ack→ Connected
///                      │                         │                          │
///                      └──────── loss ───────────┴────────── loss ──────────┘
///                                               ↓
///                                        ReconnectPending ─timer→ Connecting
///
/// any ─disconnect()→ Closing → Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No transport and no pending retry.
    #[default]
    Idle,
    /// A transport has been opened; waiting for the server's open envelope.
    Connecting,
    /// The handshake packet was sent; waiting for the server's acknowledgement.
    HandshakePending,
    /// The handshake completed; events flow in both directions.
    Connected,
    /// The last transport was lost; a retry timer is pending.
    ReconnectPending,
    /// `disconnect()` is tearing everything down.
    Closing,
}

impl SessionState {
    /// The derived `connected` flag: `true` only in [`SessionState::Connected`].
    pub fn is_connected(self) -> bool {
        self == SessionState::Connected
    }

    /// States from which an unexpected loss leads to a reconnect.
    pub fn is_live(self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Closing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::HandshakePending => "handshake-pending",
            SessionState::Connected => "connected",
            SessionState::ReconnectPending => "reconnect-pending",
            SessionState::Closing => "closing",
        };
        f.write_str(label)
    }
}
