//! Text codec for the two nested protocol layers.
//!
//! Wire format:
//! ```text
//! [transport tag:1][body...]
//! 4[packet tag:1][json...]      when the transport tag is `message`
//! ```
//!
//! Encoding is infallible.  Decoding is total: every input either yields a
//! [`TransportFrame`] or a [`FrameError`] describing why the frame should be
//! dropped.  Nothing in here panics on peer-controlled input.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::protocol::frames::{
    ApplicationPacket, OpenPayload, PacketTag, TransportFrame, TransportTag,
};

/// Reasons an inbound frame is dropped instead of dispatched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame (or the packet inside a `message` envelope) had no characters.
    #[error("empty frame")]
    Empty,

    /// The first character is not an Engine.IO transport tag.
    #[error("unknown transport tag: {0:?}")]
    UnknownTransportTag(char),

    /// The first character after `4` is not a supported Socket.IO packet tag.
    #[error("unknown packet tag: {0:?}")]
    UnknownPacketTag(char),

    /// The event body is not valid JSON.
    #[error("malformed event JSON: {0}")]
    MalformedJson(String),

    /// The event body parsed, but is not a JSON array.
    #[error("event payload is not a JSON array")]
    NotAnArray,

    /// The event array is empty or its first element is not a string.
    #[error("event array has no string name")]
    MissingEventName,
}

impl FrameError {
    /// `true` when the peer spoke a tag this client does not understand, as
    /// opposed to sending a recognised tag with a broken body.
    pub fn is_protocol_mismatch(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownTransportTag(_) | FrameError::UnknownPacketTag(_)
        )
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// The application-layer connect request: `message` envelope + `connect` packet.
///
/// ```rust
/// assert_eq!(ghostwriter_core::encode_handshake(), "40");
/// ```
pub fn encode_handshake() -> String {
    encode_frame(&TransportFrame::Message(ApplicationPacket::Connect(None)))
}

/// The heartbeat reply sent in response to every server `ping`.
pub fn encode_pong() -> String {
    encode_frame(&TransportFrame::Pong)
}

/// Encodes an outbound event as `42["name",data]`.
///
/// ```rust
/// use serde_json::json;
///
/// let frame = ghostwriter_core::encode_event("text_input", &json!({"text": "hi"}));
/// assert_eq!(frame, r#"42["text_input",{"text":"hi"}]"#);
/// ```
pub fn encode_event(name: &str, data: &Value) -> String {
    encode_frame(&TransportFrame::Message(ApplicationPacket::Event {
        name: name.to_string(),
        arg: Some(data.clone()),
    }))
}

/// Encodes any frame.  Used directly by test peers and benchmarks; the client
/// itself only needs the three helpers above.
pub fn encode_frame(frame: &TransportFrame) -> String {
    let mut out = String::new();
    out.push(frame.tag().as_char());

    match frame {
        TransportFrame::Open(payload) => {
            let body = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
            out.push_str(&body);
        }
        TransportFrame::Close | TransportFrame::Ping | TransportFrame::Pong => {}
        TransportFrame::Message(ApplicationPacket::Connect(data)) => {
            out.push(PacketTag::Connect.as_char());
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
        }
        TransportFrame::Message(ApplicationPacket::Event { name, arg }) => {
            out.push(PacketTag::Event.as_char());
            let mut items = vec![Value::String(name.clone())];
            if let Some(arg) = arg {
                items.push(arg.clone());
            }
            out.push_str(&Value::Array(items).to_string());
        }
    }

    out
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one WebSocket text frame.
///
/// # Errors
///
/// Returns [`FrameError`] for empty frames, unknown tags, and malformed event
/// bodies.  Callers are expected to log and drop the frame.
///
/// # Examples
///
/// ```rust
/// use ghostwriter_core::{decode, TransportFrame};
///
/// assert_eq!(decode("2"), Ok(TransportFrame::Ping));
/// assert!(decode("9").is_err());
/// ```
pub fn decode(raw: &str) -> Result<TransportFrame, FrameError> {
    let mut chars = raw.chars();
    let first = chars.next().ok_or(FrameError::Empty)?;
    let tag = TransportTag::try_from(first).map_err(|_| FrameError::UnknownTransportTag(first))?;
    let body = chars.as_str();

    match tag {
        TransportTag::Open => Ok(TransportFrame::Open(decode_open(body))),
        TransportTag::Close => Ok(TransportFrame::Close),
        // A ping may carry a `probe` body during transport upgrades; it is
        // still just a ping here.
        TransportTag::Ping => Ok(TransportFrame::Ping),
        TransportTag::Pong => Ok(TransportFrame::Pong),
        TransportTag::Message => decode_packet(body).map(TransportFrame::Message),
    }
}

/// Decodes the application packet carried inside a `message` envelope
/// (the text after the leading `4`).
///
/// # Errors
///
/// See [`decode`].
pub fn decode_packet(body: &str) -> Result<ApplicationPacket, FrameError> {
    let mut chars = body.chars();
    let first = chars.next().ok_or(FrameError::Empty)?;
    let tag = PacketTag::try_from(first).map_err(|_| FrameError::UnknownPacketTag(first))?;
    let rest = chars.as_str();

    match tag {
        PacketTag::Connect => Ok(ApplicationPacket::Connect(decode_connect_data(rest))),
        PacketTag::Event => decode_event(rest),
    }
}

/// An unreadable open payload is not fatal: the handshake proceeds with the
/// default heartbeat timing.
fn decode_open(body: &str) -> OpenPayload {
    if body.is_empty() {
        return OpenPayload::default();
    }
    serde_json::from_str(body).unwrap_or_else(|e| {
        debug!("open payload unreadable, using defaults: {e}");
        OpenPayload::default()
    })
}

fn decode_connect_data(rest: &str) -> Option<Value> {
    if rest.is_empty() {
        return None;
    }
    match serde_json::from_str(rest) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("connect packet body unreadable, ignoring it: {e}");
            None
        }
    }
}

fn decode_event(rest: &str) -> Result<ApplicationPacket, FrameError> {
    let value: Value =
        serde_json::from_str(rest).map_err(|e| FrameError::MalformedJson(e.to_string()))?;

    let Value::Array(items) = value else {
        return Err(FrameError::NotAnArray);
    };

    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(FrameError::MissingEventName),
    };

    Ok(ApplicationPacket::Event {
        name,
        arg: items.next(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
