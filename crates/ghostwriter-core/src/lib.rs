//! # ghostwriter-core
//!
//! Shared protocol library for GhostWriter: the two nested layers of the
//! real-time wire protocol spoken between the phone-side client and the PC
//! server, plus the generation counter used to tell connection attempts apart.
//!
//! This crate has no dependencies on sockets, timers, or an async runtime.
//!
//! # Protocol overview
//!
//! Every WebSocket text frame starts with a one-character *transport* tag
//! (Engine.IO v4).  A `message` envelope (tag `4`) wraps a second,
//! *application* packet (Socket.IO v4) whose own leading character selects
//! between `connect` and `event`:
//!
//! ```text
//! 0{"sid":"abc","pingInterval":25000,"pingTimeout":20000}   open
//! 2                                                         ping
//! 3                                                         pong
//! 40                                                        connect / ack
//! 42["text_input",{"text":"hi","mode":"stream"}]            event
//! ```
//!
//! - **`protocol::frames`** – the typed values for both layers.
//! - **`protocol::codec`** – text ↔ frame conversion.  Decoding never panics;
//!   every malformed input becomes a [`FrameError`] the caller can drop.
//! - **`protocol::generation`** – per-attempt epoch identifiers.

pub mod protocol;

pub use protocol::codec::{decode, decode_packet, encode_event, encode_frame, encode_handshake, encode_pong, FrameError};
pub use protocol::frames::{ApplicationPacket, OpenPayload, TransportFrame};
pub use protocol::generation::{Generation, GenerationCounter};
