//! Protocol module containing frame types, the text codec, and attempt generations.

pub mod codec;
pub mod frames;
pub mod generation;

pub use codec::{decode, decode_packet, encode_event, encode_frame, encode_handshake, encode_pong, FrameError};
pub use frames::{ApplicationPacket, OpenPayload, TransportFrame};
pub use generation::{Generation, GenerationCounter};
