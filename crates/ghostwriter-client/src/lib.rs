//! ghostwriter-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does ghostwriter-client do?
//!
//! A GhostWriter server runs on a PC and types whatever it receives at the
//! PC's text cursor.  This crate is the phone-side half:
//!
//! 1. Opens a WebSocket to the server and speaks just enough Engine.IO v4 /
//!    Socket.IO v4 to stay connected: answer the open envelope with the
//!    `"40"` handshake, reply to every ping, and notice silent deaths.
//! 2. Reconnects on any loss with exponential backoff (600 ms → 5 s).
//! 3. Lets the caller `emit` named events (`text_input`, `move_cursor`, ...)
//!    and subscribe to the server's (`status_update`, `context_update`, ...)
//!    without ever looking inside the payloads.
//!
//! The `ghostwriter` binary wraps this in a line-oriented terminal front end.

/// Application layer: the session state machine and its collaborators.
pub mod application;

/// Domain layer: configuration, session states, and typed event payloads.
pub mod domain;

/// Infrastructure layer: WebSocket transport, Tokio driver, config file.
pub mod infrastructure;
