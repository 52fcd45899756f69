//! Application layer for ghostwriter-client.
//!
//! # What lives here?
//!
//! - **`session`** – The Socket.IO client state machine.  It owns one
//!   transport at a time, answers heartbeats, performs the handshake, and
//!   reschedules connection attempts after any loss.  It is synchronous: the
//!   owner feeds it transport events and timer ticks.
//!
//! - **`heartbeat`**, **`reconnect`**, **`timer`** – The two deadlines the
//!   session keeps, built on a cancellable slot and an injectable clock.
//!
//! - **`event_router`** – Ordered handler lists with failure isolation.
//!
//! - **`transport`** – The `Connector` / `TransportHandle` traits the
//!   infrastructure layer implements.
//!
//! - **`remote_input`** – Turns operator lines into remote-typing events.

pub mod event_router;
pub mod heartbeat;
pub mod reconnect;
pub mod remote_input;
pub mod session;
pub mod timer;
pub mod transport;
