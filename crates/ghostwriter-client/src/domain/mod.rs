//! Domain layer for ghostwriter-client.
//!
//! Plain data with no I/O, no async, and no timers:
//!
//! - Session lifecycle states
//! - Configuration structures and their TOML representation
//! - Typed payloads of the remote-typing application events
//!
//! The session core never looks inside application payloads; only the
//! consumer-facing code in `application::remote_input` and `main.rs` uses the
//! typed messages defined here.

pub mod config;
pub mod messages;
pub mod state;

pub use config::{BackoffConfig, ClientConfig, ConfigError, HeartbeatConfig, ServerConfig};
pub use messages::{
    ContextUpdate, CursorDirection, InputMode, KeyCommand, MoveCursor, RequestContext,
    ServerError, StatusUpdate, TextInput,
};
pub use state::SessionState;
