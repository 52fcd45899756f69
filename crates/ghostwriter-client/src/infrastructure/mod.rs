//! Infrastructure layer for the client.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `ghostwriter_core`, but MUST NOT be imported by the `application` or
//! domain layers.
//!
//! # Sub-modules
//!
//! - **`websocket`** – tokio-tungstenite implementation of `Connector`.  One
//!   spawned task per socket moves text frames in both directions.
//!
//! - **`driver`** – The Tokio task that owns the session and the cloneable
//!   `SessionHandle` the rest of the program talks to.
//!
//! - **`config_store`** – Locates and reads the TOML config file.
//!
//! - **`mock`** – A scripted, in-memory `Connector` for tests.

pub mod config_store;
pub mod driver;
pub mod mock;
pub mod websocket;
