//! Typed payloads of the remote-typing application events.
//!
//! The session core carries every event payload as an opaque
//! [`serde_json::Value`].  These types exist for the consumer layer: the
//! operator front end serializes the outbound ones with
//! `SessionHandle::emit_json` and deserializes the inbound ones inside its
//! handlers.
//!
//! # Event flow
//!
//! ```text
//! Client → Server:  text_input, key_command, move_cursor, request_context
//! Server → Client:  status_update, context_update, error
//! ```
//!
//! Each payload is a plain JSON object; there is no `"type"` discriminant
//! because the event name already identifies the shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Event names ───────────────────────────────────────────────────────────────

/// Outbound: text to type at the remote cursor.
pub const TEXT_INPUT: &str = "text_input";
/// Outbound: a special key press.
pub const KEY_COMMAND: &str = "key_command";
/// Outbound: caret movement.
pub const MOVE_CURSOR: &str = "move_cursor";
/// Outbound: ask the server to read the text around the remote caret.
pub const REQUEST_CONTEXT: &str = "request_context";
/// Inbound: server greeting, or notice that another client took over.
pub const STATUS_UPDATE: &str = "status_update";
/// Inbound: text surrounding the remote caret.
pub const CONTEXT_UPDATE: &str = "context_update";
/// Inbound: the server rejected or failed to apply a request.
pub const SERVER_ERROR: &str = "error";

// ── Enumerations ──────────────────────────────────────────────────────────────

/// How the server should apply a `text_input`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Each chunk is typed as soon as it is produced.
    #[default]
    Stream,
    /// Text is accumulated locally and sent in one go.
    Batch,
    /// The sent text replaces the current field content.
    Replace,
}

impl InputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Stream => "stream",
            InputMode::Batch => "batch",
            InputMode::Replace => "replace",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" => Ok(InputMode::Stream),
            "batch" => Ok(InputMode::Batch),
            "replace" => Ok(InputMode::Replace),
            other => Err(format!(
                "unknown input mode '{other}' (expected stream, batch or replace)"
            )),
        }
    }
}

/// Direction of a `move_cursor` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorDirection {
    Left,
    Right,
}

// ── Client → Server ───────────────────────────────────────────────────────────

/// Payload of `text_input`.
///
/// ```json
/// {"text":"hello","mode":"stream"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
    #[serde(default)]
    pub mode: InputMode,
}

/// Payload of `key_command`.  The server only understands `"backspace"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCommand {
    pub key: String,
}

impl KeyCommand {
    pub fn backspace() -> Self {
        Self {
            key: "backspace".to_string(),
        }
    }
}

/// Payload of `move_cursor`.  The server ignores requests with zero steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCursor {
    pub direction: CursorDirection,
    pub steps: u32,
}

/// Payload of `request_context`.
///
/// `force` asks the server to try harder (e.g. a select-all/copy probe) when
/// the gentle accessibility read is unsupported by the focused app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub force: bool,
}

// ── Server → Client ───────────────────────────────────────────────────────────

/// Payload of `status_update`.
///
/// `status` is `"connected"` right after the handshake and `"replaced"` when
/// a newer client has taken over the server's single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl StatusUpdate {
    pub fn is_replaced(&self) -> bool {
        self.status == "replaced"
    }
}

/// Payload of `context_update`: the text immediately around the remote caret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUpdate {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub selected: Option<String>,
    /// Why the context could not be read, when `supported` is false.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ContextUpdate {
    /// One-line rendering with `|` marking the caret, e.g. `hel|lo`.
    /// A non-empty selection is shown as `[selection]` at the caret.
    pub fn caret_preview(&self) -> String {
        let before = self.before.as_deref().unwrap_or_default();
        let after = self.after.as_deref().unwrap_or_default();
        let caret = match self.selected.as_deref() {
            Some(sel) if !sel.is_empty() => format!("[{sel}]"),
            _ => "|".to_string(),
        };
        format!("{before}{caret}{after}").replace('\n', "⏎")
    }
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    /// Input mode of the request that failed, when the server echoes it.
    #[serde(default)]
    pub mode: Option<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
