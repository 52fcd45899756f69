//! Operator input → remote-typing events.
//!
//! Each stdin line is either text to type at the remote cursor or a slash
//! command:
//!
//! | line                      | effect                                   |
//! |---------------------------|------------------------------------------|
//! | `hello`                   | `text_input` in the current mode         |
//! | `//etc`                   | `text_input` of the literal `/etc`       |
//! | `/back`                   | `key_command` backspace                  |
//! | `/left [N]`, `/right [N]` | `move_cursor` by N (default 1) steps     |
//! | `/ctx`, `/ctx!`           | `request_context`, gentle or forced      |
//! | `/mode stream\|batch\|replace` | switch the local input mode         |
//! | `/quit`                   | disconnect and exit                      |
//!
//! Edits that change the remote text are followed by a `request_context`
//! after a short settling delay, so the preview tracks the remote field.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::messages::{
    CursorDirection, InputMode, KeyCommand, MoveCursor, RequestContext, TextInput, KEY_COMMAND,
    MOVE_CURSOR, REQUEST_CONTEXT, TEXT_INPUT,
};

/// Settling delay before the first context request of a fresh connection.
pub const CONTEXT_AFTER_CONNECT: Duration = Duration::from_millis(500);
/// Settling delay after a stream-mode `text_input`.
pub const CONTEXT_AFTER_STREAM_INPUT: Duration = Duration::from_millis(50);
/// Settling delay after a cursor move.
pub const CONTEXT_AFTER_MOVE: Duration = Duration::from_millis(150);
/// Settling delay after a backspace.
pub const CONTEXT_AFTER_BACKSPACE: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputParseError {
    #[error("unknown command '/{0}' (try /back, /left, /right, /ctx, /mode, /quit)")]
    UnknownCommand(String),

    #[error("'{0}' is not a positive step count")]
    InvalidSteps(String),

    #[error("{0}")]
    InvalidMode(String),

    #[error("/mode needs one of: stream, batch, replace")]
    MissingMode,
}

/// One parsed operator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Text(String),
    Backspace,
    Move {
        direction: CursorDirection,
        steps: u32,
    },
    RequestContext {
        force: bool,
    },
    SetMode(InputMode),
    Quit,
}

/// An application event ready for `emit`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub name: &'static str,
    pub payload: Value,
}

impl OutboundEvent {
    fn new(name: &'static str, payload: &impl Serialize) -> Self {
        Self {
            name,
            // Plain structs of strings, bools and integers always serialize.
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }

    pub fn request_context(force: bool) -> Self {
        Self::new(REQUEST_CONTEXT, &RequestContext { force })
    }
}

/// Parses one line.  Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// Returns [`InputParseError`] for unknown commands and bad arguments.
pub fn parse_line(line: &str) -> Result<Option<InputCommand>, InputParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    if let Some(literal) = line.strip_prefix("//") {
        return Ok(Some(InputCommand::Text(format!("/{literal}"))));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(InputCommand::Text(line.to_string())));
    };

    let mut words = command.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let arg = words.next();
    let parsed = match verb {
        "back" => InputCommand::Backspace,
        "left" => InputCommand::Move {
            direction: CursorDirection::Left,
            steps: parse_steps(arg)?,
        },
        "right" => InputCommand::Move {
            direction: CursorDirection::Right,
            steps: parse_steps(arg)?,
        },
        "ctx" => InputCommand::RequestContext { force: false },
        "ctx!" => InputCommand::RequestContext { force: true },
        "mode" => {
            let mode = arg.ok_or(InputParseError::MissingMode)?;
            InputCommand::SetMode(mode.parse().map_err(InputParseError::InvalidMode)?)
        }
        "quit" | "exit" => InputCommand::Quit,
        other => return Err(InputParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(parsed))
}

fn parse_steps(arg: Option<&str>) -> Result<u32, InputParseError> {
    let Some(raw) = arg else {
        return Ok(1);
    };
    match raw.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(InputParseError::InvalidSteps(raw.to_string())),
    }
}

/// What the front end should do with a parsed line.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Emit `event` now and, if `refresh_after` is set, a gentle
    /// `request_context` once that delay has passed.
    Send {
        event: OutboundEvent,
        refresh_after: Option<Duration>,
    },
    ModeChanged(InputMode),
    Quit,
}

/// Operator-side input state: the current mode.
#[derive(Debug, Clone, Default)]
pub struct RemoteInput {
    mode: InputMode,
}

impl RemoteInput {
    pub fn new(mode: InputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Turns a command into an action, updating the mode when asked to.
    pub fn apply(&mut self, command: InputCommand) -> InputAction {
        match command {
            InputCommand::Text(text) => {
                let refresh_after =
                    (self.mode == InputMode::Stream).then_some(CONTEXT_AFTER_STREAM_INPUT);
                InputAction::Send {
                    event: OutboundEvent::new(
                        TEXT_INPUT,
                        &TextInput {
                            text,
                            mode: self.mode,
                        },
                    ),
                    refresh_after,
                }
            }
            InputCommand::Backspace => InputAction::Send {
                event: OutboundEvent::new(KEY_COMMAND, &KeyCommand::backspace()),
                refresh_after: Some(CONTEXT_AFTER_BACKSPACE),
            },
            InputCommand::Move { direction, steps } => InputAction::Send {
                event: OutboundEvent::new(MOVE_CURSOR, &MoveCursor { direction, steps }),
                refresh_after: Some(CONTEXT_AFTER_MOVE),
            },
            InputCommand::RequestContext { force } => InputAction::Send {
                event: OutboundEvent::request_context(force),
                refresh_after: None,
            },
            InputCommand::SetMode(mode) => {
                self.mode = mode;
                InputAction::ModeChanged(mode)
            }
            InputCommand::Quit => InputAction::Quit,
        }
    }
}
