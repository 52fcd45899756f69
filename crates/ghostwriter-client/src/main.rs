//! GhostWriter terminal client entry point.
//!
//! Connects to a GhostWriter server and types whatever is entered on stdin at
//! the remote PC's cursor.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::into_client_config()   -- defaults < config file < env < flags
//!  └─ SessionHandle::spawn()      -- driver task owning the session
//!  └─ register_handlers()         -- print status/context/errors
//!  └─ stdin loop
//!       ├─ text        -> text_input (+ request_context in stream mode)
//!       ├─ /back ...   -> key_command / move_cursor / request_context
//!       └─ /quit, EOF, Ctrl+C -> disconnect and exit
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ghostwriter_client::application::event_router::{
    HandlerFailure, EVENT_CONNECT, EVENT_CONNECT_ERROR, EVENT_DISCONNECT,
    EVENT_RECONNECT_ATTEMPT,
};
use ghostwriter_client::application::remote_input::{
    parse_line, InputAction, RemoteInput, CONTEXT_AFTER_CONNECT,
};
use ghostwriter_client::domain::messages::{
    ContextUpdate, InputMode, RequestContext, ServerError, StatusUpdate, CONTEXT_UPDATE,
    REQUEST_CONTEXT, SERVER_ERROR, STATUS_UPDATE,
};
use ghostwriter_client::domain::ClientConfig;
use ghostwriter_client::infrastructure::config_store::{default_config_path, load_config};
use ghostwriter_client::infrastructure::driver::{DriverError, SessionHandle, WeakSessionHandle};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// GhostWriter terminal client.
///
/// Streams typed lines to a GhostWriter server, which types them at the
/// focused text field of the PC it runs on.
#[derive(Debug, Parser)]
#[command(
    name = "ghostwriter",
    about = "Type at a remote PC's cursor from the terminal",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    ///
    /// Defaults to the platform config directory
    /// (e.g. `~/.config/ghostwriter/config.toml`); a missing default file is
    /// not an error.
    #[arg(long, env = "GHOSTWRITER_CONFIG")]
    config: Option<PathBuf>,

    /// `host:port` of the GhostWriter server, overriding the config file.
    #[arg(long, env = "GHOSTWRITER_HOST")]
    host: Option<String>,

    /// Connect with `wss://` instead of `ws://`.
    #[arg(long, env = "GHOSTWRITER_SECURE")]
    secure: bool,

    /// Initial input mode: stream, batch or replace.
    #[arg(long, default_value = "stream", env = "GHOSTWRITER_MODE")]
    mode: InputMode,
}

impl Cli {
    /// Resolves the effective configuration and starting input mode.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file does not exist, if
    /// the file cannot be read or parsed, or if the merged values are invalid.
    fn into_client_config(self) -> anyhow::Result<(ClientConfig, InputMode)> {
        let mut config = match self.config {
            Some(path) => {
                anyhow::ensure!(path.exists(), "config file {} does not exist", path.display());
                load_config(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            }
            None => match default_config_path() {
                Some(path) => load_config(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                None => ClientConfig::default(),
            },
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if self.secure {
            config.server.secure = true;
        }
        config.validate().context("invalid configuration")?;

        Ok((config, self.mode))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (config, mode) = cli.into_client_config()?;
    info!("GhostWriter client starting — server={}", config.socket_url());

    // ── Session ───────────────────────────────────────────────────────────────
    let (session, driver) = SessionHandle::spawn(&config);
    register_handlers(&session).context("session driver stopped during setup")?;
    session.connect().context("session driver stopped during setup")?;

    // ── Operator input loop ───────────────────────────────────────────────────
    let mut input = RemoteInput::new(mode);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("mode: {}  (commands: /back /left N /right N /ctx /ctx! /mode M /quit)", input.mode());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };
                if !handle_line(&session, &mut input, &line)? {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                info!("received Ctrl+C — shutting down");
                break;
            }
        }
    }

    // The driver may already be gone; shutting down is then a no-op.
    let _ = session.shutdown();
    driver.await.context("session driver panicked")?;
    info!("GhostWriter client stopped");
    Ok(())
}

/// Applies one operator line.  Returns `false` when the operator asked to quit.
fn handle_line(
    session: &SessionHandle,
    input: &mut RemoteInput,
    line: &str,
) -> Result<bool, DriverError> {
    let command = match parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(true),
        Err(e) => {
            eprintln!("{e}");
            return Ok(true);
        }
    };

    match input.apply(command) {
        InputAction::Send {
            event,
            refresh_after,
        } => {
            if !session.is_connected() {
                eprintln!("not connected; '{}' dropped", event.name);
            }
            session.emit(event.name, event.payload)?;
            if let Some(delay) = refresh_after {
                refresh_context_after(session.downgrade(), delay);
            }
            Ok(true)
        }
        InputAction::ModeChanged(mode) => {
            println!("mode: {mode}");
            Ok(true)
        }
        InputAction::Quit => Ok(false),
    }
}

/// Requests a gentle context refresh once `delay` has passed.
fn refresh_context_after(session: WeakSessionHandle, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = session.emit_json(REQUEST_CONTEXT, &RequestContext::default()) {
            debug!("context refresh skipped: {e}");
        }
    });
}

fn parse_arg<T: serde::de::DeserializeOwned>(
    arg: Option<&Value>,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    Ok(serde_json::from_value(arg.cloned().unwrap_or(Value::Null))?)
}

fn register_handlers(session: &SessionHandle) -> Result<(), DriverError> {
    let handle = session.downgrade();
    session.on(EVENT_CONNECT, move |_| {
        println!("● connected");
        refresh_context_after(handle.clone(), CONTEXT_AFTER_CONNECT);
        Ok(())
    })?;

    session.on(EVENT_DISCONNECT, |_| {
        println!("○ disconnected — reconnecting…");
        Ok(())
    })?;

    session.on(EVENT_RECONNECT_ATTEMPT, |_| {
        debug!("reconnect attempt scheduled");
        Ok(())
    })?;

    session.on(EVENT_CONNECT_ERROR, |arg| {
        let cause = arg
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        warn!("connect error: {cause}");
        Ok(())
    })?;

    session.on(STATUS_UPDATE, |arg| {
        let status: StatusUpdate = parse_arg(arg)?;
        let host = status.hostname.as_deref().unwrap_or("?");
        if status.is_replaced() {
            println!("! another device took over {host}");
        } else {
            println!("● {host}: {}", status.status);
        }
        Ok(())
    })?;

    session.on(CONTEXT_UPDATE, |arg| {
        let ctx: ContextUpdate = parse_arg(arg)?;
        let app = ctx.app_name.as_deref().unwrap_or("?");
        if ctx.supported {
            println!("[{app}] {}", ctx.caret_preview());
        } else {
            let reason = ctx.reason.as_deref().unwrap_or("unsupported");
            println!("[{app}] context unavailable ({reason})");
        }
        Ok(())
    })?;

    session.on(SERVER_ERROR, |arg| {
        let err: ServerError = parse_arg(arg)?;
        let code = err.code.as_deref().unwrap_or("ERROR");
        match err.detail.as_deref().filter(|d| !d.is_empty()) {
            Some(detail) => eprintln!("server error {code}: {} ({detail})", err.message),
            None => eprintln!("server error {code}: {}", err.message),
        }
        Ok(())
    })?;

    session.set_error_hook(Box::new(|failure: &HandlerFailure| {
        eprintln!("handler failed: {failure}");
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
