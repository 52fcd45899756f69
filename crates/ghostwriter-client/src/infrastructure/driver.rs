//! Tokio driver: one task that owns the [`ClientSession`].
//!
//! # How it works
//!
//! The session is a synchronous state machine; something has to feed it.
//! The driver task waits on three sources at once:
//!
//! 1. transport events from the socket tasks,
//! 2. commands from any number of cloned [`SessionHandle`]s,
//! 3. the session's next timer deadline,
//!
//! and applies whichever is ready first.  Only this task ever touches the
//! session, so frames from one socket are handled strictly in arrival order
//! and handlers never run concurrently.  After every step the derived
//! `connected` flag is published on a `watch` channel.
//!
//! Handlers run on the driver task.  A handler that wants to emit holds a
//! [`WeakSessionHandle`] from [`SessionHandle::downgrade`]; its emit is queued
//! and applied on a later turn.  Weak handles do not keep the driver alive:
//! once the last `SessionHandle` is dropped the session disconnects and the
//! task ends.  A handler that captures a full `SessionHandle` keeps the
//! session running until `shutdown()` is called.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::event_router::{ErrorHook, Handler, HandlerResult};
use crate::application::session::ClientSession;
use crate::application::timer::Clock;
use crate::application::transport::{Connector, TransportEvent};
use crate::domain::config::ClientConfig;
use crate::infrastructure::websocket::WebSocketConnector;

/// Errors returned by [`SessionHandle`] operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver task has finished; nothing will be applied.
    #[error("session driver has stopped")]
    Stopped,

    /// An `emit_json` payload could not be turned into JSON.
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Requests a [`SessionHandle`] queues for the driver.
pub enum SessionCommand {
    Connect,
    Disconnect,
    Emit { name: String, data: Value },
    Register { name: String, handler: Handler },
    SetErrorHook(ErrorHook),
    Shutdown,
}

/// Clock backed by Tokio's time source, so paused-time tests drive the
/// session's deadlines too.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Cheap, cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    connected: watch::Receiver<bool>,
}

impl SessionHandle {
    /// Spawns a driver over real WebSocket connections.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: &ClientConfig) -> (Self, JoinHandle<()>) {
        Self::spawn_with(config, Arc::new(TokioClock), WebSocketConnector::new)
    }

    /// Spawns a driver over any connector.  `make_connector` receives the
    /// sender on which the connector must report its transport events.
    pub fn spawn_with<C, F>(
        config: &ClientConfig,
        clock: Arc<dyn Clock>,
        make_connector: F,
    ) -> (Self, JoinHandle<()>)
    where
        C: Connector + 'static,
        F: FnOnce(mpsc::UnboundedSender<TransportEvent>) -> C,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected_rx) = watch::channel(false);

        let session = ClientSession::new(make_connector(events_tx), config, clock);
        let task = tokio::spawn(run(session, events_rx, commands_rx, connected_tx));

        (
            Self {
                commands: commands_tx,
                connected: connected_rx,
            },
            task,
        )
    }

    fn send(&self, command: SessionCommand) -> Result<(), DriverError> {
        self.commands.send(command).map_err(|_| DriverError::Stopped)
    }

    pub fn connect(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::Connect)
    }

    pub fn disconnect(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::Disconnect)
    }

    /// Queues an event.  Dropped by the session if it is offline when the
    /// command is applied.
    pub fn emit(&self, name: impl Into<String>, data: Value) -> Result<(), DriverError> {
        self.send(SessionCommand::Emit {
            name: name.into(),
            data,
        })
    }

    /// Serializes `payload` and queues it like [`emit`](Self::emit).
    pub fn emit_json<T: Serialize>(
        &self,
        name: impl Into<String>,
        payload: &T,
    ) -> Result<(), DriverError> {
        let data = serde_json::to_value(payload)?;
        self.emit(name, data)
    }

    pub fn on<F>(&self, name: impl Into<String>, handler: F) -> Result<(), DriverError>
    where
        F: FnMut(Option<&Value>) -> HandlerResult + Send + 'static,
    {
        self.send(SessionCommand::Register {
            name: name.into(),
            handler: Box::new(handler),
        })
    }

    pub fn set_error_hook(&self, hook: ErrorHook) -> Result<(), DriverError> {
        self.send(SessionCommand::SetErrorHook(hook))
    }

    /// Disconnects and stops the driver task.
    pub fn shutdown(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::Shutdown)
    }

    /// Last published value of the session's `connected` flag.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// A handle for use inside handlers that does not keep the driver alive.
    pub fn downgrade(&self) -> WeakSessionHandle {
        WeakSessionHandle {
            commands: self.commands.downgrade(),
            connected: self.connected.clone(),
        }
    }

    /// Waits until the session reports `connected`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Stopped`] if the driver ends first.
    pub async fn wait_connected(&self) -> Result<(), DriverError> {
        let mut rx = self.connected.clone();
        rx.wait_for(|connected| *connected)
            .await
            .map(|_| ())
            .map_err(|_| DriverError::Stopped)
    }
}

/// Non-owning counterpart of [`SessionHandle`].
///
/// Every operation fails with [`DriverError::Stopped`] once all strong
/// handles are gone.
#[derive(Clone)]
pub struct WeakSessionHandle {
    commands: mpsc::WeakUnboundedSender<SessionCommand>,
    connected: watch::Receiver<bool>,
}

impl WeakSessionHandle {
    /// A strong handle, unless every `SessionHandle` has been dropped.
    pub fn upgrade(&self) -> Option<SessionHandle> {
        self.commands.upgrade().map(|commands| SessionHandle {
            commands,
            connected: self.connected.clone(),
        })
    }

    fn strong(&self) -> Result<SessionHandle, DriverError> {
        self.upgrade().ok_or(DriverError::Stopped)
    }

    pub fn emit(&self, name: impl Into<String>, data: Value) -> Result<(), DriverError> {
        self.strong()?.emit(name, data)
    }

    pub fn emit_json<T: Serialize>(
        &self,
        name: impl Into<String>,
        payload: &T,
    ) -> Result<(), DriverError> {
        self.strong()?.emit_json(name, payload)
    }

    pub fn disconnect(&self) -> Result<(), DriverError> {
        self.strong()?.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }
}

async fn run<C: Connector>(
    mut session: ClientSession<C>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    connected: watch::Sender<bool>,
) {
    debug!(url = session.url(), "session driver started");
    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            Some(event) = events.recv() => session.handle_transport_event(event),
            command = commands.recv() => match command {
                Some(SessionCommand::Connect) => session.connect(),
                Some(SessionCommand::Disconnect) => session.disconnect(),
                Some(SessionCommand::Emit { name, data }) => {
                    session.emit(&name, &data);
                }
                Some(SessionCommand::Register { name, handler }) => session.on_boxed(name, handler),
                Some(SessionCommand::SetErrorHook(hook)) => session.set_error_hook(hook),
                Some(SessionCommand::Shutdown) | None => {
                    session.disconnect();
                    connected.send_replace(false);
                    break;
                }
            },
            () = sleep_until(deadline) => session.poll_timers(),
        }
        connected.send_if_modified(|flag| {
            let now = session.is_connected();
            let changed = *flag != now;
            *flag = now;
            changed
        });
    }
    info!("session driver stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
