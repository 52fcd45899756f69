//! The client session: connection lifecycle, handshake, heartbeat, and
//! reconnection, driven entirely by method calls.
//!
//! # Lifecycle
//!
//! ```text
//! connect() ──► Connecting ──(Open frame, send "40")──► HandshakePending
//!                   ▲                                        │
//!                   │ reconnect timer                  "40" ack
//!                   │                                        ▼
//!             ReconnectPending ◄──(close/error/timeout)── Connected
//! ```
//!
//! Every transport instance is tagged with a fresh [`Generation`].  Events
//! from any other generation are ignored, and the session forgets its
//! current generation the moment it tears a transport down, so a socket's
//! trailing notifications can never trigger a second teardown.
//!
//! The session never sleeps.  The owner calls [`ClientSession::poll_timers`]
//! once [`ClientSession::next_deadline`] has passed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ghostwriter_core::{
    decode, encode_event, encode_handshake, encode_pong, ApplicationPacket, Generation,
    GenerationCounter, TransportFrame,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::application::event_router::{
    ErrorHook, EventRouter, Handler, HandlerResult, EVENT_CONNECT, EVENT_CONNECT_ERROR,
    EVENT_DISCONNECT, EVENT_RECONNECT_ATTEMPT,
};
use crate::application::heartbeat::HeartbeatMonitor;
use crate::application::reconnect::ReconnectScheduler;
use crate::application::timer::{earliest, Clock};
use crate::application::transport::{
    Connector, TransportEvent, TransportEventKind, TransportHandle,
};
use crate::domain::config::ClientConfig;
use crate::domain::state::SessionState;

/// Why a transport instance was torn down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionLoss {
    #[error("transport could not be created: {0}")]
    TransportConstruction(String),

    #[error("transport failed: {0}")]
    TransportRuntime(String),

    #[error("transport closed")]
    TransportClosed,

    #[error("server sent close")]
    ServerClose,

    #[error("no heartbeat within {0:?}")]
    LivenessTimeout(Duration),
}

impl ConnectionLoss {
    /// Construction and runtime failures are reported to consumers through
    /// `connect_error`; the other causes are ordinary closes.
    pub fn cause_for_connect_error(&self) -> Option<&str> {
        match self {
            ConnectionLoss::TransportConstruction(cause)
            | ConnectionLoss::TransportRuntime(cause) => Some(cause),
            _ => None,
        }
    }
}

/// A Socket.IO v4 client session over one WebSocket at a time.
pub struct ClientSession<C: Connector> {
    connector: C,
    url: String,
    clock: Arc<dyn Clock>,
    state: SessionState,
    generations: GenerationCounter,
    current: Option<Generation>,
    transport: Option<Box<dyn TransportHandle>>,
    heartbeat: HeartbeatMonitor,
    reconnect: ReconnectScheduler,
    router: EventRouter,
}

impl<C: Connector> ClientSession<C> {
    pub fn new(connector: C, config: &ClientConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            connector,
            url: config.socket_url(),
            clock,
            state: SessionState::Idle,
            generations: GenerationCounter::new(),
            current: None,
            transport: None,
            heartbeat: HeartbeatMonitor::from_config(&config.heartbeat),
            reconnect: ReconnectScheduler::new(&config.reconnect),
            router: EventRouter::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` only between the handshake acknowledgement and the next loss.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Generation of the live transport instance, if any.
    pub fn current_generation(&self) -> Option<Generation> {
        self.current
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn heartbeat_deadline(&self) -> Option<Instant> {
        self.heartbeat.deadline()
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect.deadline()
    }

    /// Delay the next reconnect attempt would be scheduled with.
    pub fn backoff_delay(&self) -> Duration {
        self.reconnect.current_delay()
    }

    /// Earliest instant at which [`poll_timers`](Self::poll_timers) has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.heartbeat.deadline(), self.reconnect.deadline())
    }

    // ── Public operations ─────────────────────────────────────────────────────

    /// Starts the connection sequence.  A no-op unless the session is idle.
    pub fn connect(&mut self) {
        if self.state != SessionState::Idle {
            debug!(state = %self.state, "connect() ignored; session already active");
            return;
        }
        self.reconnect.reset_to_floor();
        self.open_transport();
    }

    /// Stops the session: cancels both timers, closes the transport, and
    /// prevents any further automatic reconnection.  Raises no local events.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.state = SessionState::Closing;
        self.heartbeat.cancel();
        self.reconnect.cancel_pending();
        self.current = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.state = SessionState::Idle;
        info!("session disconnected");
    }

    /// Sends an event if connected.  Offline emits are dropped (at-most-once
    /// delivery); the return value says whether a frame was written.
    pub fn emit(&mut self, name: &str, data: &Value) -> bool {
        if !self.is_connected() {
            debug!(event = name, "emit dropped; not connected");
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        trace!(event = name, %data, "emit");
        match transport.send(encode_event(name, data)) {
            Ok(()) => true,
            Err(e) => {
                warn!(event = name, "emit failed: {e}");
                false
            }
        }
    }

    /// Registers a handler for a local or server-pushed event.
    pub fn on<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(Option<&Value>) -> HandlerResult + Send + 'static,
    {
        self.on_boxed(name, Box::new(handler));
    }

    pub fn on_boxed(&mut self, name: impl Into<String>, handler: Handler) {
        let name = name.into();
        self.router.register_boxed(name.clone(), handler);
        trace!(event = %name, handlers = self.router.handler_count(&name), "handler registered");
    }

    /// Installs an observer for handler failures.
    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.router.set_error_hook(hook);
    }

    // ── Inputs from the owner ─────────────────────────────────────────────────

    /// Applies one transport occurrence.  Events from stale generations are
    /// ignored.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.current != Some(event.generation) {
            trace!(generation = %event.generation, "stale transport event ignored");
            return;
        }
        match event.kind {
            TransportEventKind::Opened => {
                debug!(generation = %event.generation, "socket open; awaiting open envelope");
            }
            TransportEventKind::Text(raw) => self.handle_frame(&raw),
            TransportEventKind::Error(cause) => {
                self.handle_loss(ConnectionLoss::TransportRuntime(cause));
            }
            TransportEventKind::Closed => self.handle_loss(ConnectionLoss::TransportClosed),
        }
    }

    /// Fires whichever timers are due: a heartbeat expiry tears the transport
    /// down, a due reconnect opens a new one.
    pub fn poll_timers(&mut self) {
        let now = self.clock.now();
        if self.heartbeat.poll_expired(now) {
            let window = self.heartbeat.window();
            self.handle_loss(ConnectionLoss::LivenessTimeout(window));
        }
        if self.reconnect.poll_due(now) && self.state == SessionState::ReconnectPending {
            self.open_transport();
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn open_transport(&mut self) {
        let generation = self.generations.next();
        self.current = Some(generation);
        self.heartbeat.reset_to_defaults();
        self.state = SessionState::Connecting;
        info!(%generation, url = %self.url, "opening transport");

        match self.connector.open(&self.url, generation) {
            Ok(transport) => self.transport = Some(transport),
            Err(e) => self.handle_loss(ConnectionLoss::TransportConstruction(e.to_string())),
        }
    }

    fn handle_frame(&mut self, raw: &str) {
        let frame = match decode(raw) {
            Ok(frame) => frame,
            Err(e) if e.is_protocol_mismatch() => {
                debug!("dropping frame with unknown tag: {e}");
                return;
            }
            Err(e) => {
                debug!("dropping malformed frame: {e}");
                return;
            }
        };

        let now = self.clock.now();
        match frame {
            TransportFrame::Open(payload) => {
                if self.state != SessionState::Connecting {
                    debug!(state = %self.state, "duplicate open envelope");
                    self.heartbeat.on_liveness_signal(now);
                    return;
                }
                self.heartbeat
                    .arm(now, payload.ping_interval(), payload.ping_timeout());
                debug!(
                    sid = payload.sid.as_deref().unwrap_or("-"),
                    window = ?self.heartbeat.window(),
                    "open envelope received; sending handshake"
                );
                self.state = SessionState::HandshakePending;
                self.send_raw(encode_handshake());
            }
            TransportFrame::Ping => {
                self.send_raw(encode_pong());
                if self.heartbeat.is_armed() {
                    self.heartbeat.on_liveness_signal(now);
                }
            }
            TransportFrame::Pong => {
                if self.heartbeat.is_armed() {
                    self.heartbeat.on_liveness_signal(now);
                }
            }
            TransportFrame::Close => self.handle_loss(ConnectionLoss::ServerClose),
            TransportFrame::Message(ApplicationPacket::Connect(_)) => {
                if self.state != SessionState::HandshakePending {
                    debug!(state = %self.state, "unexpected connect packet ignored");
                    return;
                }
                self.state = SessionState::Connected;
                self.reconnect.reset_to_floor();
                info!(generation = ?self.current, "connected");
                self.router.dispatch(EVENT_CONNECT, None);
            }
            TransportFrame::Message(ApplicationPacket::Event { name, arg }) => {
                trace!(event = %name, "inbound event");
                self.router.dispatch(&name, arg.as_ref());
            }
        }
    }

    fn send_raw(&mut self, frame: String) {
        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.send(frame) {
                debug!("control frame not sent: {e}");
            }
        }
    }

    /// The single teardown-and-reschedule path shared by every failure.
    fn handle_loss(&mut self, loss: ConnectionLoss) {
        if !self.state.is_live() {
            debug!(state = %self.state, "loss ignored; session not active: {loss}");
            return;
        }
        let was_connected = self.state.is_connected();
        self.heartbeat.cancel();
        self.current = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.state = SessionState::ReconnectPending;
        warn!(was_connected, "connection lost: {loss}");

        if let Some(cause) = loss.cause_for_connect_error() {
            let arg = json!({ "message": cause });
            self.router.dispatch(EVENT_CONNECT_ERROR, Some(&arg));
        }
        if was_connected {
            self.router.dispatch(EVENT_DISCONNECT, None);
        }
        self.router.dispatch(EVENT_RECONNECT_ATTEMPT, None);

        if let Some(delay) = self.reconnect.schedule_if_idle(self.clock.now()) {
            info!(?delay, "reconnect scheduled");
        }
    }
}
