//! Integration tests for the client session state machine.
//!
//! The server side is played by feeding `TransportEvent`s into the session;
//! `ScriptedConnector` records what the session wrote and `ManualClock`
//! stands in for wall-clock time, so every timing property is checked
//! deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ghostwriter_client::application::event_router::{
    EVENT_CONNECT, EVENT_CONNECT_ERROR, EVENT_DISCONNECT, EVENT_RECONNECT_ATTEMPT,
};
use ghostwriter_client::application::session::ClientSession;
use ghostwriter_client::application::timer::{Clock, ManualClock};
use ghostwriter_client::application::transport::TransportEvent;
use ghostwriter_client::domain::{ClientConfig, SessionState};
use ghostwriter_client::infrastructure::mock::ScriptedConnector;
use ghostwriter_core::Generation;
use serde_json::{json, Value};

const OPEN: &str = r#"0{"sid":"abc","pingInterval":25000,"pingTimeout":20000}"#;

type Log = Arc<Mutex<Vec<String>>>;

struct Harness {
    session: ClientSession<ScriptedConnector>,
    connector: ScriptedConnector,
    clock: ManualClock,
    log: Log,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    fn with_config(config: ClientConfig) -> Self {
        let connector = ScriptedConnector::new();
        let clock = ManualClock::new();
        let mut session = ClientSession::new(connector.clone(), &config, Arc::new(clock.clone()));
        let log: Log = Arc::default();
        for name in [
            EVENT_CONNECT,
            EVENT_DISCONNECT,
            EVENT_RECONNECT_ATTEMPT,
            EVENT_CONNECT_ERROR,
        ] {
            let log = Arc::clone(&log);
            session.on(name, move |_| {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            });
        }
        Self {
            session,
            connector,
            clock,
            log,
        }
    }

    fn generation(&self) -> Generation {
        self.connector.last_generation().expect("no transport opened")
    }

    fn feed(&mut self, frame: &str) {
        let generation = self.generation();
        self.session
            .handle_transport_event(TransportEvent::text(generation, frame));
    }

    fn close_transport(&mut self) {
        let generation = self.generation();
        self.session
            .handle_transport_event(TransportEvent::closed(generation));
    }

    /// Drives a fresh transport through open + handshake.
    fn handshake(&mut self) {
        let generation = self.generation();
        self.session
            .handle_transport_event(TransportEvent::opened(generation));
        self.feed(OPEN);
        self.feed("40");
    }

    fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.session.poll_timers();
    }

    fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn clear_events(&self) {
        self.log.lock().unwrap().clear();
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_open_envelope_triggers_handshake_and_45s_heartbeat() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();

    // Act
    h.feed(OPEN);

    // Assert
    assert_eq!(h.connector.sent_frames(), vec!["40"]);
    assert_eq!(h.session.state(), SessionState::HandshakePending);
    assert_eq!(
        h.session.heartbeat_deadline(),
        Some(h.clock.now() + ms(45_000))
    );
}

#[test]
fn test_connect_ack_marks_connected_and_resets_backoff() {
    // Arrange – two failures first so the backoff has grown
    let mut h = Harness::new();
    h.connector.fail_next_open("refused");
    h.connector.fail_next_open("refused");
    h.session.connect();
    h.advance(ms(600));
    h.advance(ms(960));
    assert_eq!(h.session.backoff_delay(), ms(1_536));
    h.clear_events();

    // Act
    h.feed(OPEN);
    h.feed("40");

    // Assert
    assert!(h.session.is_connected());
    assert_eq!(h.events(), vec!["connect"]);
    assert_eq!(h.session.backoff_delay(), ms(600));
}

#[test]
fn test_server_event_reaches_handler_with_decoded_argument() {
    // Arrange
    let mut h = Harness::new();
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let sink = Arc::clone(&seen);
    h.session.on("status_update", move |arg| {
        sink.lock().unwrap().push(arg.cloned().unwrap_or(Value::Null));
        Ok(())
    });
    h.session.connect();
    h.handshake();

    // Act
    h.feed(r#"42["status_update",{"status":"connected","hostname":"PC1"}]"#);

    // Assert
    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!({"status": "connected", "hostname": "PC1"})]
    );
}

#[test]
fn test_unexpected_close_raises_disconnect_then_reconnect_attempt_and_retries_at_600ms() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    h.clear_events();

    // Act
    h.close_transport();

    // Assert
    assert!(!h.session.is_connected());
    assert_eq!(h.events(), vec!["disconnect", "reconnect_attempt"]);
    assert_eq!(h.session.state(), SessionState::ReconnectPending);

    h.advance(ms(599));
    assert_eq!(h.connector.open_count(), 1, "retry must wait the full 600ms");
    h.advance(ms(1));
    assert_eq!(h.connector.open_count(), 2);
    assert_eq!(h.session.state(), SessionState::Connecting);
}

#[test]
fn test_two_failed_attempts_schedule_third_at_1536ms() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.close_transport(); // first loss, retry in 600ms

    // Act
    h.advance(ms(600)); // attempt 2 opens...
    h.close_transport(); // ...and fails, retry in 960ms
    h.advance(ms(960)); // attempt 3 opens...
    let before = h.clock.now();
    h.close_transport(); // ...and fails

    // Assert
    assert_eq!(h.session.reconnect_deadline(), Some(before + ms(1_536)));
}

#[test]
fn test_emit_while_disconnected_sends_nothing() {
    // Arrange
    let mut h = Harness::new();

    // Act
    let idle = h.session.emit("text_input", &json!({"text": "hi"}));
    h.session.connect();
    h.feed(OPEN);
    let mid_handshake = h.session.emit("text_input", &json!({"text": "hi"}));

    // Assert
    assert!(!idle);
    assert!(!mid_handshake);
    assert_eq!(h.connector.sent_frames(), vec!["40"]);
    assert!(h.events().is_empty());
}

// ── Properties ────────────────────────────────────────────────────────────────

#[test]
fn test_emit_when_connected_writes_event_frame() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    h.connector.clear_frames();

    // Act
    let sent = h.session.emit("text_input", &json!({"text": "hi"}));

    // Assert
    assert!(sent);
    assert_eq!(
        h.connector.sent_frames(),
        vec![r#"42["text_input",{"text":"hi"}]"#]
    );
}

#[test]
fn test_ping_answered_with_pong_and_keeps_connection_alive() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    h.connector.clear_frames();

    // Act – ping every 44.9s for five minutes
    for _ in 0..7 {
        h.advance(ms(44_900));
        h.feed("2");
    }

    // Assert
    assert!(h.session.is_connected());
    assert_eq!(h.connector.sent_frames(), vec!["3"; 7]);
    assert!(h.connector.closed_generations().is_empty());
}

#[test]
fn test_inbound_pong_keeps_connection_alive_without_reply() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    h.connector.clear_frames();
    h.clear_events();

    // Act
    for _ in 0..7 {
        h.advance(ms(44_900));
        h.feed("3");
    }

    // Assert
    assert!(h.session.is_connected());
    assert!(h.connector.sent_frames().is_empty());
    assert!(h.connector.closed_generations().is_empty());
    assert!(h.events().is_empty());
}

#[test]
fn test_silence_closes_transport_exactly_once() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    let generation = h.generation();
    h.clear_events();

    // Act
    h.advance(ms(45_000));
    // The socket's own close notification arrives afterwards.
    h.session
        .handle_transport_event(TransportEvent::closed(generation));

    // Assert
    assert_eq!(h.connector.closed_generations(), vec![generation]);
    assert_eq!(h.events(), vec!["disconnect", "reconnect_attempt"]);
    assert_eq!(h.session.state(), SessionState::ReconnectPending);
}

#[test]
fn test_server_declared_heartbeat_values_are_used() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();

    // Act
    h.feed(r#"0{"sid":"x","pingInterval":1000,"pingTimeout":500}"#);
    h.feed("40");
    h.advance(ms(1_499));
    let alive_before = h.session.is_connected();
    h.advance(ms(1));

    // Assert
    assert!(alive_before);
    assert!(!h.session.is_connected());
}

#[test]
fn test_heartbeat_defaults_restored_for_next_transport() {
    // Arrange – first server declares a tiny window
    let mut h = Harness::new();
    h.session.connect();
    h.feed(r#"0{"pingInterval":10,"pingTimeout":10}"#);
    h.close_transport();
    h.advance(ms(600));

    // Act – second server's open envelope carries no timing
    h.feed(r#"0{"sid":"y"}"#);

    // Assert
    assert_eq!(
        h.session.heartbeat_deadline(),
        Some(h.clock.now() + ms(45_000))
    );
}

#[test]
fn test_server_close_frame_behaves_like_transport_close() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    let generation = h.generation();
    h.clear_events();

    // Act
    h.feed("1");

    // Assert
    assert_eq!(h.events(), vec!["disconnect", "reconnect_attempt"]);
    assert_eq!(h.connector.closed_generations(), vec![generation]);
    assert!(h.session.reconnect_deadline().is_some());
}

#[test]
fn test_runtime_error_raises_connect_error_and_tears_down_once() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    let generation = h.generation();
    h.clear_events();

    // Act
    h.session
        .handle_transport_event(TransportEvent::error(generation, "connection reset"));
    h.session
        .handle_transport_event(TransportEvent::closed(generation));

    // Assert
    assert_eq!(
        h.events(),
        vec!["connect_error", "disconnect", "reconnect_attempt"]
    );
}

#[test]
fn test_disconnect_cancels_pending_reconnect() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    h.close_transport();
    h.clear_events();

    // Act
    h.session.disconnect();
    h.advance(ms(60_000));

    // Assert
    assert_eq!(h.connector.open_count(), 1);
    assert!(h.events().is_empty());
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.session.next_deadline(), None);
}

#[test]
fn test_disconnect_ignores_late_frames_from_old_transport() {
    // Arrange
    let mut h = Harness::new();
    let hits: Arc<Mutex<usize>> = Arc::default();
    let counter = Arc::clone(&hits);
    h.session.on("status_update", move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    h.session.connect();
    h.handshake();
    let old = h.generation();

    // Act
    h.session.disconnect();
    h.session.handle_transport_event(TransportEvent::text(
        old,
        r#"42["status_update",{"status":"connected"}]"#,
    ));
    h.session
        .handle_transport_event(TransportEvent::closed(old));

    // Assert
    assert_eq!(*hits.lock().unwrap(), 0);
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.connector.closed_generations(), vec![old]);
}

#[test]
fn test_reconnect_after_disconnect_uses_new_generation() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    let first = h.generation();
    h.session.disconnect();

    // Act
    h.session.connect();
    let second = h.generation();
    h.session
        .handle_transport_event(TransportEvent::text(first, OPEN));

    // Assert
    assert!(second > first);
    assert_eq!(h.connector.frames_for(second), Vec::<String>::new());
    assert_eq!(h.session.state(), SessionState::Connecting);
}

#[test]
fn test_construction_failure_funnels_into_retry() {
    // Arrange
    let mut h = Harness::new();
    h.connector.fail_next_open("no route");

    // Act
    h.session.connect();
    h.advance(ms(600));

    // Assert
    assert_eq!(h.events(), vec!["connect_error", "reconnect_attempt"]);
    assert_eq!(h.connector.open_count(), 2);
    assert_eq!(h.session.state(), SessionState::Connecting);
}

#[test]
fn test_invalid_json_after_event_tag_invokes_no_handler() {
    // Arrange
    let mut h = Harness::new();
    let hits: Arc<Mutex<usize>> = Arc::default();
    let counter = Arc::clone(&hits);
    h.session.on("x", move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    h.session.connect();
    h.handshake();

    // Act
    h.feed(r#"42["x",{"#);
    h.feed("42{not json}");
    h.feed("9garbage");
    h.feed("");

    // Assert
    assert_eq!(*hits.lock().unwrap(), 0);
    assert!(h.session.is_connected());
}

#[test]
fn test_failing_handler_does_not_block_others_across_dispatches() {
    // Arrange
    let mut h = Harness::new();
    let hits: Arc<Mutex<usize>> = Arc::default();
    let counter = Arc::clone(&hits);
    h.session.on("x", |_| Err("handler bug".into()));
    h.session.on("x", |_| panic!("worse handler bug"));
    h.session.on("x", move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    h.session.connect();
    h.handshake();

    // Act
    h.feed(r#"42["x",1]"#);
    h.feed(r#"42["x",2]"#);

    // Assert
    assert_eq!(*hits.lock().unwrap(), 2);
}

#[test]
fn test_handlers_survive_reconnect() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    h.handshake();
    h.close_transport();
    h.advance(ms(600));
    h.clear_events();

    // Act
    h.handshake();

    // Assert
    assert_eq!(h.events(), vec!["connect"]);
}

#[test]
fn test_backoff_keeps_growing_to_ceiling_without_success() {
    // Arrange
    let mut h = Harness::new();
    h.session.connect();
    let mut observed = Vec::new();

    // Act
    for _ in 0..7 {
        h.close_transport();
        let deadline = h.session.reconnect_deadline().unwrap();
        observed.push((deadline - h.clock.now()).as_micros());
        h.advance(deadline - h.clock.now());
    }

    // Assert
    assert_eq!(
        observed,
        vec![600_000, 960_000, 1_536_000, 2_457_600, 3_932_160, 5_000_000, 5_000_000]
    );
}

#[test]
fn test_socket_url_follows_config() {
    // Arrange
    let mut config = ClientConfig::default();
    config.server.host = "192.168.1.20:5000".to_string();
    let mut h = Harness::with_config(config);

    // Act
    h.session.connect();

    // Assert
    assert_eq!(
        h.connector.opened_urls(),
        vec!["ws://192.168.1.20:5000/socket.io/?EIO=4&transport=websocket"]
    );
}
