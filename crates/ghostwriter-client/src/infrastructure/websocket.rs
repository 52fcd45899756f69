//! WebSocket transport built on tokio-tungstenite.
//!
//! Each [`Connector::open`] spawns one Tokio task that owns the socket for its
//! whole life:
//!
//! ```text
//!  session ──send()/close()──► outbound channel ──► transport task ──► socket
//!  session ◄── TransportEvent ◄── events channel ◄── transport task ◄── socket
//! ```
//!
//! The task reports `Opened` once the WebSocket handshake completes, one
//! `Text` per inbound text frame, an `Error` if the socket fails, and always
//! finishes with exactly one `Closed`.  Engine.IO framing is not handled
//! here; the task moves strings and nothing else.

use futures_util::{SinkExt, StreamExt};
use ghostwriter_core::Generation;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest, handshake::client::Request, Error as WsError, Message as WsMessage,
};
use tracing::{debug, trace};

use crate::application::transport::{Connector, TransportError, TransportEvent, TransportHandle};

/// Opens real WebSocket connections and reports their events on `events`.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WebSocketConnector {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events }
    }
}

impl Connector for WebSocketConnector {
    fn open(
        &mut self,
        url: &str,
        generation: Generation,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        if url.starts_with("wss://") && !cfg!(feature = "tls") {
            return Err(TransportError::Construction(
                "secure sockets need the `tls` feature".to_string(),
            ));
        }
        let request = url
            .into_client_request()
            .map_err(|e| TransportError::Construction(e.to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Construction(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_transport(
            request,
            generation,
            outbound_rx,
            self.events.clone(),
        ));

        Ok(Box::new(WebSocketHandle {
            outbound: outbound_tx,
            closed: false,
        }))
    }
}

#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Write side of one spawned transport task.
#[derive(Debug)]
pub struct WebSocketHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: bool,
}

impl TransportHandle for WebSocketHandle {
    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            // The task may already be gone; nothing to do then.
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

async fn run_transport(
    request: Request,
    generation: Generation,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let report = |event: TransportEvent| {
        // A send error only means the driver has stopped.
        let _ = events.send(event);
    };

    // ── Step 1: WebSocket handshake, abandoned if the session closes first ────
    let mut pending = Vec::new();
    let connected = tokio::select! {
        result = tokio_tungstenite::connect_async(request) => result,
        () = wait_for_close(&mut outbound, &mut pending) => {
            debug!(%generation, "closed before the socket opened");
            report(TransportEvent::closed(generation));
            return;
        }
    };
    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            report(TransportEvent::error(generation, e.to_string()));
            report(TransportEvent::closed(generation));
            return;
        }
    };
    debug!(%generation, "websocket open");
    report(TransportEvent::opened(generation));

    // ── Step 2: Pump frames both ways until either side closes ────────────────
    let (mut sink, mut stream) = ws_stream.split();
    for frame in pending {
        if let Err(e) = sink.send(WsMessage::Text(frame)).await {
            report(TransportEvent::error(generation, e.to_string()));
            report(TransportEvent::closed(generation));
            return;
        }
    }

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    trace!(%generation, "→ {text}");
                    if let Err(e) = sink.send(WsMessage::Text(text)).await {
                        report(TransportEvent::error(generation, e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    trace!(%generation, "← {text}");
                    report(TransportEvent::text(generation, text));
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!(%generation, "peer closed the websocket");
                    break;
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    debug!(%generation, "binary frame ignored");
                }
                // Ping replies are queued by tungstenite itself.
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => break,
                Some(Err(e)) => {
                    report(TransportEvent::error(generation, e.to_string()));
                    break;
                }
            },
        }
    }

    report(TransportEvent::closed(generation));
}

/// Resolves once the session asks to close (or drops its handle).  Frames
/// sent meanwhile are kept for delivery after the handshake.
async fn wait_for_close(outbound: &mut mpsc::UnboundedReceiver<Outbound>, pending: &mut Vec<String>) {
    loop {
        match outbound.recv().await {
            Some(Outbound::Frame(frame)) => pending.push(frame),
            Some(Outbound::Close) | None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_construction_failure() {
        // Arrange
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::new(tx);

        // Act
        let result = connector.open("not a url", Generation::new(1));

        // Assert
        assert!(matches!(result, Err(TransportError::Construction(_))));
    }

    #[test]
    fn test_open_outside_runtime_is_construction_failure() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::new(tx);
        let result = connector.open("ws://127.0.0.1:9/socket.io/", Generation::new(1));
        assert!(matches!(result, Err(TransportError::Construction(_))));
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn test_secure_url_without_tls_feature_is_construction_failure() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::new(tx);
        let result = connector.open("wss://pc.local:5000/socket.io/", Generation::new(1));
        assert!(matches!(result, Err(TransportError::Construction(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_error_then_closed() {
        // Arrange – port 9 (discard) is almost never listening on loopback
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::new(tx);
        let generation = Generation::new(3);

        // Act
        let _handle = connector
            .open("ws://127.0.0.1:9/socket.io/?EIO=4&transport=websocket", generation)
            .unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();

        // Assert
        assert_eq!(first.generation, generation);
        assert!(matches!(
            first.kind,
            crate::application::transport::TransportEventKind::Error(_)
        ));
        assert_eq!(second, TransportEvent::closed(generation));
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        // Arrange
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::new(tx);
        let mut handle = connector
            .open("ws://127.0.0.1:9/socket.io/", Generation::new(1))
            .unwrap();

        // Act
        handle.close();
        handle.close();

        // Assert
        assert_eq!(handle.send("42[]".to_string()), Err(TransportError::Closed));
    }
}
