//! Scripted in-memory transport for tests.
//!
//! `ScriptedConnector` never touches the network.  Every `open` is recorded
//! and returns a `ScriptedHandle` whose writes land in a shared log, so a
//! test can play the server by feeding `TransportEvent`s to the session and
//! then inspect exactly which frames the session wrote, on which generation,
//! and in what order.
//!
//! # Usage in tests
//!
//! ```rust
//! use std::sync::Arc;
//! use ghostwriter_client::application::session::ClientSession;
//! use ghostwriter_client::application::timer::ManualClock;
//! use ghostwriter_client::application::transport::TransportEvent;
//! use ghostwriter_client::domain::ClientConfig;
//! use ghostwriter_client::infrastructure::mock::ScriptedConnector;
//!
//! let connector = ScriptedConnector::new();
//! let clock = ManualClock::new();
//! let mut session = ClientSession::new(connector.clone(), &ClientConfig::default(), Arc::new(clock));
//!
//! session.connect();
//! let generation = connector.last_generation().unwrap();
//! session.handle_transport_event(TransportEvent::text(generation, r#"0{"sid":"abc"}"#));
//!
//! assert_eq!(connector.sent_frames(), vec!["40"]);
//! ```
//!
//! # Construction failures
//!
//! `fail_next_open(cause)` queues a failure; the next `open` returns
//! `TransportError::Construction(cause)` instead of a handle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ghostwriter_core::Generation;

use crate::application::transport::{Connector, TransportError, TransportHandle};

#[derive(Debug, Default)]
struct Script {
    opens: Vec<(String, Generation)>,
    frames: Vec<(Generation, String)>,
    closes: Vec<Generation>,
    failures: VecDeque<String>,
}

/// A connector that records instead of connecting.  Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `open` fail with a construction error.
    pub fn fail_next_open(&self, cause: impl Into<String>) {
        self.lock().failures.push_back(cause.into());
    }

    /// Number of `open` calls so far, failed ones included.
    pub fn open_count(&self) -> usize {
        self.lock().opens.len()
    }

    /// URLs passed to `open`, in call order.
    pub fn opened_urls(&self) -> Vec<String> {
        self.lock().opens.iter().map(|(url, _)| url.clone()).collect()
    }

    /// Generation of the most recent `open`.
    pub fn last_generation(&self) -> Option<Generation> {
        self.lock().opens.last().map(|(_, generation)| *generation)
    }

    /// Every frame written, across all transport instances.
    pub fn sent_frames(&self) -> Vec<String> {
        self.lock().frames.iter().map(|(_, f)| f.clone()).collect()
    }

    /// Frames written on one transport instance.
    pub fn frames_for(&self, generation: Generation) -> Vec<String> {
        self.lock()
            .frames
            .iter()
            .filter(|(g, _)| *g == generation)
            .map(|(_, f)| f.clone())
            .collect()
    }

    /// Generations whose handle was closed by the session, in order.
    pub fn closed_generations(&self) -> Vec<Generation> {
        self.lock().closes.clone()
    }

    pub fn clear_frames(&self) {
        self.lock().frames.clear();
    }
}

impl Connector for ScriptedConnector {
    fn open(
        &mut self,
        url: &str,
        generation: Generation,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        let mut script = self.lock();
        script.opens.push((url.to_string(), generation));
        if let Some(cause) = script.failures.pop_front() {
            return Err(TransportError::Construction(cause));
        }
        Ok(Box::new(ScriptedHandle {
            generation,
            script: Arc::clone(&self.script),
            closed: false,
        }))
    }
}

/// Write side handed out by [`ScriptedConnector`].
#[derive(Debug)]
pub struct ScriptedHandle {
    generation: Generation,
    script: Arc<Mutex<Script>>,
    closed: bool,
}

impl TransportHandle for ScriptedHandle {
    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frames
            .push((self.generation, frame));
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closes
            .push(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_records_url_and_generation() {
        // Arrange
        let mut connector = ScriptedConnector::new();

        // Act
        let _handle = connector.open("ws://a/", Generation::new(4)).unwrap();

        // Assert
        assert_eq!(connector.opened_urls(), vec!["ws://a/"]);
        assert_eq!(connector.last_generation(), Some(Generation::new(4)));
    }

    #[test]
    fn test_queued_failure_applies_to_next_open_only() {
        // Arrange
        let mut connector = ScriptedConnector::new();
        connector.fail_next_open("refused");

        // Act
        let first = connector.open("ws://a/", Generation::new(1));
        let second = connector.open("ws://a/", Generation::new(2));

        // Assert
        assert_eq!(
            first.err(),
            Some(TransportError::Construction("refused".to_string()))
        );
        assert!(second.is_ok());
        assert_eq!(connector.open_count(), 2);
    }

    #[test]
    fn test_handle_records_frames_per_generation_and_single_close() {
        // Arrange
        let mut connector = ScriptedConnector::new();
        let mut h1 = connector.open("ws://a/", Generation::new(1)).unwrap();
        let mut h2 = connector.open("ws://a/", Generation::new(2)).unwrap();

        // Act
        h1.send("40".to_string()).unwrap();
        h2.send("3".to_string()).unwrap();
        h1.close();
        h1.close();

        // Assert
        assert_eq!(connector.frames_for(Generation::new(1)), vec!["40"]);
        assert_eq!(connector.sent_frames(), vec!["40", "3"]);
        assert_eq!(connector.closed_generations(), vec![Generation::new(1)]);
        assert_eq!(h1.send("x".to_string()), Err(TransportError::Closed));
    }
}
