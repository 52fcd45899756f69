//! Client configuration types.
//!
//! [`ClientConfig`] is the single source of truth for runtime settings.  It
//! is built once by the composition root (`main.rs`) from built-in defaults,
//! an optional TOML file, environment variables, and CLI flags, then handed to
//! the session.  Nothing here reads files or the environment; see
//! `infrastructure::config_store` for that.
//!
//! Every field carries a serde default, so a partial file (or none at all)
//! is valid:
//!
//! ```toml
//! [server]
//! host = "192.168.1.20:5000"
//! secure = false
//!
//! [heartbeat]
//! ping_interval_ms = 25000
//! ping_timeout_ms = 20000
//!
//! [reconnect]
//! floor_ms = 600
//! ceiling_ms = 5000
//! factor = 1.6
//! ```

use std::path::PathBuf;
use std::time::Duration;

use ghostwriter_core::protocol::frames::{
    DEFAULT_PING_INTERVAL, DEFAULT_PING_TIMEOUT, SOCKET_PATH,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but make no sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub reconnect: BackoffConfig,
}

/// Where the GhostWriter server lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// `host:port` of the PC running the GhostWriter server.
    #[serde(default = "default_host")]
    pub host: String,
    /// Use the secure socket scheme (`wss`).  Mirrors whether the page that
    /// hosts the client was itself loaded over HTTPS.
    #[serde(default)]
    pub secure: bool,
}

/// Heartbeat timing used until the server's open envelope supplies its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatConfig {
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
}

/// Exponential backoff between reconnection attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffConfig {
    /// First retry delay, and the delay after every successful handshake.
    #[serde(default = "default_floor_ms")]
    pub floor_ms: u64,
    /// Upper bound on any retry delay.
    #[serde(default = "default_ceiling_ms")]
    pub ceiling_ms: u64,
    /// Multiplier applied after every failed attempt.
    #[serde(default = "default_factor")]
    pub factor: f64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_ping_interval_ms() -> u64 {
    DEFAULT_PING_INTERVAL.as_millis() as u64
}
fn default_ping_timeout_ms() -> u64 {
    DEFAULT_PING_TIMEOUT.as_millis() as u64
}
fn default_floor_ms() -> u64 {
    600
}
fn default_ceiling_ms() -> u64 {
    5000
}
fn default_factor() -> f64 {
    1.6
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            secure: false,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_ms: default_floor_ms(),
            ceiling_ms: default_ceiling_ms(),
            factor: default_factor(),
        }
    }
}

// ── Behaviour ─────────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] if [`validate`](Self::validate) rejects it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: ClientConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        if self.server.host.contains('/') {
            return Err(ConfigError::Invalid(
                "server.host is host:port only, without scheme or path".into(),
            ));
        }
        if self.heartbeat.ping_interval_ms == 0 || self.heartbeat.ping_timeout_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat values must be non-zero".into()));
        }
        if self.reconnect.floor_ms == 0 {
            return Err(ConfigError::Invalid("reconnect.floor_ms must be non-zero".into()));
        }
        if self.reconnect.ceiling_ms < self.reconnect.floor_ms {
            return Err(ConfigError::Invalid(
                "reconnect.ceiling_ms must be >= reconnect.floor_ms".into(),
            ));
        }
        if !(self.reconnect.factor.is_finite() && self.reconnect.factor >= 1.0) {
            return Err(ConfigError::Invalid("reconnect.factor must be >= 1.0".into()));
        }
        Ok(())
    }

    /// The socket URL: `ws://` or `wss://` (following `server.secure`) over
    /// the configured host, pinned to the WebSocket transport.
    ///
    /// ```rust
    /// use ghostwriter_client::domain::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert_eq!(
    ///     cfg.socket_url(),
    ///     "ws://127.0.0.1:5000/socket.io/?EIO=4&transport=websocket"
    /// );
    /// ```
    pub fn socket_url(&self) -> String {
        let scheme = if self.server.secure { "wss" } else { "ws" };
        format!("{scheme}://{}{SOCKET_PATH}", self.server.host)
    }
}

impl HeartbeatConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_host_is_local_port_5000() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.server.host, "127.0.0.1:5000");
        assert!(!cfg.server.secure);
    }

    #[test]
    fn test_default_heartbeat_is_25s_plus_20s() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.heartbeat.ping_interval(), Duration::from_millis(25_000));
        assert_eq!(cfg.heartbeat.ping_timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_default_backoff_is_600_to_5000_by_1_6() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.reconnect.floor_ms, 600);
        assert_eq!(cfg.reconnect.ceiling_ms, 5000);
        assert!((cfg.reconnect.factor - 1.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_secure_flag_switches_scheme() {
        // Arrange
        let mut cfg = ClientConfig::default();
        cfg.server.host = "pc.local:5443".to_string();
        cfg.server.secure = true;

        // Act
        let url = cfg.socket_url();

        // Assert
        assert_eq!(url, "wss://pc.local:5443/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let cfg = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        // Arrange
        let toml = r#"
            [server]
            host = "192.168.1.20:5000"

            [reconnect]
            ceiling_ms = 8000
        "#;

        // Act
        let cfg = ClientConfig::from_toml_str(toml).unwrap();

        // Assert
        assert_eq!(cfg.server.host, "192.168.1.20:5000");
        assert_eq!(cfg.reconnect.ceiling_ms, 8000);
        assert_eq!(cfg.reconnect.floor_ms, 600);
        assert_eq!(cfg.heartbeat, HeartbeatConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = ClientConfig::from_toml_str("[server\nhost=");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_ceiling_below_floor_is_invalid() {
        let toml = "[reconnect]\nfloor_ms = 900\nceiling_ms = 100\n";
        let result = ClientConfig::from_toml_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_shrinking_factor_is_invalid() {
        let mut cfg = ClientConfig::default();
        cfg.reconnect.factor = 0.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_host_with_scheme_is_invalid() {
        let mut cfg = ClientConfig::default();
        cfg.server.host = "http://pc.local:5000".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        // Arrange
        let mut cfg = ClientConfig::default();
        cfg.server.secure = true;
        cfg.heartbeat.ping_timeout_ms = 60_000;

        // Act
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = ClientConfig::from_toml_str(&text).unwrap();

        // Assert
        assert_eq!(parsed, cfg);
    }
}
