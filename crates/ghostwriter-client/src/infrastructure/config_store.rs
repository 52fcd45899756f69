//! Config file discovery and loading.
//!
//! The file lives at:
//! - Linux:   `$XDG_CONFIG_HOME/ghostwriter/config.toml` (or `~/.config/ghostwriter/`)
//! - macOS:   `~/Library/Application Support/GhostWriter/config.toml`
//! - Windows: `%APPDATA%\GhostWriter\config.toml`
//!
//! A missing file is not an error: the client runs on built-in defaults.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::config::{ClientConfig, ConfigError};

/// Resolves the platform-appropriate config file path, if the platform base
/// directory can be determined from the environment.
pub fn default_config_path() -> Option<PathBuf> {
    platform_config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads and validates `ClientConfig` from `path`, returning
/// `ClientConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if the values are inconsistent.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!("loaded config from {}", path.display());
            ClientConfig::from_toml_str(&content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}; using defaults", path.display());
            Ok(ClientConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("GhostWriter"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ghostwriter"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("GhostWriter")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
