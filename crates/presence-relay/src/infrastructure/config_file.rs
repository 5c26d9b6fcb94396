//! Optional TOML configuration file.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8000
//!
//! [liveness]
//! cleanup_interval_ms = 15000
//! activity_timeout_ms = 45000
//! ```
//!
//! Every section and field may be omitted; missing values fall back to the
//! built-in defaults through `#[serde(default = "...")]`.  CLI flags are applied
//! on top of the parsed file in `main.rs` before [`ConfigFile::into_relay_config`]
//! validates the result.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::{
    ConfigError, LivenessConfig, RelayConfig, DEFAULT_ACTIVITY_TIMEOUT, DEFAULT_CLEANUP_INTERVAL,
};

/// Error type for loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    /// The values parsed but cannot be used.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// On-disk configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub liveness: LivenessSection,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Reaper timing, in milliseconds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LivenessSection {
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    #[serde(default = "default_activity_timeout_ms")]
    pub activity_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            cleanup_interval_ms: default_cleanup_interval_ms(),
            activity_timeout_ms: default_activity_timeout_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cleanup_interval_ms() -> u64 {
    DEFAULT_CLEANUP_INTERVAL.as_millis() as u64
}

fn default_activity_timeout_ms() -> u64 {
    DEFAULT_ACTIVITY_TIMEOUT.as_millis() as u64
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigFileError::Parse`] for malformed TOML or unknown keys.
pub fn parse_config(text: &str) -> Result<ConfigFile, ConfigFileError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigFileError::Io`] if the file cannot be read, or
/// [`ConfigFileError::Parse`] if its content is invalid.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

impl ConfigFile {
    /// Converts to a validated [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::InvalidBindAddress`] if `bind_address` is
    /// not an IP address, or [`ConfigFileError::Invalid`] if a duration is zero.
    pub fn into_relay_config(self) -> Result<RelayConfig, ConfigFileError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| ConfigFileError::InvalidBindAddress(self.server.bind_address.clone()))?;

        let config = RelayConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            liveness: LivenessConfig {
                cleanup_interval: Duration::from_millis(self.liveness.cleanup_interval_ms),
                activity_timeout: Duration::from_millis(self.liveness.activity_timeout_ms),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
