//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from defaults, an optional TOML file and CLI
//! flags (see `main.rs` and [`crate::infrastructure::config_file`]), then
//! shared read-only.  Nothing here reads the environment or the disk.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// How often the reaper scans for idle connections.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_millis(15_000);

/// How long a connection may stay silent before the reaper evicts it.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_millis(45_000);

/// Default listen address: all interfaces, port 8000.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// A configuration value that cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("cleanup interval must be greater than zero")]
    ZeroCleanupInterval,

    #[error("activity timeout must be greater than zero")]
    ZeroActivityTimeout,
}

/// Timing parameters of the liveness reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Period between two reaper scans.
    pub cleanup_interval: Duration,

    /// Maximum silence before a connection counts as stale.  A connection
    /// idle for exactly this long survives.
    pub activity_timeout: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
        }
    }
}

impl LivenessConfig {
    /// Checks that both durations are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either duration is zero (a zero interval
    /// would make `tokio::time::interval` panic).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if self.activity_timeout.is_zero() {
            return Err(ConfigError::ZeroActivityTimeout);
        }
        Ok(())
    }
}

/// All runtime configuration for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Reaper timing.
    pub liveness: LivenessConfig,
}

impl Default for RelayConfig {
    /// | Field                       | Default        |
    /// |-----------------------------|----------------|
    /// | bind_addr                   | `0.0.0.0:8000` |
    /// | liveness.cleanup_interval   | 15 000 ms      |
    /// | liveness.activity_timeout   | 45 000 ms      |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            liveness: LivenessConfig::default(),
        }
    }
}

impl RelayConfig {
    /// # Errors
    ///
    /// See [`LivenessConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.liveness.validate()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
