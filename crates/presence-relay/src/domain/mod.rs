//! Domain layer for presence-relay.
//!
//! Pure configuration types with no I/O.  The connection-level domain
//! (records, roles, the presence snapshot, the wire messages) lives in the
//! `presence-core` crate; this layer only adds what is specific to running
//! the relay process.

pub mod config;

pub use config::{
    ConfigError, LivenessConfig, RelayConfig, DEFAULT_ACTIVITY_TIMEOUT, DEFAULT_BIND_ADDR,
    DEFAULT_CLEANUP_INTERVAL,
};
