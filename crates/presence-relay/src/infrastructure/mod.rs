//! Infrastructure layer for presence-relay.
//!
//! The infrastructure layer handles all I/O: the HTTP listener, WebSocket
//! upgrades, the per-connection writer tasks and reading the optional
//! configuration file.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and routing `/ws`, `/health`, `/list`
//! - Splitting each WebSocket into a session read loop and a writer task
//! - Adapting the writer channel to the application's `OutboundSink` port
//! - Parsing the TOML configuration file
//!
//! # What does NOT belong here?
//!
//! - Protocol dispatch and presence bookkeeping (that is the application layer)
//! - Wire message definitions (that is `presence-core`)

pub mod config_file;
pub mod http_server;
pub mod sink;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use config_file::{load_config_file, ConfigFile, ConfigFileError};
pub use http_server::{router, run_server, serve, AppState};
pub use sink::{ChannelSink, OutboundFrame};
