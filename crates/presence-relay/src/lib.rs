//! presence-relay library crate.
//!
//! A WebSocket relay that keeps a live directory of streamers and pushes it
//! to every connected client whenever it changes.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Clients (JSON over WebSocket)
//!         ↕
//! [presence-relay]
//!   ├── domain/           RelayConfig, LivenessConfig
//!   ├── application/      Registry, broadcast, session dispatch, reaper
//!   └── infrastructure/
//!         ├── http_server/  axum router: /ws, /health, /list
//!         ├── sink/         Channel-backed OutboundSink + writer task
//!         └── config_file/  Optional TOML configuration
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `presence-core`, and talks to
//!   clients only through the `OutboundSink` trait.
//! - `infrastructure` depends on all other layers plus `axum` and `tokio::net`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: presence bookkeeping and protocol handling.
pub mod application;

/// Infrastructure layer: HTTP/WebSocket server and config file.
pub mod infrastructure;
