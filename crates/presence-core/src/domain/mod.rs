//! Domain entities for the presence relay.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no sockets, no async runtime, no clocks of its own.  Every
//! operation that depends on time takes the current instant as a parameter,
//! which keeps the liveness rules deterministic under test.

/// Per-connection identity, role state machine and activity tracking.
pub mod client;

/// The streamer directory derived from the set of connected clients.
pub mod presence;
