//! Application layer for presence-relay.
//!
//! The application layer owns the relay's behaviour: the connection
//! registry, presence broadcasts, per-connection protocol dispatch and the
//! liveness reaper.  It reaches clients only through the [`OutboundSink`]
//! port and never opens a socket itself.
//!
//! # What does NOT belong here?
//!
//! - Accepting connections or HTTP routing (that is infrastructure)
//! - WebSocket framing (handled by axum / tungstenite)
//! - Reading configuration from the CLI or disk

pub mod broadcast;
pub mod clock;
pub mod outbound;
pub mod reaper;
pub mod registry;
pub mod session;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::{broadcast_presence, BroadcastReport};
pub use outbound::{OutboundSink, SendError, SharedSink};
pub use reaper::{reap_stale, spawn_reaper, ReapReport};
pub use registry::{ConnectionRegistry, RegistryError};
pub use session::{remove_connection, Dispatch, Session};
pub use shutdown::wait_for_shutdown;
