//! # presence-core
//!
//! Shared library for the presence relay containing the connection-level
//! domain types and the JSON wire protocol spoken over WebSocket.
//!
//! It has zero dependencies on async runtimes, sockets, or HTTP frameworks.
//!
//! # Architecture overview
//!
//! The relay keeps a live directory of the streamers that are currently
//! connected and pushes that directory to every connected client whenever it
//! changes.  This crate defines the vocabulary for that:
//!
//! - **`domain`** – What a connection *is*: its opaque [`ConnectionHandle`],
//!   its [`Role`] state machine, the mutable [`ClientRecord`], and the derived
//!   [`PresenceSnapshot`] (the list of streamers).
//!
//! - **`protocol`** – How messages look on the wire.  Every frame is a JSON
//!   object with a `"type"` discriminant; [`InboundMessage`] covers what
//!   clients send and [`OutboundMessage`] covers what the relay sends back.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `presence_core::ClientRecord` instead of `presence_core::domain::client::ClientRecord`.
pub use domain::client::{
    ClientRecord, ConnectionHandle, Role, DEFAULT_DISPLAY_NAME, DEFAULT_VIEWER_NAME,
};
pub use domain::presence::{PresenceSnapshot, StreamerEntry};
pub use protocol::codec::{decode_inbound, encode_outbound, DecodeError, Decoded};
pub use protocol::messages::{InboundMessage, OutboundMessage};
