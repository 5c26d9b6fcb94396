//! Outbound delivery port.
//!
//! The application layer never touches a socket.  It pushes frames through an
//! [`OutboundSink`], which the infrastructure layer implements on top of a
//! per-connection writer task.  Every send is best-effort: the result tells
//! the caller whether the frame was handed off, and callers are free to drop
//! it.

use std::sync::Arc;

use presence_core::{encode_outbound, OutboundMessage};
use thiserror::Error;
use tracing::{debug, error};

use presence_core::ConnectionHandle;

/// Why a frame could not be handed to a connection's writer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The writer side of the connection is gone.
    #[error("connection closed")]
    Closed,
}

/// Write side of a single client connection.
///
/// Implementations must not block: a send either queues the frame or fails
/// immediately.
#[cfg_attr(test, mockall::automock)]
pub trait OutboundSink: Send + Sync {
    /// Queues one JSON text frame.
    fn send_text(&self, payload: &str) -> Result<(), SendError>;

    /// Asks the transport to close the connection.
    fn close(&self) -> Result<(), SendError>;
}

/// Shared handle to a connection's sink, as stored in the registry.
pub type SharedSink = Arc<dyn OutboundSink>;

/// Encodes and sends `msg` to one connection, swallowing any failure.
///
/// Returns whether the frame was queued so tests (and callers that care) can
/// observe it; ignoring the result is the normal case.
pub fn send_best_effort(
    sink: &dyn OutboundSink,
    handle: ConnectionHandle,
    msg: &OutboundMessage,
) -> Result<(), SendError> {
    let payload = match encode_outbound(msg) {
        Ok(p) => p,
        Err(e) => {
            error!("{handle}: failed to encode outbound message: {e}");
            return Ok(());
        }
    };
    sink.send_text(&payload).inspect_err(|e| {
        debug!("{handle}: send dropped: {e}");
    })
}

/// Closes one connection, ignoring failure.
pub fn close_best_effort(sink: &dyn OutboundSink, handle: ConnectionHandle) {
    if let Err(e) = sink.close() {
        debug!("{handle}: close ignored: {e}");
    }
}
