//! Channel-backed [`OutboundSink`] and the per-connection writer task.
//!
//! Each WebSocket is split into a read half (owned by the session loop) and a
//! write half (owned by [`pump_outbound`]).  Everything that wants to send to
//! the client, whether a direct reply, a broadcast or a reaper close, pushes an
//! [`OutboundFrame`] into an unbounded channel; the writer drains it in order.
//!
//! ```text
//! Session / broadcast / reaper ──► ChannelSink ──mpsc──► pump_outbound ──► WebSocket
//! ```
//!
//! Pushing into the channel never blocks, which keeps registry operations
//! free of socket I/O.  Once the writer exits (socket broken or close sent)
//! the receiver is dropped and every later send fails with
//! [`SendError::Closed`], which callers swallow.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::outbound::{OutboundSink, SendError};

/// One instruction for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A JSON text frame.
    Text(String),
    /// Send a Close frame and stop writing.
    Close,
}

/// [`OutboundSink`] that queues frames for a writer task.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its writer task must drain.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl OutboundSink for ChannelSink {
    fn send_text(&self, payload: &str) -> Result<(), SendError> {
        self.tx
            .send(OutboundFrame::Text(payload.to_owned()))
            .map_err(|_| SendError::Closed)
    }

    fn close(&self) -> Result<(), SendError> {
        self.tx
            .send(OutboundFrame::Close)
            .map_err(|_| SendError::Closed)
    }
}

/// Drains `rx` into the WebSocket write half until the channel closes, a
/// write fails, or a [`OutboundFrame::Close`] has been sent.
pub async fn pump_outbound<S>(mut rx: mpsc::UnboundedReceiver<OutboundFrame>, mut ws_tx: S)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = rx.recv().await {
        match frame {
            OutboundFrame::Text(payload) => {
                if let Err(e) = ws_tx.send(Message::Text(payload.into())).await {
                    debug!("WebSocket write failed (client gone): {e}");
                    break;
                }
            }
            OutboundFrame::Close => {
                if let Err(e) = ws_tx.send(Message::Close(None)).await {
                    debug!("WebSocket close failed: {e}");
                }
                break;
            }
        }
    }
}
