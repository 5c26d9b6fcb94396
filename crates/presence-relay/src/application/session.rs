//! Per-connection protocol handling.
//!
//! A [`Session`] is created when a WebSocket opens and consumed when it
//! closes.  In between, the transport feeds it every text frame in arrival
//! order; because one task owns the session and awaits each frame before
//! reading the next, messages from one connection are never handled
//! concurrently.
//!
//! # Dispatch table
//!
//! | type           | registry effect                     | reply                      | broadcast        |
//! |----------------|-------------------------------------|----------------------------|------------------|
//! | `join`         | role = streamer, id/name updated    | `joined`                   | yes              |
//! | `leave`        | removed, transport closed           | –                          | if was streamer  |
//! | `viewer_join`  | role = viewer, name updated         | `viewer_ack` then `users`  | no               |
//! | `viewer_leave` | removed, transport closed           | –                          | if was streamer  |
//! | `list`         | –                                   | `users`                    | no               |
//! | `ping`         | –                                   | `pong`                     | no               |
//!
//! Every frame that parses as a JSON object refreshes the connection's
//! activity before dispatch, including objects with an unknown `type`.
//! Anything else is dropped without a reply.

use std::sync::Arc;

use presence_core::{
    decode_inbound, ClientRecord, ConnectionHandle, Decoded, InboundMessage, OutboundMessage,
};
use tracing::{debug, error, info};

use crate::application::broadcast::broadcast_presence;
use crate::application::clock;
use crate::application::outbound::{close_best_effort, send_best_effort, SharedSink};
use crate::application::registry::ConnectionRegistry;

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a JSON object; no activity recorded.
    Discarded,
    /// A JSON object the relay does not act on, or the connection is already gone.
    Ignored,
    /// A recognised message was handled; carries its wire type.
    Handled(&'static str),
}

/// Protocol state for one open connection.
pub struct Session {
    handle: ConnectionHandle,
    sink: SharedSink,
    registry: Arc<ConnectionRegistry>,
}

impl Session {
    /// Greets a new connection with `welcome` and registers it (role `unknown`).
    ///
    /// The welcome is queued before the record becomes visible to
    /// broadcasts, so it is always the first frame the client receives.
    pub async fn open(registry: Arc<ConnectionRegistry>, sink: SharedSink) -> Self {
        let handle = registry.allocate_handle();
        let record = ClientRecord::new(clock::now());
        let temp_id = record.id.clone();

        let _ = send_best_effort(sink.as_ref(), handle, &OutboundMessage::welcome());

        if let Err(e) = registry.insert(handle, record, Arc::clone(&sink)).await {
            // Handles come from the registry's own counter, so this means a bug.
            error!("{handle}: {e}");
        }
        info!("{handle}: connection opened (id={temp_id})");

        Self {
            handle,
            sink,
            registry,
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Handles one inbound text frame.
    pub async fn handle_text(&self, text: &str) -> Dispatch {
        let decoded = match decode_inbound(text) {
            Ok(d) => d,
            Err(e) => {
                debug!("{}: discarding frame: {e}", self.handle);
                return Dispatch::Discarded;
            }
        };

        let now = clock::now();
        if self
            .registry
            .mutate(self.handle, |r| r.touch(now))
            .await
            .is_none()
        {
            debug!("{}: frame after removal ignored", self.handle);
            return Dispatch::Ignored;
        }

        let msg = match decoded {
            Decoded::Recognized(msg) => msg,
            Decoded::Unrecognized { type_name } => {
                debug!(
                    "{}: ignoring message type {}",
                    self.handle,
                    type_name.as_deref().unwrap_or("<none>")
                );
                return Dispatch::Ignored;
            }
        };

        let kind = msg.type_name();
        debug!("{}: {kind}", self.handle);

        match msg {
            InboundMessage::Join { room_id, name } => self.on_join(room_id, name).await,
            InboundMessage::Leave | InboundMessage::ViewerLeave => self.on_leave(kind).await,
            InboundMessage::ViewerJoin { name } => self.on_viewer_join(name).await,
            InboundMessage::List => self.send_presence().await,
            InboundMessage::Ping => self.reply(&OutboundMessage::Pong {
                t: clock::unix_millis(),
            }),
        }

        Dispatch::Handled(kind)
    }

    /// Transport closed or failed: drop the connection from the registry.
    ///
    /// Safe after `leave`/`viewer_leave`, which already removed it.
    pub async fn close(self) {
        if remove_connection(&self.registry, self.handle).await.is_some() {
            info!("{}: connection closed", self.handle);
        }
    }

    async fn on_join(&self, room_id: Option<String>, name: Option<String>) {
        let joined = self
            .registry
            .mutate(self.handle, |r| {
                r.join_as_streamer(room_id, name);
                (r.id.clone(), r.display_name.clone())
            })
            .await;

        let Some((room_id, name)) = joined else {
            return;
        };
        info!("{}: joined as streamer {room_id:?} ({name})", self.handle);

        self.reply(&OutboundMessage::Joined { room_id, name });
        broadcast_presence(&self.registry).await;
    }

    async fn on_viewer_join(&self, name: Option<String>) {
        let joined = self
            .registry
            .mutate(self.handle, |r| {
                r.join_as_viewer(name);
                r.display_name.clone()
            })
            .await;

        let Some(name) = joined else {
            return;
        };
        info!("{}: joined as viewer ({name})", self.handle);

        self.reply(&OutboundMessage::ViewerAck { name });
        self.send_presence().await;
    }

    async fn on_leave(&self, kind: &str) {
        if let Some(record) = remove_connection(&self.registry, self.handle).await {
            info!("{}: {kind} ({} {})", self.handle, record.role(), record.id);
        }
        close_best_effort(self.sink.as_ref(), self.handle);
    }

    async fn send_presence(&self) {
        let presence = self.registry.presence().await;
        self.reply(&presence.into());
    }

    fn reply(&self, msg: &OutboundMessage) {
        let _ = send_best_effort(self.sink.as_ref(), self.handle, msg);
    }
}

/// Removes `handle` and, if it was a streamer, broadcasts the new presence.
///
/// Returns the removed record; a second call for the same handle returns
/// `None` and does not broadcast.
pub async fn remove_connection(
    registry: &ConnectionRegistry,
    handle: ConnectionHandle,
) -> Option<ClientRecord> {
    let removed = registry.remove(handle).await?;
    if removed.record.is_streamer() {
        broadcast_presence(registry).await;
    }
    Some(removed.record)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
