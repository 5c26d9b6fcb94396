//! Presence broadcast: push the streamer list to every open connection.
//!
//! The payload is computed and serialized once per broadcast, from the same
//! registry snapshot that produced the recipient list.  Delivery is
//! fire-and-forget: a recipient whose send fails is counted and skipped, and
//! the remaining recipients still get the frame.  There is no retry; a
//! recipient that missed one update receives the next.

use presence_core::{encode_outbound, OutboundMessage};
use tracing::{debug, error};

use crate::application::registry::ConnectionRegistry;

/// Outcome of one broadcast.  Purely informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients whose sink accepted the frame.
    pub delivered: usize,
    /// Recipients whose sink rejected the frame.
    pub failed: usize,
}

impl BroadcastReport {
    pub fn recipients(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Sends the current presence view to every registered connection.
///
/// Never fails: per-recipient errors are logged at `debug` and counted.
pub async fn broadcast_presence(registry: &ConnectionRegistry) -> BroadcastReport {
    let snapshot = registry.broadcast_snapshot().await;
    let streamers = snapshot.presence.len();

    let payload = match encode_outbound(&OutboundMessage::from(snapshot.presence)) {
        Ok(p) => p,
        Err(e) => {
            error!("failed to encode presence broadcast: {e}");
            return BroadcastReport::default();
        }
    };

    let mut report = BroadcastReport::default();
    for (handle, sink) in snapshot.recipients {
        match sink.send_text(&payload) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!("{handle}: presence broadcast dropped: {e}");
                report.failed += 1;
            }
        }
    }

    debug!(
        "presence broadcast: {streamers} streamer(s) to {} recipient(s), {} failed",
        report.recipients(),
        report.failed
    );
    report
}
