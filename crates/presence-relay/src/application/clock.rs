//! Time sources used by the session handler and the reaper.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic "now" for activity tracking.
///
/// Read through tokio's clock so paused-time tests can advance it.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Wall-clock milliseconds since the Unix epoch, as sent in `pong.t`.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
