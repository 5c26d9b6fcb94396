//! Cooperative shutdown signal shared by the server and the reaper.
//!
//! `main.rs` owns an `Arc<AtomicBool>` that starts `true` and is cleared by
//! the Ctrl+C handler.  Long-running loops poll it instead of being aborted,
//! so they can finish the iteration they are in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How often [`wait_for_shutdown`] re-checks the flag.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Resolves once `running` has been cleared.
pub async fn wait_for_shutdown(running: &AtomicBool) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
}
