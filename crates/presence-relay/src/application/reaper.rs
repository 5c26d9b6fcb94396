//! Liveness reaper: evicts connections that have gone quiet.
//!
//! Every `cleanup_interval` the reaper walks a snapshot of all handles and
//! removes each connection whose last activity is older than
//! `activity_timeout`, asking its transport to close on the way out.  If any
//! evicted connection was a streamer, exactly one presence broadcast follows
//! the scan, reflecting the table after all evictions.  Viewer-only or
//! unjoined evictions broadcast nothing.
//!
//! ```text
//! tick ─► all_handles() ─► remove_if_stale(h) ─► close(h) ─┐
//!                                                           ├─► one broadcast
//!                                          (any streamer?) ─┘    (if yes)
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use presence_core::ConnectionHandle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::application::broadcast::{broadcast_presence, BroadcastReport};
use crate::application::clock;
use crate::application::outbound::close_best_effort;
use crate::application::registry::ConnectionRegistry;
use crate::application::shutdown::wait_for_shutdown;
use crate::domain::config::LivenessConfig;

/// Result of one reaper scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Handles removed during this scan, in connection order.
    pub evicted: Vec<ConnectionHandle>,
    /// How many of them were streamers.
    pub streamers_evicted: usize,
    /// The single broadcast issued after the scan, if any.
    pub broadcast: Option<BroadcastReport>,
}

/// Runs one scan as of `now`.
pub async fn reap_stale(
    registry: &ConnectionRegistry,
    now: Instant,
    timeout: Duration,
) -> ReapReport {
    let mut report = ReapReport::default();

    for handle in registry.all_handles().await {
        let Some(conn) = registry.remove_if_stale(handle, now, timeout).await else {
            continue;
        };
        close_best_effort(conn.sink.as_ref(), handle);
        debug!(
            "{handle}: evicted after {:?} idle ({} {})",
            now.saturating_duration_since(conn.record.last_activity()),
            conn.record.role(),
            conn.record.id
        );

        if conn.record.is_streamer() {
            report.streamers_evicted += 1;
        }
        report.evicted.push(handle);
    }

    if report.streamers_evicted > 0 {
        report.broadcast = Some(broadcast_presence(registry).await);
    }
    report
}

/// Starts the periodic reaper on the current runtime.
///
/// The task runs until `running` is cleared; await the returned handle to
/// wait for it to stop.
pub fn spawn_reaper(
    registry: Arc<ConnectionRegistry>,
    liveness: LivenessConfig,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move { run_reaper(registry, liveness, running).await })
}

async fn run_reaper(
    registry: Arc<ConnectionRegistry>,
    liveness: LivenessConfig,
    running: Arc<AtomicBool>,
) {
    info!(
        "reaper started: every {:?}, timeout {:?}",
        liveness.cleanup_interval, liveness.activity_timeout
    );

    let mut ticker = interval(liveness.cleanup_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // Skip the immediate first tick.

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wait_for_shutdown(&running) => break,
        }

        let report = reap_stale(&registry, clock::now(), liveness.activity_timeout).await;
        if !report.evicted.is_empty() {
            info!(
                "reaper evicted {} idle connection(s), {} streamer(s)",
                report.evicted.len(),
                report.streamers_evicted
            );
        }
    }

    info!("reaper stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
