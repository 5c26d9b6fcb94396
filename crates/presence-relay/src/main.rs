//! Presence relay: entry point.
//!
//! Streamers announce themselves over a WebSocket; every connected client
//! receives the updated list of active streamers whenever it changes.
//!
//! # Usage
//!
//! ```text
//! presence-relay [OPTIONS]
//!
//! Options:
//!   --config <PATH>                 Optional TOML configuration file
//!   --bind <IP>                     Listen address [default: 0.0.0.0]
//!   --port <PORT>                   Listen port [default: 8000]
//!   --cleanup-interval-ms <MS>      Reaper period [default: 15000]
//!   --activity-timeout-ms <MS>      Idle eviction threshold [default: 45000]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the config file, then CLI flags or their
//! environment variables.
//!
//! | Variable                        | Flag                    |
//! |---------------------------------|-------------------------|
//! | `PRESENCE_CONFIG`               | `--config`              |
//! | `PRESENCE_BIND`                 | `--bind`                |
//! | `PRESENCE_PORT`                 | `--port`                |
//! | `PRESENCE_CLEANUP_INTERVAL_MS`  | `--cleanup-interval-ms` |
//! | `PRESENCE_ACTIVITY_TIMEOUT_MS`  | `--activity-timeout-ms` |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use presence_relay::domain::RelayConfig;
use presence_relay::infrastructure::{load_config_file, run_server, ConfigFile};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// WebSocket presence relay.
///
/// Every flag is optional: unset flags keep the value from the config file,
/// or the built-in default when there is no file.
#[derive(Debug, Parser)]
#[command(
    name = "presence-relay",
    about = "WebSocket relay broadcasting the live directory of streamers",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "PRESENCE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "PRESENCE_BIND")]
    bind: Option<String>,

    /// TCP port for HTTP and WebSocket traffic.
    #[arg(long, env = "PRESENCE_PORT")]
    port: Option<u16>,

    /// Milliseconds between two liveness scans.
    #[arg(long, env = "PRESENCE_CLEANUP_INTERVAL_MS")]
    cleanup_interval_ms: Option<u64>,

    /// Milliseconds of silence after which a connection is evicted.
    #[arg(long, env = "PRESENCE_ACTIVITY_TIMEOUT_MS")]
    activity_timeout_ms: Option<u64>,
}

impl Cli {
    /// Merges defaults, the optional config file and the CLI flags into a
    /// validated [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, if the
    /// bind address is not an IP address, or if a duration is zero.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut file = match &self.config {
            Some(path) => load_config_file(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => ConfigFile::default(),
        };

        if let Some(bind) = self.bind {
            file.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            file.server.port = port;
        }
        if let Some(ms) = self.cleanup_interval_ms {
            file.liveness.cleanup_interval_ms = ms;
        }
        if let Some(ms) = self.activity_timeout_ms {
            file.liveness.activity_timeout_ms = ms;
        }

        file.into_relay_config().context("invalid relay configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "presence relay starting: bind={}, cleanup every {:?}, timeout {:?}",
        config.bind_addr, config.liveness.cleanup_interval, config.liveness.activity_timeout
    );

    // Cleared by Ctrl+C; the server and reaper poll it every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
