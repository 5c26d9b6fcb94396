//! HTTP listener: WebSocket upgrade endpoint, health probe and presence list.
//!
//! Routes:
//!
//! | Path      | Behaviour                                                    |
//! |-----------|--------------------------------------------------------------|
//! | `/ws`     | WebSocket upgrade; `400 expected websocket` for plain HTTP   |
//! | `/health` | `200 OK` with body `OK`                                      |
//! | `/list`   | `200` with the current `users` message as JSON               |
//! | anything  | `200` with a short banner                                    |
//!
//! # Per-connection tasks
//!
//! Each upgraded socket is split.  The write half belongs to a spawned
//! [`pump_outbound`] task fed by a [`ChannelSink`]; the read half is driven by
//! [`handle_socket`], which forwards text frames to the [`Session`].  Whichever
//! side finishes first ends the connection: a peer close or error, or the
//! writer exiting after a relay-initiated close.  The leave procedure then
//! runs once.
//!
//! # Shutdown
//!
//! [`serve`] stops accepting once the shared `running` flag is cleared.
//! [`run_server`] also owns the reaper task and waits for it to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use futures_util::StreamExt;
use presence_core::OutboundMessage;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::application::registry::ConnectionRegistry;
use crate::application::reaper::spawn_reaper;
use crate::application::session::Session;
use crate::application::shutdown::wait_for_shutdown;
use crate::domain::config::RelayConfig;
use crate::infrastructure::sink::{pump_outbound, ChannelSink};

/// Body served for any path without a dedicated route.
pub const BANNER: &str = "Presence relay WebSocket server";

/// Body of the `400` returned when `/ws` is hit without an upgrade.
pub const NOT_WEBSOCKET_BODY: &str = "expected websocket";

/// Content type of `/list` responses.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
}

/// Builds the relay's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", any(ws_handler))
        .route("/health", get(health))
        .route("/list", get(list_streamers))
        .fallback(banner)
        .with_state(state)
}

async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state.registry))
            .into_response(),
        Err(rejection) => {
            debug!("rejected non-upgrade request on /ws: {rejection}");
            (StatusCode::BAD_REQUEST, NOT_WEBSOCKET_BODY).into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn list_streamers(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        Json(OutboundMessage::from(state.registry.presence().await)),
    )
}

async fn banner() -> &'static str {
    BANNER
}

/// Drives one upgraded connection from welcome to teardown.
///
/// The session ends when the peer closes or errors, or when the writer task
/// finishes (after a relay-initiated close or a failed write).  Dropping both
/// socket halves then releases the TCP connection even if the peer never
/// answers the Close frame.
async fn handle_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (sink, outbound_rx) = ChannelSink::new();
    let mut writer = tokio::spawn(pump_outbound(outbound_rx, ws_tx));

    let session = Session::open(registry, sink).await;
    let handle = session.handle();

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = &mut writer => {
                debug!("{handle}: writer finished, dropping connection");
                break;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                session.handle_text(text.as_str()).await;
            }
            Some(Ok(Message::Binary(data))) => {
                debug!("{handle}: ignoring {}-byte binary frame", data.len());
            }
            Some(Ok(Message::Close(_))) | None => {
                debug!("{handle}: closed by peer");
                break;
            }
            // Transport-level ping/pong; axum answers pings itself.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("{handle}: WebSocket error: {e}");
                break;
            }
        }
    }

    drop(ws_rx);
    session.close().await;
}

/// Serves the router on an already-bound listener until `running` is cleared.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let app = router(AppState { registry });
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { wait_for_shutdown(&running).await })
        .await
        .context("HTTP server terminated with an error")
}

/// Binds `config.bind_addr`, starts the reaper, and serves until shutdown.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind presence relay on {}", config.bind_addr))?;

    info!("presence relay listening on {}", config.bind_addr);

    let registry = Arc::new(ConnectionRegistry::new());
    let reaper = spawn_reaper(Arc::clone(&registry), config.liveness, Arc::clone(&running));

    let result = serve(listener, registry, Arc::clone(&running)).await;

    // A failed server must not leave the reaper running.
    running.store(false, Ordering::SeqCst);
    if let Err(e) = reaper.await {
        warn!("reaper task ended abnormally: {e}");
    }

    info!("presence relay stopped");
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
