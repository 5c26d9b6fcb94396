//! End-to-end tests: a real relay on an ephemeral port, real WebSocket clients.
//!
//! Each test starts its own relay via `serve` on `127.0.0.1:0`, so tests are
//! independent and can run in parallel.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use presence_relay::application::{clock, reap_stale, ConnectionRegistry};
use presence_relay::infrastructure::serve;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE: Duration = Duration::from_millis(200);

struct Relay {
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    running: Arc<AtomicBool>,
    server: JoinHandle<anyhow::Result<()>>,
}

async fn start_relay() -> Relay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(ConnectionRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(serve(
        listener,
        Arc::clone(&registry),
        Arc::clone(&running),
    ));
    Relay {
        addr,
        registry,
        running,
        server,
    }
}

/// Connects to `/ws` and consumes the welcome frame.
async fn connect(addr: SocketAddr) -> Client {
    let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    assert_eq!(
        recv_json(&mut client).await,
        json!({"type": "welcome", "msg": "ws ok"})
    );
    client
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
async fn recv_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("WebSocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(client: &mut Client) {
    if let Ok(frame) = timeout(SILENCE, client.next()).await {
        panic!("expected no frame, got {frame:?}");
    }
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    timeout(RECV_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    response
}

// ── WebSocket protocol ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_welcome_is_first_frame_and_client_is_registered() {
    let relay = start_relay().await;

    let _client = connect(relay.addr).await;

    assert_eq!(relay.registry.len().await, 1);
}

#[tokio::test]
async fn test_join_replies_joined_then_broadcasts_to_everyone() {
    // Arrange
    let relay = start_relay().await;
    let mut a = connect(relay.addr).await;
    let mut b = connect(relay.addr).await;

    // Act
    send_json(&mut a, json!({"type": "join", "roomId": "room-1", "name": "Alice"})).await;

    // Assert
    let users = json!({"type": "users", "users": [{"id": "room-1", "name": "Alice"}]});
    assert_eq!(
        recv_json(&mut a).await,
        json!({"type": "joined", "roomId": "room-1", "name": "Alice"})
    );
    assert_eq!(recv_json(&mut a).await, users);
    assert_eq!(recv_json(&mut b).await, users);
}

#[tokio::test]
async fn test_viewer_join_acks_and_lists_without_broadcast() {
    // Arrange: one streamer already present
    let relay = start_relay().await;
    let mut s = connect(relay.addr).await;
    send_json(&mut s, json!({"type": "join", "roomId": "r", "name": "S"})).await;
    recv_json(&mut s).await; // joined
    recv_json(&mut s).await; // users

    let mut v = connect(relay.addr).await;

    // Act
    send_json(&mut v, json!({"type": "viewer_join", "name": "Bob"})).await;

    // Assert: the viewer sees ack then the list; nobody else hears about it
    assert_eq!(
        recv_json(&mut v).await,
        json!({"type": "viewer_ack", "name": "Bob"})
    );
    assert_eq!(
        recv_json(&mut v).await,
        json!({"type": "users", "users": [{"id": "r", "name": "S"}]})
    );
    assert_silent(&mut s).await;
}

#[tokio::test]
async fn test_viewer_join_without_name_defaults_to_viewer() {
    let relay = start_relay().await;
    let mut v = connect(relay.addr).await;

    send_json(&mut v, json!({"type": "viewer_join"})).await;

    assert_eq!(
        recv_json(&mut v).await,
        json!({"type": "viewer_ack", "name": "Viewer"})
    );
}

#[tokio::test]
async fn test_ping_returns_current_epoch_millis() {
    let relay = start_relay().await;
    let mut c = connect(relay.addr).await;
    let before = now_millis();

    send_json(&mut c, json!({"type": "ping"})).await;

    let reply = recv_json(&mut c).await;
    let after = now_millis();
    assert_eq!(reply["type"], "pong");
    let t = reply["t"].as_u64().expect("t must be an integer");
    assert!(before <= t && t <= after, "{before} <= {t} <= {after}");
}

#[tokio::test]
async fn test_list_replies_only_to_requester() {
    let relay = start_relay().await;
    let mut a = connect(relay.addr).await;
    let mut b = connect(relay.addr).await;

    send_json(&mut a, json!({"type": "list"})).await;

    assert_eq!(recv_json(&mut a).await, json!({"type": "users", "users": []}));
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn test_malformed_frames_get_no_reply() {
    // Arrange
    let relay = start_relay().await;
    let mut c = connect(relay.addr).await;

    // Act: garbage, a non-object and an unknown type, then a ping
    c.send(Message::Text("not json".into())).await.unwrap();
    c.send(Message::Text("[1,2,3]".into())).await.unwrap();
    send_json(&mut c, json!({"type": "dance"})).await;
    send_json(&mut c, json!({"type": "ping"})).await;

    // Assert: the pong is the very next frame and the client is still there
    assert_eq!(recv_json(&mut c).await["type"], "pong");
    assert_eq!(relay.registry.len().await, 1);
}

#[tokio::test]
async fn test_leave_removes_streamer_and_closes_socket() {
    // Arrange
    let relay = start_relay().await;
    let mut a = connect(relay.addr).await;
    let mut b = connect(relay.addr).await;
    send_json(&mut a, json!({"type": "join", "roomId": "x", "name": "X"})).await;
    recv_json(&mut a).await; // joined
    recv_json(&mut a).await; // users
    recv_json(&mut b).await; // users

    // Act
    send_json(&mut a, json!({"type": "leave"})).await;

    // Assert: B sees the empty list exactly once; A is closed by the relay
    assert_eq!(recv_json(&mut b).await, json!({"type": "users", "users": []}));
    let closing = timeout(RECV_TIMEOUT, a.next()).await.unwrap();
    assert!(
        matches!(closing, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "expected close, got {closing:?}"
    );
    assert_silent(&mut b).await;
    assert_eq!(relay.registry.len().await, 1);
}

#[tokio::test]
async fn test_streamer_disconnect_broadcasts_removal() {
    let relay = start_relay().await;
    let mut a = connect(relay.addr).await;
    let mut b = connect(relay.addr).await;
    send_json(&mut a, json!({"type": "join", "roomId": "gone", "name": "G"})).await;
    recv_json(&mut b).await; // users with G

    a.close(None).await.unwrap();

    assert_eq!(recv_json(&mut b).await, json!({"type": "users", "users": []}));
}

#[tokio::test]
async fn test_viewer_disconnect_does_not_broadcast() {
    let relay = start_relay().await;
    let mut v = connect(relay.addr).await;
    let mut b = connect(relay.addr).await;
    send_json(&mut v, json!({"type": "viewer_join", "name": "V"})).await;
    recv_json(&mut v).await; // viewer_ack

    v.close(None).await.unwrap();

    assert_silent(&mut b).await;
}

/// Performs the `/ws` handshake over a bare TCP stream that never answers
/// WebSocket control frames.
async fn silent_ws_peer(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /ws HTTP/1.1\r\nHost: {addr}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        timeout(RECV_TIMEOUT, stream.read_exact(&mut byte))
            .await
            .expect("timed out reading handshake")
            .unwrap();
        head.push(byte[0]);
    }
    assert!(head.starts_with(b"HTTP/1.1 101"), "{}", String::from_utf8_lossy(&head));
    stream
}

async fn wait_for_len(registry: &ConnectionRegistry, expected: usize) {
    timeout(RECV_TIMEOUT, async {
        while registry.len().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry never reached the expected size");
}

#[tokio::test]
async fn test_evicted_silent_peer_has_its_tcp_connection_dropped() {
    // Arrange: a peer that completed the handshake and then went quiet
    let relay = start_relay().await;
    let mut peer = silent_ws_peer(relay.addr).await;
    wait_for_len(&relay.registry, 1).await;

    // Act: a scan one minute in the future evicts it
    let report = reap_stale(
        &relay.registry,
        clock::now() + Duration::from_secs(60),
        Duration::from_secs(45),
    )
    .await;
    assert_eq!(report.evicted.len(), 1);

    // Assert: after the welcome and Close frames, the relay closes the socket
    let mut buf = [0u8; 256];
    let eof = timeout(Duration::from_secs(5), async {
        loop {
            match peer.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(eof.is_ok(), "relay kept the evicted connection open");
    assert!(relay.registry.is_empty().await);
}

// ── Plain HTTP routes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_route() {
    let relay = start_relay().await;

    let response = http_get(relay.addr, "/health").await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("OK"), "{response}");
}

#[tokio::test]
async fn test_list_route_reflects_joined_streamer() {
    let relay = start_relay().await;
    let mut a = connect(relay.addr).await;
    send_json(&mut a, json!({"type": "join", "roomId": "live", "name": "L"})).await;
    recv_json(&mut a).await; // joined

    let response = http_get(relay.addr, "/list").await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(
        response
            .to_ascii_lowercase()
            .contains("content-type: application/json; charset=utf-8"),
        "{response}"
    );
    assert!(
        response.ends_with(r#"{"type":"users","users":[{"id":"live","name":"L"}]}"#),
        "{response}"
    );
}

#[tokio::test]
async fn test_ws_without_upgrade_is_bad_request() {
    let relay = start_relay().await;

    let response = http_get(relay.addr, "/ws").await;

    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.ends_with("expected websocket"), "{response}");
}

#[tokio::test]
async fn test_server_stops_when_running_is_cleared() {
    let relay = start_relay().await;

    relay.running.store(false, Ordering::Relaxed);

    timeout(Duration::from_secs(2), relay.server)
        .await
        .expect("server must stop after shutdown")
        .unwrap()
        .unwrap();
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
