//! Integration tests for the mapban server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mapban::prelude::*;
use mapban_store::MemoryStorage;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A server running on a random port, stoppable from the test.
struct Running {
    addr: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<Arc<MapBan>, MapbanError>>,
}

impl Running {
    async fn shutdown(self) -> Arc<MapBan> {
        let _ = self.stop.send(());
        self.handle
            .await
            .expect("server task should not panic")
            .expect("server should stop cleanly")
    }
}

async fn start_server_with(engine: MapBan, idle_timeout: Duration) -> Running {
    start_server_configured(
        engine,
        ServerConfig {
            idle_timeout,
            ..test_config()
        },
    )
    .await
}

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        ..ServerConfig::default()
    }
}

async fn start_server_configured(engine: MapBan, config: ServerConfig) -> Running {
    let server = MapBanServerBuilder::new()
        .config(config)
        .build(engine)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = stopped.await;
    }));

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    Running { addr, stop, handle }
}

async fn start_server() -> Running {
    start_server_with(
        MapBan::new(SessionRegistry::new(), MapCatalog::default()),
        Duration::from_secs(5),
    )
    .await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// Sends one JSON request and waits for its response.
async fn call(ws: &mut ClientWs, request: Value) -> Value {
    ws.send(Message::Text(request.to_string().into()))
        .await
        .expect("send");
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("response in time")
        .expect("stream open")
        .expect("recv");
    serde_json::from_slice(&msg.into_data()).expect("response is JSON")
}

fn create_request(seq: u64) -> Value {
    json!({
        "seq": seq,
        "phase": 0,
        "orangeTeamName": "OrangeCo",
        "blueTeamName": "BlueCo",
        "mapPool": ["Bank", "Border", "Chalet", "Clubhouse", "Coastline", "Consulate", "Kafe"]
    })
}

fn upgrade_request(addr: &str) -> String {
    format!(
        "GET / HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    )
}

/// Reads an HTTP response head, or whatever arrives before EOF.
async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
            .await
            .expect("server should answer or hang up")
            .expect("read");
        head.extend_from_slice(&buf[..n]);
        if n == 0 || head.windows(4).any(|w| w == b"\r\n\r\n") {
            return String::from_utf8_lossy(&head).into_owned();
        }
    }
}

fn choice(seq: u64, phase: u8, token: &Value, map: &str) -> Value {
    json!({ "seq": seq, "phase": phase, "token": token, "choice": map })
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_full_ritual_over_websocket() {
    let server = start_server().await;
    let mut host = connect(&server.addr).await;

    let created = call(&mut host, create_request(1)).await;
    assert_eq!(created["seq"], 1);
    assert_eq!(created["status"], 200);
    assert_eq!(created["body"]["type"], "created");
    assert_eq!(created["body"]["currentPhase"], 1);
    let orange = created["body"]["orangeToken"].clone();
    let blue = created["body"]["blueToken"].clone();
    let host_token = created["body"]["hostToken"].clone();

    // Teams on their own connections.
    let mut orange_ws = connect(&server.addr).await;
    let mut blue_ws = connect(&server.addr).await;

    let r = call(&mut orange_ws, choice(2, 1, &orange, "Bank")).await;
    assert_eq!(r["status"], 200);
    assert_eq!(r["body"], json!({"type": "mapsChosen", "mapsChosen": ["Bank"]}));

    let dup = call(&mut blue_ws, choice(3, 2, &blue, "Bank")).await;
    assert_eq!(dup["status"], 400);
    assert_eq!(dup["body"]["type"], "error");

    let steps = [
        (2, "Border"),
        (3, "Chalet"),
        (4, "Clubhouse"),
        (5, "Coastline"),
        (6, "Consulate"),
    ];
    for (phase, map) in steps {
        // Orange acts on odd phases, Blue on even ones.
        let (ws, token) = if phase % 2 == 0 {
            (&mut blue_ws, &blue)
        } else {
            (&mut orange_ws, &orange)
        };
        let r = call(ws, choice(10 + u64::from(phase), phase, token, map)).await;
        assert_eq!(r["status"], 200, "phase {phase}: {r}");
    }

    let result = call(&mut host, choice(20, 7, &host_token, "Kafe")).await;
    assert_eq!(result["status"], 200);
    assert_eq!(
        result["body"],
        json!({"type": "result", "maps": ["Chalet", "Clubhouse", "Kafe"]})
    );

    let gone = call(&mut orange_ws, json!({"seq": 21, "kind": "status", "token": orange})).await;
    assert_eq!(gone["status"], 500);

    let engine = server.shutdown().await;
    assert!(engine.registry().is_empty().await);
}

#[tokio::test]
async fn test_wrong_role_and_wrong_phase_status_codes() {
    let server = start_server().await;
    let mut ws = connect(&server.addr).await;
    let created = call(&mut ws, create_request(1)).await;
    let blue = created["body"]["blueToken"].clone();
    let orange = created["body"]["orangeToken"].clone();

    let forbidden = call(&mut ws, choice(2, 1, &blue, "Bank")).await;
    assert_eq!(forbidden["status"], 403);

    let conflict = call(&mut ws, choice(3, 4, &orange, "Bank")).await;
    assert_eq!(conflict["status"], 409);

    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_create_lists_field_errors() {
    let server = start_server().await;
    let mut ws = connect(&server.addr).await;

    let r = call(
        &mut ws,
        json!({"seq": 5, "phase": 0, "orangeTeamName": "", "blueTeamName": "B", "mapPool": ["Bank", "Atlantis"]}),
    )
    .await;

    assert_eq!(r["seq"], 5);
    assert_eq!(r["status"], 400);
    let errors = r["body"]["errors"].as_array().expect("field errors");
    assert!(errors.iter().any(|e| e["field"] == "orangeTeamName"));
    assert!(errors.iter().any(|e| e["field"] == "mapPool"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frame_answered_and_connection_kept() {
    let server = start_server().await;
    let mut ws = connect(&server.addr).await;

    ws.send(Message::Text("not json at all".into())).await.unwrap();
    let msg = ws.next().await.unwrap().expect("recv");
    let r: Value = serde_json::from_slice(&msg.into_data()).unwrap();
    assert_eq!(r["status"], 400);
    assert_eq!(r["seq"], 0);

    // Same connection still serves requests.
    let created = call(&mut ws, create_request(2)).await;
    assert_eq!(created["status"], 200);

    server.shutdown().await;
}

#[tokio::test]
async fn test_status_poll_shows_next_actor() {
    let server = start_server().await;
    let mut ws = connect(&server.addr).await;
    let created = call(&mut ws, create_request(1)).await;
    let host_token = created["body"]["hostToken"].clone();

    let r = call(&mut ws, json!({"seq": 2, "kind": "status", "token": host_token})).await;

    assert_eq!(r["status"], 200);
    assert_eq!(r["body"]["type"], "status");
    assert_eq!(r["body"]["role"], "host");
    assert_eq!(r["body"]["next"]["actor"], "orange");
    assert_eq!(r["body"]["next"]["action"], "ban");
    assert!(r["body"].get("hostToken").is_none(), "polls never leak tokens");

    server.shutdown().await;
}

#[tokio::test]
async fn test_idle_connection_closed_by_server() {
    let server = start_server_with(
        MapBan::new(SessionRegistry::new(), MapCatalog::default()),
        Duration::from_millis(100),
    )
    .await;
    let mut ws = connect(&server.addr).await;

    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("server should close the idle connection");
    match next {
        None | Some(Ok(Message::Close(_))) | Some(Err(_)) => {}
        Some(Ok(other)) => panic!("unexpected frame: {other:?}"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_hands_back_live_sessions_for_snapshot() {
    let server = start_server().await;
    let mut ws = connect(&server.addr).await;
    let created = call(&mut ws, create_request(1)).await;
    let orange = created["body"]["orangeToken"].clone();
    call(&mut ws, choice(2, 1, &orange, "Bank")).await;

    // Connection still open when shutdown starts.
    let engine = server.shutdown().await;
    assert_eq!(engine.registry().len().await, 1);

    let store = SnapshotStore::new(MemoryStorage::new());
    store
        .save(engine.registry(), engine.catalog())
        .await
        .expect("snapshot");
    let (restored, _) = store.restore().expect("restore");
    let token = Token::new(orange.as_str().unwrap());
    let (role, session) = restored.resolve(&token).await.unwrap();
    assert_eq!(role, Role::Orange);
    assert_eq!(session.maps_chosen(), ["Bank"]);

    // A restarted server continues the same session.
    let restarted = start_server_with(
        MapBan::new(restored, MapCatalog::default()),
        Duration::from_secs(5),
    )
    .await;
    let blue = created["body"]["blueToken"].clone();
    let mut ws = connect(&restarted.addr).await;
    let r = call(&mut ws, choice(3, 2, &blue, "Border")).await;
    assert_eq!(r["status"], 200);
    assert_eq!(r["body"]["mapsChosen"], json!(["Bank", "Border"]));

    restarted.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = start_server().await;
    let addr = server.addr.clone();

    server.shutdown().await;

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}")).await;
    assert!(result.is_err(), "listener should be closed after shutdown");
}

#[tokio::test]
async fn test_silent_tcp_peer_does_not_block_other_clients() {
    let server = start_server().await;

    // Connects but never sends an upgrade request.
    let _silent = TcpStream::connect(&server.addr).await.unwrap();

    let (mut ws, _) = tokio::time::timeout(
        Duration::from_secs(2),
        tokio_tungstenite::connect_async(format!("ws://{}", server.addr)),
    )
    .await
    .expect("second client should not wait on the silent one")
    .expect("should connect");
    let created = call(&mut ws, create_request(1)).await;
    assert_eq!(created["status"], 200);

    server.shutdown().await;
}

#[tokio::test]
async fn test_partial_upgrade_survives_other_connection_closing() {
    let server = start_server().await;
    let request = upgrade_request(&server.addr);
    let (head, rest) = request.as_bytes().split_at(20);

    let mut slow = TcpStream::connect(&server.addr).await.unwrap();
    slow.write_all(head).await.unwrap();

    // Another connection comes and goes while the slow upgrade is pending.
    let mut quick = connect(&server.addr).await;
    quick.close(None).await.unwrap();
    drop(quick);
    tokio::time::sleep(Duration::from_millis(100)).await;

    slow.write_all(rest).await.unwrap();
    let reply = read_head(&mut slow).await;
    assert!(
        reply.starts_with("HTTP/1.1 101"),
        "upgrade should complete, got {reply:?}"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_stalled_upgrade_dropped_after_handshake_timeout() {
    let server = start_server_configured(
        MapBan::new(SessionRegistry::new(), MapCatalog::default()),
        ServerConfig {
            handshake_timeout: Duration::from_millis(100),
            ..test_config()
        },
    )
    .await;

    let mut stalled = TcpStream::connect(&server.addr).await.unwrap();
    stalled.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

    let reply = read_head(&mut stalled).await;
    assert_eq!(reply, "", "server should hang up without answering");

    server.shutdown().await;
}
