//! Integration tests for the WebSocket binding.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client, checking that one request frame in
//! yields one response frame out.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use mapban_transport::{
        Connection, Handshake, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0 and returns the transport with its real address.
    async fn bind_ephemeral() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport
            .local_addr()
            .expect("should have local addr")
            .to_string();
        (transport, addr)
    }

    /// Accepts one peer and completes its upgrade.
    async fn accept_upgraded(transport: &mut WebSocketTransport) -> WebSocketConnection {
        let pending = transport.accept().await.expect("should accept");
        pending.complete().await.expect("should upgrade")
    }

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_request_then_response() {
        let (mut transport, addr) = bind_ephemeral().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // Client sends a text request.
        client_ws
            .send(Message::Text(r#"{"phase":0}"#.into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"phase":0}"#);

        // Server answers; UTF-8 payloads travel as text frames.
        server_conn
            .send(br#"{"status":200}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON response should be a text frame");
        assert_eq!(msg.into_data().as_ref(), br#"{"status":200}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_binary_request_is_accepted() {
        let (mut transport, addr) = bind_ephemeral().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws
            .send(Message::Binary(b"raw".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, b"raw");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_response_is_binary() {
        let (mut transport, addr) = bind_ephemeral().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        server_conn.send(&[0xff, 0xfe]).await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_ephemeral().await;
        let server_handle = tokio::spawn(async move {
            accept_upgraded(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_accept_returns_before_peer_sends_upgrade() {
        let (mut transport, addr) = bind_ephemeral().await;

        // A bare TCP peer that never speaks.
        let silent = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept should not wait for the handshake")
            .expect("should accept");

        assert_eq!(pending.peer_addr(), silent.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_complete_fails_when_peer_is_not_websocket() {
        use tokio::io::AsyncWriteExt;

        let (mut transport, addr) = bind_ephemeral().await;
        let mut peer = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let pending = transport.accept().await.expect("should accept");

        peer.write_all(b"hello\r\n\r\n").await.unwrap();
        peer.shutdown().await.unwrap();

        assert!(pending.complete().await.is_err());
    }
}
