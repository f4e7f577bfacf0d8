//! Transport layer for mapban.
//!
//! The engine only needs a request/response channel: read one request
//! frame, write one response frame, repeat. The [`Transport`] and
//! [`Connection`] traits describe exactly that, so the server loop never
//! touches a socket type directly.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket binding via `tokio-tungstenite`.
//!   Every text or binary frame is one request.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingConnection, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Dropping the transport closes the listener; that is how the server
/// stops intake during shutdown.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted peer that has not finished its handshake yet.
    type Pending: Handshake<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming peer.
    ///
    /// Only the raw accept happens here, so this is cancel-safe and a
    /// slow peer cannot hold up the listener. Finish the handshake with
    /// [`Handshake::complete`], off the accept loop.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// The address the listener is actually bound to (useful after
    /// binding to port 0).
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// The second half of accepting a connection.
pub trait Handshake: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Runs the protocol handshake. A peer can stall here for as long as
    /// it likes; callers bound it with a timeout.
    async fn complete(self) -> Result<Self::Connection, Self::Error>;
}

/// One client connection carrying a sequence of request/response pairs.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Receives the next request frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    /// Must be cancel-safe: dropping the future before it resolves loses
    /// no frame.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends one response frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
