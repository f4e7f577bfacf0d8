/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away while a response was owed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a response frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a request frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a peer failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer did not complete the WebSocket upgrade.
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[source] std::io::Error),
}

