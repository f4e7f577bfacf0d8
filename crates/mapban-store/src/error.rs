//! Error types for the store.

use mapban_protocol::ProtocolError;
use mapban_session::SessionError;

/// Errors from saving or restoring a snapshot.
///
/// On restore, everything except a missing file is fatal: the server
/// refuses to start rather than silently dropping live sessions.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] ProtocolError),

    /// The file exists but is not a readable snapshot (truncated,
    /// garbled, or wrong shape).
    #[error("snapshot is corrupt: {0}")]
    Corrupt(#[source] ProtocolError),

    #[error("snapshot version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The snapshot decoded but its contents contradict each other.
    #[error("snapshot is invalid: {0}")]
    Invalid(String),

    #[error("snapshot sessions rejected: {0}")]
    Registry(#[from] SessionError),

    /// The blocking writer task panicked or was cancelled.
    #[error("snapshot writer failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}
