//! Unified error type for mapban.

use mapban_phase::PhaseError;
use mapban_protocol::{FieldError, ProtocolError, status};
use mapban_session::SessionError;
use mapban_store::StoreError;
use mapban_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MapbanError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid request).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bad creation request, unknown token).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A refused choice (wrong phase, wrong role, bad map).
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Snapshot save or restore failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MapbanError {
    /// The wire status for this error.
    ///
    /// 4xx means the caller can fix the request. 5xx means the server
    /// could not have served it; that includes an unknown token, since a
    /// token handed out by this server stays valid until its session
    /// finishes.
    pub fn status(&self) -> u16 {
        match self {
            Self::Protocol(ProtocolError::Decode(_))
            | Self::Protocol(ProtocolError::InvalidRequest(_))
            | Self::Session(SessionError::Invalid(_))
            | Self::Phase(PhaseError::MapNotInPool(_))
            | Self::Phase(PhaseError::DuplicateMap(_)) => status::BAD_REQUEST,
            Self::Phase(PhaseError::Unauthorized { .. }) => status::FORBIDDEN,
            Self::Phase(PhaseError::OutOfSequence { .. }) => status::CONFLICT,
            Self::Protocol(ProtocolError::Encode(_))
            | Self::Session(_)
            | Self::Phase(PhaseError::Inconsistent(_))
            | Self::Transport(_)
            | Self::Store(_) => status::INTERNAL_SERVER_ERROR,
        }
    }

    /// Per-field problems, for errors that carry them.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Protocol(ProtocolError::InvalidRequest(errors))
            | Self::Session(SessionError::Invalid(errors)) => {
                errors.iter().cloned().collect()
            }
            _ => Vec::new(),
        }
    }
}
