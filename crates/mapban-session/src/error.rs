//! Error types for the session layer.

use mapban_protocol::ValidationErrors;

/// Errors that can occur while creating, resolving, or closing sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The creation request was rejected: empty team name, pool too
    /// small, maps outside the catalog, or repeated maps. Every problem
    /// is listed.
    #[error("invalid session: {0}")]
    Invalid(ValidationErrors),

    /// The token resolves to no live session.
    ///
    /// Once issued, a token stays valid until phase 7 closes its session,
    /// so this means either a stale token or a server-side bug. Carries
    /// the token's log fingerprint, never the full token.
    #[error("session not found for token {0}")]
    NotFound(String),

    /// The OS random source failed. The creation request is aborted
    /// rather than falling back to weaker randomness.
    #[error("token generation failed: {0}")]
    TokenGeneration(String),

    /// A freshly generated token is already in use.
    #[error("generated token collides with a live session")]
    TokenCollision,

    /// Sessions handed to the registry (usually from a snapshot) break
    /// an invariant.
    #[error("inconsistent session data: {0}")]
    Inconsistent(String),
}
