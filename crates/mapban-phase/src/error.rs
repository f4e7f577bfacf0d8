//! Error types for the phase layer.

use mapban_protocol::{Phase, Role};

/// Why a choice was refused.
///
/// Every variant leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// The request names a phase other than the one the session is
    /// waiting for: a replay, a skip, or the loser of a race.
    #[error("phase {got} is out of sequence; session is waiting for phase {expected}")]
    OutOfSequence { expected: Phase, got: Phase },

    /// Right session, wrong role.
    #[error("phase {phase} belongs to {required}, not {presented}")]
    Unauthorized {
        phase: Phase,
        required: Role,
        presented: Role,
    },

    #[error("map not in pool: {0}")]
    MapNotInPool(String),

    #[error("map already chosen: {0}")]
    DuplicateMap(String),

    /// The session record contradicts the phase table. Only reachable
    /// through a bug or a hand-edited snapshot.
    #[error("session state is inconsistent: {0}")]
    Inconsistent(String),
}
