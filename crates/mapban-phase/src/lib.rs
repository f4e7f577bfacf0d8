//! The ban/pick state machine for mapban.
//!
//! A session moves through seven phases after creation. Each phase has
//! exactly one actor and one action, fixed by the [phase table](step_for).
//! A choice is accepted only if it names the phase the session is waiting
//! for, comes from that phase's actor, and picks a map that is in the pool
//! and still free.
//!
//! ```text
//! created ──→ 1 ──→ 2 ──→ 3 ──→ 4 ──→ 5 ──→ 6 ──→ 7 ──→ closed
//!            O-ban B-ban O-pick B-pick O-ban B-ban H-pick
//! ```
//!
//! Transitions are forward-only single steps. Completing phase 7 yields
//! the three played maps and removes the session.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)  ← runs choose() inside SessionRegistry::with_session
//!     ↕
//! Phase Layer (this crate)  ← the table, validation, transitions
//!     ↕
//! Session Layer (below)  ← Session, SessionEntry
//! ```

mod error;
mod machine;
mod table;

pub use error::PhaseError;
pub use machine::{Applied, apply, choose, status, validate};
pub use table::{bans, next_step, picks, step_for};
