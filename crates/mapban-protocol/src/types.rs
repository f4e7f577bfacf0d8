//! Core types shared by every layer: tokens, phases, roles, and the views
//! of a session that travel back to clients.
//!
//! Everything here derives `Serialize`/`Deserialize` with camelCase field
//! names, because browser clients consume these as JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// An opaque capability string identifying one role in one session.
///
/// Newtype over `String` so a token can't be confused with a map name or
/// a team name in a function signature. `#[serde(transparent)]` keeps the
/// JSON form a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix that is safe to put in logs.
    ///
    /// Full tokens are bearer credentials and never get logged.
    pub fn fingerprint(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A step of the ban/pick ritual, 0 through 7.
///
/// Phase 0 is session creation, 1 through 7 are the seven choices. The
/// value is validated on construction and on deserialization, so a
/// `Phase` in hand is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Phase(u8);

impl Phase {
    /// The creation phase.
    pub const CREATE: Phase = Phase(0);

    /// Orange's first ban; a new session waits here.
    pub const FIRST: Phase = Phase(1);

    /// The Host's decider; completing it closes the session.
    pub const FINAL: Phase = Phase(7);

    /// Returns `None` for values above 7.
    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::FINAL.0).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The phase after this one, or `None` past the final phase.
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    pub fn is_final(self) -> bool {
        self == Self::FINAL
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
            .ok_or_else(|| format!("phase {value} is outside 0..=7"))
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role / Action
// ---------------------------------------------------------------------------

/// Which of the three participants a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Orange,
    Blue,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Orange => f.write_str("orange"),
            Self::Blue => f.write_str("blue"),
        }
    }
}

/// What a choice does to the map it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Ban,
    Pick,
}

impl Action {
    /// Past tense, for log lines ("Orange banned Bank").
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Ban => "banned",
            Self::Pick => "picked",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ban => f.write_str("ban"),
            Self::Pick => f.write_str("pick"),
        }
    }
}

/// The step a session is waiting on: who acts, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub phase: Phase,
    pub actor: Role,
    pub action: Action,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// The public view of a freshly created session, returned to the Host.
///
/// This is the only response that carries all three tokens; the Host is
/// expected to hand the Orange and Blue tokens to the team captains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub host_token: Token,
    pub orange_token: Token,
    pub blue_token: Token,
    pub orange_team_name: String,
    pub blue_team_name: String,
    pub map_pool: Vec<String>,
    pub maps_chosen: Vec<String>,
    pub current_phase: Phase,
}

/// What a participant sees when polling a session.
///
/// No tokens: a poller learns its own role, never the other roles'
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub role: Role,
    pub current_phase: Phase,
    pub next: Option<NextStep>,
    pub orange_team_name: String,
    pub blue_team_name: String,
    pub map_pool: Vec<String>,
    pub maps_chosen: Vec<String>,
    pub remaining: Vec<String>,
}
