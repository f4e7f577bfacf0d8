//! Inbound requests: decode loosely, then validate into a typed shape.
//!
//! A frame is first decoded into [`RawRequest`], where every field is
//! optional. [`RawRequest::validate`] then checks presence and ranges for
//! the requested phase and either produces a [`Request`] or the complete
//! list of field problems. Handlers never look at a half-checked request.

use serde::{Deserialize, Serialize};

use crate::{Phase, Token, ValidationErrors};

/// Whether the frame asks to act or only to look.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Create a session (phase 0) or make a choice (phases 1-7).
    #[default]
    Action,
    /// Read-only poll of the session behind `token`.
    Status,
}

/// A request exactly as it arrived, before any checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    /// Client-chosen correlation number, echoed in the response.
    #[serde(default)]
    pub seq: u64,

    #[serde(default)]
    pub kind: RequestKind,

    /// Signed and wide on purpose: `-1` or `12` should reach validation
    /// and be reported as a field error, not fail decoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orange_team_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blue_team_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_pool: Option<Vec<String>>,
}

/// Phase-0 payload: everything needed to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSession {
    pub orange_team_name: String,
    pub blue_team_name: String,
    pub map_pool: Vec<String>,
}

/// Phase 1-7 payload: one ban or pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapChoice {
    pub phase: Phase,
    pub token: Token,
    pub choice: String,
}

/// A request whose fields are all present and in range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Create(CreateSession),
    Choose(MapChoice),
    Status { token: Token },
}

impl RawRequest {
    /// Checks the fields the requested operation needs.
    ///
    /// Fields the operation does not use are ignored. All problems are
    /// collected; the error lists every one of them.
    pub fn validate(self) -> Result<Request, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.kind == RequestKind::Status {
            let token = require_non_empty(self.token, "token", &mut errors);
            errors.into_result()?;
            return Ok(Request::Status {
                token: Token::new(token.unwrap_or_default()),
            });
        }

        let phase = match self.phase {
            None => {
                errors.push("phase", "missing");
                None
            }
            Some(raw) => {
                let phase = u8::try_from(raw).ok().and_then(Phase::new);
                if phase.is_none() {
                    errors.push("phase", format!("{raw} is not between 0 and 7"));
                }
                phase
            }
        };

        match phase {
            Some(Phase::CREATE) => {
                let orange = require(self.orange_team_name, "orangeTeamName", &mut errors);
                let blue = require(self.blue_team_name, "blueTeamName", &mut errors);
                let pool = require(self.map_pool, "mapPool", &mut errors);
                errors.into_result()?;
                Ok(Request::Create(CreateSession {
                    orange_team_name: orange.unwrap_or_default(),
                    blue_team_name: blue.unwrap_or_default(),
                    map_pool: pool.unwrap_or_default(),
                }))
            }
            Some(phase) => {
                let token = require_non_empty(self.token, "token", &mut errors);
                let choice = require_non_empty(self.choice, "choice", &mut errors);
                errors.into_result()?;
                Ok(Request::Choose(MapChoice {
                    phase,
                    token: Token::new(token.unwrap_or_default()),
                    choice: choice.unwrap_or_default(),
                }))
            }
            None => Err(errors),
        }
    }
}

fn require<T>(
    value: Option<T>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    if value.is_none() {
        errors.push(field, "missing");
    }
    value
}

fn require_non_empty(
    value: Option<String>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match value {
        None => {
            errors.push(field, "missing");
            None
        }
        Some(v) if v.is_empty() => {
            errors.push(field, "must not be empty");
            None
        }
        Some(v) => Some(v),
    }
}
