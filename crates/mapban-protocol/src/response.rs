//! Outbound responses.
//!
//! Every request gets exactly one [`Response`]. `status` follows HTTP
//! conventions (200, 4xx for caller mistakes, 5xx for server faults) so
//! clients can branch on it without parsing the body.

use serde::{Deserialize, Serialize};

use crate::{FieldError, SessionStatus, SessionView};

/// Status codes used on the wire.
pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const FORBIDDEN: u16 = 403;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

/// One response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Copied from the request's `seq`.
    pub seq: u64,
    pub status: u16,
    pub body: ResponseBody,
}

/// The payload of a response, tagged by `type`:
///
/// ```json
/// { "type": "mapsChosen", "mapsChosen": ["Bank", "Border"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseBody {
    /// Phase 0: the new session, including all three tokens.
    Created(SessionView),

    /// Phases 1-6: the chosen sequence so far.
    #[serde(rename_all = "camelCase")]
    MapsChosen { maps_chosen: Vec<String> },

    /// Phase 7: `[orange pick, blue pick, decider]`. The session is gone.
    Result { maps: [String; 3] },

    /// A status poll.
    Status(SessionStatus),

    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        errors: Vec<FieldError>,
    },
}

impl Response {
    pub fn ok(seq: u64, body: ResponseBody) -> Self {
        Self {
            seq,
            status: status::OK,
            body,
        }
    }

    pub fn error(
        seq: u64,
        status: u16,
        message: impl Into<String>,
        errors: Vec<FieldError>,
    ) -> Self {
        Self {
            seq,
            status,
            body: ResponseBody::Error {
                message: message.into(),
                errors,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
