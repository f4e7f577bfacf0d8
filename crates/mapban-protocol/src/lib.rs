//! Wire protocol for mapban.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Token`], [`Phase`], [`Role`], [`Action`], session views)
//!   shared by every layer above.
//! - **Requests** ([`RawRequest`] → [`Request`]): decode first, then
//!   validate, collecting every field problem into [`ValidationErrors`].
//! - **Responses** ([`Response`], [`ResponseBody`]) with HTTP-style status
//!   codes.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, values out.
//!
//! ```text
//! Transport (frames) → Protocol (Request / Response) → Engine (sessions)
//! ```

mod codec;
mod error;
mod request;
mod response;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{FieldError, ProtocolError, ValidationErrors};
pub use request::{CreateSession, MapChoice, RawRequest, Request, RequestKind};
pub use response::{Response, ResponseBody, status};
pub use types::{
    Action, NextStep, Phase, Role, SessionStatus, SessionView, Token,
};
