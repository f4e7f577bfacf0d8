//! Session state for mapban.
//!
//! This crate owns everything that lives between requests:
//!
//! 1. **Tokens** — unforgeable credentials, one per role ([`TokenIssuer`])
//! 2. **The catalog** — which maps a pool may contain ([`MapCatalog`])
//! 3. **Sessions** — the record of one ban/pick ritual ([`Session`])
//! 4. **The registry** — every live session, reachable by any of its
//!    three tokens ([`SessionRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Phase Layer (above)  ← validates and applies choices inside with_session
//!     ↕
//! Session Layer (this crate)  ← owns live sessions and their tokens
//!     ↕
//! Protocol Layer (below)  ← provides Token, Phase, Role, CreateSession
//! ```

mod catalog;
mod error;
mod registry;
mod session;
mod token;

pub use catalog::{DEFAULT_MAPS, MIN_POOL_SIZE, MapCatalog};
pub use error::SessionError;
pub use registry::{SessionEntry, SessionRegistry};
pub use session::Session;
pub use token::{RandomTokenIssuer, TOKEN_BYTES, TokenIssuer};
