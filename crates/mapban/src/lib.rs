//! # mapban
//!
//! Token-gated map ban/pick sessions, served over WebSocket.
//!
//! A Host opens a session with two team names and a map pool and gets
//! back three tokens: its own, Orange's, and Blue's. The teams then take
//! turns banning and picking until the Host picks the decider, and the
//! session answers with the three maps to be played.
//!
//! ```text
//! WebSocket frame → RawRequest → validate → MapBan → Response frame
//!                                               │
//!                            SessionRegistry + phase table
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapban::prelude::*;
//!
//! # async fn run() -> Result<(), MapbanError> {
//! let store = SnapshotStore::new(FileStorage::new("mapban-data.json"));
//! let (registry, catalog) = store.restore()?;
//!
//! let server = MapBanServer::builder()
//!     .bind("0.0.0.0:4000")
//!     .build(MapBan::new(registry, catalog))
//!     .await?;
//! let engine = server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!
//! store.save(engine.registry(), engine.catalog()).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use engine::MapBan;
pub use error::MapbanError;
pub use server::{MapBanServer, MapBanServerBuilder};

pub mod prelude {
    pub use crate::{
        MapBan, MapBanServer, MapBanServerBuilder, MapbanError, ServerConfig,
    };
    pub use mapban_phase::{Applied, PhaseError};
    pub use mapban_protocol::{
        Action, Phase, RawRequest, Request, RequestKind, Response,
        ResponseBody, Role, SessionStatus, SessionView, Token, status,
    };
    pub use mapban_session::{
        MapCatalog, Session, SessionError, SessionRegistry,
    };
    pub use mapban_store::{FileStorage, SnapshotStore, StoreError};
}
