//! Snapshotting the registry on shutdown and restoring it at startup.
//!
//! The snapshot is one JSON document:
//!
//! ```text
//! { "version": 1,
//!   "catalog": ["Bank", "Border", ...],
//!   "sessions": [ { "hostToken": ..., "currentPhase": 3, ... }, ... ] }
//! ```
//!
//! Sessions are written in Host-token order and the catalog is sorted, so
//! the same registry always produces the same bytes.

use std::sync::Arc;

use mapban_protocol::{Codec, JsonCodec};
use mapban_session::{MapCatalog, Session, SessionRegistry};
use serde::{Deserialize, Serialize};

use crate::{SnapshotStorage, StoreError};

/// Format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub catalog: MapCatalog,
    pub sessions: Vec<Session>,
}

/// Saves and restores the registry through a [`SnapshotStorage`].
///
/// Only snapshot a registry nothing else is mutating: each session is
/// copied under its own lock, so a snapshot taken mid-traffic is
/// consistent per session but not as a whole.
#[derive(Debug)]
pub struct SnapshotStore<S> {
    storage: Arc<S>,
    codec: JsonCodec,
}

impl<S: SnapshotStorage + 'static> SnapshotStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
            codec: JsonCodec,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Serializes every live session plus the catalog.
    pub async fn snapshot(
        &self,
        registry: &SessionRegistry,
        catalog: &MapCatalog,
    ) -> Result<Vec<u8>, StoreError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            catalog: catalog.clone(),
            sessions: registry.sessions().await,
        };
        self.codec.encode(&snapshot).map_err(StoreError::Encode)
    }

    /// Snapshots and writes in one step. Returns how many sessions were
    /// saved.
    ///
    /// The write runs on Tokio's blocking pool.
    pub async fn save(
        &self,
        registry: &SessionRegistry,
        catalog: &MapCatalog,
    ) -> Result<usize, StoreError> {
        let bytes = self.snapshot(registry, catalog).await?;
        let sessions = registry.len().await;
        let len = bytes.len();

        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || storage.write(&bytes)).await??;
        tracing::info!(sessions, bytes = len, "snapshot written");
        Ok(sessions)
    }

    /// Loads the last snapshot.
    ///
    /// With nothing stored, returns an empty registry and the default
    /// catalog. Anything stored that can't be fully trusted is an error.
    pub fn restore(&self) -> Result<(SessionRegistry, MapCatalog), StoreError> {
        let Some(bytes) = self.storage.read()? else {
            tracing::info!("no snapshot found, starting with an empty registry");
            return Ok((SessionRegistry::new(), MapCatalog::default()));
        };

        let snapshot: Snapshot =
            self.codec.decode(&bytes).map_err(StoreError::Corrupt)?;
        let (registry, catalog) = rebuild(snapshot)?;
        Ok((registry, catalog))
    }
}

fn rebuild(
    snapshot: Snapshot,
) -> Result<(SessionRegistry, MapCatalog), StoreError> {
    let Snapshot {
        version,
        catalog,
        sessions,
    } = snapshot;

    if version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }
    if catalog.is_empty() {
        return Err(StoreError::Invalid("catalog is empty".into()));
    }
    for session in &sessions {
        if let Some(map) = session.map_pool().iter().find(|m| !catalog.contains(m)) {
            return Err(StoreError::Invalid(format!(
                "session {} uses {map}, which is not in the catalog",
                session.host_token().fingerprint()
            )));
        }
    }

    let count = sessions.len();
    let registry = SessionRegistry::from_sessions(sessions)?;
    tracing::info!(sessions = count, maps = catalog.len(), "snapshot restored");
    Ok((registry, catalog))
}
