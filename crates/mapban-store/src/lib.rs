//! Durable snapshots of the mapban session registry.
//!
//! The registry lives in memory. On graceful shutdown the server writes
//! it out with [`SnapshotStore::save`]; on startup it reads it back with
//! [`SnapshotStore::restore`].
//!
//! ```text
//! SessionRegistry ──snapshot()──→ bytes ──SnapshotStorage::write──→ disk
//! SessionRegistry ←──restore()─── bytes ←──SnapshotStorage::read──── disk
//! ```
//!
//! A missing snapshot is a fresh start. A present but unreadable one is
//! an error the caller must not paper over.

mod error;
mod snapshot;
mod storage;

pub use error::StoreError;
pub use snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotStore};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};
