//! Where snapshot bytes live.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::StoreError;

/// A place to keep one snapshot blob.
pub trait SnapshotStorage: Send + Sync {
    /// Returns the stored bytes, or `None` if nothing was ever written.
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the stored bytes.
    ///
    /// Must be all-or-nothing: a failure part way leaves the previous
    /// snapshot readable.
    fn write(&self, bytes: &[u8]) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// A snapshot file on local disk.
///
/// Writes go to `<path>.tmp`, are fsynced, then renamed over `<path>`, and
/// the parent directory is fsynced so the rename survives a crash. The
/// file holds live tokens, so on Unix it is created owner-only (0600).
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(dir) = self.parent() {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.tmp_path();
        {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);

            let mut file = options.open(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        fs::rename(&tmp, &self.path)?;

        #[cfg(unix)]
        if let Some(dir) = self.parent() {
            File::open(dir)?.sync_all()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Keeps the snapshot in memory. For tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `bytes`, as if a previous run had written them.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        *self.bytes.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));

        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn test_file_storage_write_replaces_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state.json"));

        storage.write(b"first").unwrap();
        storage.write(b"second").unwrap();

        assert_eq!(storage.read().unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/deeper/state.json"));

        storage.write(b"{}").unwrap();

        assert!(storage.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state.json"));
        storage.write(b"{}").unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_storage_stale_tmp_does_not_affect_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state.json"));
        storage.write(b"committed").unwrap();

        // A crash after writing the temp file but before the rename.
        fs::write(dir.path().join("state.json.tmp"), b"half-writ").unwrap();

        assert_eq!(storage.read().unwrap().as_deref(), Some(&b"committed"[..]));
    }

    #[test]
    fn test_memory_storage_round_trips_bytes() {
        let storage = MemoryStorage::new();
        assert!(storage.read().unwrap().is_none());

        storage.write(b"abc").unwrap();

        assert_eq!(storage.read().unwrap(), Some(b"abc".to_vec()));
    }
}
