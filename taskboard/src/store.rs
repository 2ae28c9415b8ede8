//! Key-value persistence for the board.
//!
//! The engine stores the whole board under a single key and writes it
//! through after every transition. [`KeyValueStore`] is the seam; this
//! module provides an in-memory store for tests and embedding, and a
//! directory-backed [`FileStore`] for the command-line app.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Key the board is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "taskboard";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read operation failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Byte storage addressed by string keys.
pub trait KeyValueStore: Send + Sync {
    /// Returns the bytes stored under `key`, or `None` if nothing is.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadFailed`] if the backing storage fails.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces whatever is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteFailed`] if the backing storage fails.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, bytes)
    }
}

/// In-memory implementation of [`KeyValueStore`].
///
/// Nothing survives the process. Wrap it in an [`Arc`] to inspect what an
/// engine wrote.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one entry.
    #[must_use]
    pub fn with_entry(key: &str, bytes: Vec<u8>) -> Self {
        let store = Self::new();
        store.entries.lock().insert(key.to_string(), bytes);
        store
    }

    /// Returns a copy of the bytes under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a crash mid-write leaves the previous board intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the store's files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        valid.then(|| self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| StoreError::ReadFailed(format!("invalid key: {key:?}")))?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailed(format!("{}: {e}", path.display()))),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| StoreError::WriteFailed(format!("invalid key: {key:?}")))?;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", self.dir.display())))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", path.display())))
    }
}
