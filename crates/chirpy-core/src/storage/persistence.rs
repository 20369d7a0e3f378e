//! Record store persistence
//!
//! Handles saving and loading the [`CollectionSet`] to/from a single JSON
//! file. Uses atomic writes (write to temp file, then rename) so the file is
//! either the previous version or the new one, never a partial write.
//!
//! Storage location: `<data_dir>/database.json` (configurable via `Config`)
//!
//! The record store performs no locking. Callers serialize their own
//! load/replace sequences (see [`crate::store::Store`]).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::collections::CollectionSet;

/// File-backed record store
///
/// Provides all-or-nothing load and replace of the entire collection set.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Create a record store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the backing file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the backing file with an empty collection set if it is missing
    ///
    /// Safe to call before every operation; an existing file is left as is,
    /// even if its content is malformed.
    pub fn initialize(&self) -> StorageResult<()> {
        if self.exists() {
            return Ok(());
        }

        debug!("Initializing empty record store at {:?}", self.path);
        self.replace(&CollectionSet::new())
    }

    /// Decode the full persisted collection set
    ///
    /// Returns `StorageError::NotFound` if the file doesn't exist and
    /// `StorageError::CorruptStore` if it exists but can't be decoded.
    pub fn load(&self) -> StorageResult<CollectionSet> {
        let bytes = fs::read(&self.path).map_err(|e| StorageError::from_read(e, self.path.clone()))?;

        let set: CollectionSet = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Record store at {:?} could not be decoded: {}", self.path, e);
            StorageError::CorruptStore {
                path: self.path.clone(),
                details: e.to_string(),
            }
        })?;

        debug!(
            "Loaded record store from {:?} ({} bytes)",
            self.path,
            bytes.len()
        );
        Ok(set)
    }

    /// Serialize `set` and atomically overwrite the backing file
    pub fn replace(&self, set: &CollectionSet) -> StorageResult<()> {
        let bytes = serde_json::to_vec(set).map_err(|e| StorageError::Encode {
            path: self.path.clone(),
            details: e.to_string(),
        })?;

        atomic_write(&self.path, &bytes)?;

        debug!("Wrote record store to {:?} ({} bytes)", self.path, bytes.len());
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}

// One temp file per process
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> RecordStore {
        RecordStore::new(temp_dir.path().join("database.json"))
    }

    fn user(id: u64, email: &str) -> User {
        let now = Utc::now();
        User {
            id,
            email: email.to_string(),
            created_at: now,
            updated_at: now,
            is_promoted: false,
        }
    }

    #[test]
    fn test_initialize_creates_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        assert!(!store.exists());
        store.initialize().unwrap();
        assert!(store.exists());

        let set = store.load().unwrap();
        assert_eq!(set, CollectionSet::new());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let mut set = CollectionSet::new();
        set.users.insert(1, user(1, "a@x.com"));
        store.replace(&set).unwrap();

        // Existing data must survive a second initialize
        store.initialize().unwrap();
        assert_eq!(store.load().unwrap().users.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let err = store.load().unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_replace_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let mut set = CollectionSet::new();
        let id = set.next_user_id();
        set.users.insert(id, user(id, "a@x.com"));
        store.replace(&set).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, set);
        assert_eq!(loaded.users[&1].email, "a@x.com");
    }

    #[test]
    fn test_replace_overwrites_in_full() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let mut set = CollectionSet::new();
        set.users.insert(1, user(1, "a@x.com"));
        set.users.insert(2, user(2, "b@x.com"));
        store.replace(&set).unwrap();

        set.users.remove(&1);
        store.replace(&set).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.users.len(), 1);
        assert!(loaded.users.contains_key(&2));
        assert!(!temp_path_for(store.path()).exists());
    }

    #[test]
    fn test_malformed_content_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        fs::write(store.path(), b"{\"posts\": [not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.is_corrupt());

        // initialize must not paper over the corruption
        store.initialize().unwrap();
        assert!(store.load().unwrap_err().is_corrupt());
        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "{\"posts\": [not json");
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        fs::write(store.path(), b"").unwrap();

        assert!(store.load().unwrap_err().is_corrupt());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("database.json");

        atomic_write(&nested_path, b"{}").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_temp_path_sits_next_to_target() {
        let path = Path::new("/data/chirpy/database.json");
        assert_eq!(
            temp_path_for(path),
            PathBuf::from(format!(
                "/data/chirpy/database.json.{}.tmp",
                std::process::id()
            ))
        );
    }
}
