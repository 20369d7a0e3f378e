//! Guarded access to the record store
//!
//! The `Store` pairs a [`RecordStore`] with the reader/writer lock of its
//! backing file and hands out the collection repositories.
//!
//! ## Locking
//!
//! There is exactly one lock per backing file in the process. Every handle
//! opened on the same path shares it, so two repositories created from
//! independent `Store::open_path` calls still serialize against each other.
//!
//! - Writes hold the lock exclusively across load, mutate and replace.
//! - Reads hold it shared for the load only and work on an owned copy.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open(&config)?;
//!
//! let user = store.users().create("a@x.com", hash)?;
//! let post = store.posts().create(NewPost::new(user.id, "hello"))?;
//! let posts = store.posts().list(PostFilter::all(), SortOrder::Descending)?;
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::collections::{CollectionSet, CollectionStats};
use crate::config::Config;
use crate::error::Result;
use crate::repository::{PostRepository, RefreshTokenRepository, UserRepository};
use crate::storage::{RecordStore, StorageError};

type FileLock = Arc<RwLock<()>>;

/// Lock of the backing file at `key`, created on first use
fn file_lock(key: &Path) -> FileLock {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, FileLock>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(key.to_path_buf()).or_default().clone()
}

/// Canonical form of `path` used to look up its lock
///
/// The parent directory is created and canonicalized so that different
/// spellings of the same file share one lock.
fn lock_key(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    })?;
    let dir =
        fs::canonicalize(parent).map_err(|e| StorageError::from_read(e, parent.to_path_buf()))?;

    Ok(match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    })
}

/// Handle to the record store and its lock
///
/// Cheap to clone; clones share the same lock.
#[derive(Debug, Clone)]
pub struct Store {
    records: RecordStore,
    lock: FileLock,
}

impl Store {
    /// Open the store configured by `config`, creating it if missing
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_path(config.store_path())
    }

    /// Open the store backed by the file at `path`, creating it if missing
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let key = lock_key(&path)?;

        let store = Self {
            records: RecordStore::new(path),
            lock: file_lock(&key),
        };

        {
            let _guard = store.lock.write().unwrap_or_else(PoisonError::into_inner);
            store.records.initialize()?;
        }

        debug!("Opened store at {:?}", key);
        Ok(store)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.records.path()
    }

    /// Repository for posts
    pub fn posts(&self) -> PostRepository {
        PostRepository::new(self.clone())
    }

    /// Repository for users and their credentials
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.clone())
    }

    /// Repository for refresh tokens
    pub fn refresh_tokens(&self) -> RefreshTokenRepository {
        RefreshTokenRepository::new(self.clone())
    }

    /// Record counts per collection
    pub fn stats(&self) -> Result<CollectionStats> {
        self.read(|set| Ok(set.stats()))
    }

    /// Owned copy of the whole collection set
    pub fn snapshot(&self) -> Result<CollectionSet> {
        self.read(|set| Ok(set.clone()))
    }

    /// Run `f` against a freshly loaded copy of the collection set
    ///
    /// The shared lock is held for the load only. A missing backing file
    /// reads as an empty set.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&CollectionSet) -> Result<T>) -> Result<T> {
        let set = {
            let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
            match self.records.load() {
                Ok(set) => set,
                Err(StorageError::NotFound { .. }) => CollectionSet::new(),
                Err(e) => return Err(e.into()),
            }
        };
        f(&set)
    }

    /// Run a load-mutate-replace cycle under the exclusive lock
    ///
    /// If `f` fails nothing is written and the persisted state is untouched.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut CollectionSet) -> Result<T>) -> Result<T> {
        // The file is only ever replaced atomically, so a panic in another
        // critical section cannot have left it half written.
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        self.records.initialize()?;
        let mut set = self.records.load()?;
        let value = f(&mut set)?;
        self.records.replace(&set)?;
        Ok(value)
    }
}
