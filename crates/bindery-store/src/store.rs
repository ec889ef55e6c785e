//! Named collections, optionally backed by a data directory.
//!
//! ```text
//! <dir>/<name>.bson   (one file per collection, see `persist`)
//!     ↕  open / save
//! DocumentStore { name → Collection }
//! ```

use crate::collection::Collection;
use crate::error::StoreError;
use crate::persist::{read_documents_from_path, write_documents_to_path};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const COLLECTION_EXTENSION: &str = "bson";
pub const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    dir: Option<PathBuf>,
    collections: BTreeMap<String, Collection>,
}

impl DocumentStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load every `*.bson` collection file under `dir`.
    ///
    /// A missing directory is an empty store; it is created on first save.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let mut store = Self {
            dir: Some(dir.clone()),
            collections: BTreeMap::new(),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(err) => return Err(StoreError::io(dir.display(), err)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(dir.display(), e))?.path();
            if path.extension().is_some_and(|ext| ext == COLLECTION_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let collection = store.collection_mut(name);
            for doc in read_documents_from_path(&path)? {
                collection.insert(doc).map_err(|err| StoreError::Corrupt {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })?;
            }
            debug!(collection = name, documents = collection.len(), "loaded collection");
        }
        Ok(store)
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// The named collection, created empty when absent.
    pub fn collection_mut(&mut self, name: &str) -> &mut Collection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Path of a collection file, when the store has a directory.
    pub fn collection_path(&self, name: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{name}.{COLLECTION_EXTENSION}")))
    }

    /// Persist every collection. No-op for in-memory stores.
    pub fn save(&self) -> Result<(), StoreError> {
        for name in self.collections.keys() {
            self.save_collection(name)?;
        }
        Ok(())
    }

    /// Persist one collection. No-op for in-memory stores.
    pub fn save_collection(&self, name: &str) -> Result<(), StoreError> {
        let (Some(path), Some(collection)) = (self.collection_path(name), self.collection(name))
        else {
            return Ok(());
        };
        write_documents_to_path(&path, collection.iter())?;
        debug!(collection = name, documents = collection.len(), path = %path.display(), "saved collection");
        Ok(())
    }
}

/// Run one mutation against the store under `dir` while holding its lock.
///
/// The mutator returns `(value, changed)`; `changed = true` saves the store
/// before the lock is released.
pub fn mutate_store<T, F>(dir: impl AsRef<Path>, mutator: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut DocumentStore) -> Result<(T, bool), StoreError>,
{
    let dir = dir.as_ref();
    let _lock = StoreLock::acquire(dir)?;

    let mut store = DocumentStore::open(dir)?;
    let (value, changed) = mutator(&mut store)?;
    if changed {
        store.save()?;
    }
    Ok(value)
}

/// Exclusive hold on a data directory, released on drop.
///
/// Held by every writer that loads the store, edits it, and saves it back,
/// so two processes never save over each other's collections.
#[derive(Debug)]
pub struct StoreLock {
    lock_path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// Take the lock under `dir`, creating the directory if needed.
    pub fn acquire(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir.display(), e))?;
        let lock_path = dir.join(LOCK_FILE);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(StoreError::io(lock_path.display(), err)),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
