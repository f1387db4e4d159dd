//! Durable key-value storage behind the session.
//!
//! Only [`crate::session`] talks to this module. Multi-key writes and
//! removals are atomic as a group so the token and the user record never
//! drift apart on disk.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub trait Storage: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write every entry or none of them.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove every key or none of them. Missing keys are not an error.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// A JSON object on disk. Every write replaces the whole file through a
/// temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Wrote {} storage entries to {}", map.len(), self.path.display());
        Ok(())
    }

    fn edit<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // A corrupt file is replaced rather than blocking every future login.
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Corrupt(e)) => {
                warn!("Discarding corrupt storage file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        f(&mut map);
        self.write_map(&map)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        self.edit(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.edit(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// Process-local storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_reads_missing_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));
        assert_eq!(storage.get("authToken").unwrap(), None);
    }

    #[test]
    fn file_storage_writes_and_removes_entries_together() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("session.json"));

        storage
            .set_all(&[("authToken", "tok"), ("userData", "{}")])
            .unwrap();
        assert_eq!(storage.get("authToken").unwrap().as_deref(), Some("tok"));
        assert_eq!(storage.get("userData").unwrap().as_deref(), Some("{}"));

        storage.remove_all(&["authToken", "userData"]).unwrap();
        assert_eq!(storage.get("authToken").unwrap(), None);
        assert_eq!(storage.get("userData").unwrap(), None);
    }

    #[test]
    fn file_storage_reports_corrupt_file_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get("authToken"), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn file_storage_overwrites_corrupt_file_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{{{{").unwrap();

        let storage = FileStorage::new(&path);
        storage.set_all(&[("authToken", "fresh")]).unwrap();
        assert_eq!(storage.get("authToken").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn memory_storage_remove_of_missing_key_is_ok() {
        let storage = MemoryStorage::new();
        storage.remove_all(&["nothing"]).unwrap();
        assert!(storage.is_empty());
    }
}
