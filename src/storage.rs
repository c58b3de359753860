//! Local key/value storage.
//!
//! `FileStorage` survives restarts and plays the role of the persistent
//! profile. `MemoryStorage` lives only as long as the process and backs the
//! unlock session.

use crate::error::Result;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub const STORAGE_FILE: &str = "storage.json";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entries = read_entries(&path);
        debug!(path = %path.display(), keys = entries.len(), "opened local storage");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if self.path.exists() {
                    fs::remove_file(&self.path)?;
                    fs::rename(&tmp_path, &self.path)?;
                    Ok(())
                } else {
                    Err(rename_err.into())
                }
            }
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

fn read_entries(path: &Path) -> BTreeMap<String, String> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read local storage, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "local storage is corrupt, starting empty");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStorage, MemoryStorage, Storage, STORAGE_FILE};
    use std::fs;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::default();
        assert!(storage.get("k").is_none());

        storage.set("k", "v").expect("memory set should succeed");
        assert_eq!(storage.get("k").as_deref(), Some("v"));

        storage.remove("k").expect("memory remove should succeed");
        assert!(storage.get("k").is_none());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(STORAGE_FILE);

        let storage = FileStorage::open(&path).expect("storage should open");
        storage.set("device", "device_1_abc").expect("set should persist");
        drop(storage);

        let reopened = FileStorage::open(&path).expect("storage should reopen");
        assert_eq!(reopened.get("device").as_deref(), Some("device_1_abc"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_storage_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("profile").join(STORAGE_FILE);

        let storage = FileStorage::open(&path).expect("storage should open");
        storage.set("a", "b").expect("set should persist");
        assert!(path.exists());
    }

    #[test]
    fn file_storage_treats_corrupt_file_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(STORAGE_FILE);
        fs::write(&path, b"{ not json").expect("fixture should write");

        let storage = FileStorage::open(&path).expect("corrupt storage should still open");
        assert!(storage.get("anything").is_none());

        storage.set("k", "v").expect("set should overwrite corrupt file");
        let reopened = FileStorage::open(&path).expect("storage should reopen");
        assert_eq!(reopened.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn file_storage_remove_persists() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(STORAGE_FILE);

        let storage = FileStorage::open(&path).expect("storage should open");
        storage.set("k", "v").expect("set should persist");
        storage.remove("k").expect("remove should persist");

        let reopened = FileStorage::open(&path).expect("storage should reopen");
        assert!(reopened.get("k").is_none());
    }
}
