//! JSON file store
//!
//! Keeps every key in a single JSON object on disk. The whole file is
//! rewritten on each change (write to a sibling temp file, then rename).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{KeyValueStore, StorageError};

pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing contents if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };

        info!("Opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!("Failed to replace {}: {}", self.path.display(), e);
            return Err(e.into());
        }
        debug!("Persisted {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("gaze-drive-store-{}-{}", std::process::id(), name))
            .join("state.json")
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = temp_path("reopen");
        let _ = fs::remove_file(&path);

        let store = JsonFileStore::open(&path).unwrap();
        store.set("accuracy", "84").unwrap();
        store.set("calibrated", "true").unwrap();
        drop(store);

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("accuracy").unwrap().as_deref(), Some("84"));

        store.remove("accuracy").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("accuracy").unwrap(), None);
        assert_eq!(store.get("calibrated").unwrap().as_deref(), Some("true"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StorageError::SerializationError(_))
        ));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
