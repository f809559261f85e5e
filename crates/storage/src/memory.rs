//! In-memory store

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::{KeyValueStore, StorageError};

/// Process-local store; contents are lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("Creating in-memory store");
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
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
        debug!("Stored key {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}
