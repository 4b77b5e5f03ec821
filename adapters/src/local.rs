//! Persistent local key-value store adapter.
//!
//! A string map with no expiry metadata, the equivalent of a browser's local
//! storage. When backed by a file the whole map is written through as a JSON
//! object on every mutation.

use crate::errors::StoreError;
use crate::models::Slot;
use crate::SessionStore;
use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const TOKEN_KEY: &str = "authToken";
pub const SESSION_KEY: &str = "user";

#[derive(Debug, Default)]
pub struct LocalStore {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the backing file. A file that is not a JSON string map is
    /// treated as empty and replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("ignoring unreadable local store {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn key(slot: Slot) -> &'static str {
        match slot {
            Slot::Token => TOKEN_KEY,
            Slot::Session => SESSION_KEY,
        }
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, content).map_err(|e| StoreError::io(path, e))
    }
}

impl SessionStore for LocalStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn read(&self, slot: Slot) -> Result<Option<String>, StoreError> {
        Ok(self.get(Self::key(slot)).map(str::to_string))
    }

    fn write(&mut self, slot: Slot, value: &str) -> Result<(), StoreError> {
        self.set(Self::key(slot), value)
    }

    fn remove(&mut self, slot: Slot) -> Result<(), StoreError> {
        self.delete(Self::key(slot))
    }
}
