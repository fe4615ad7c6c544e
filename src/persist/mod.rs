//! Key-value persistence for rehydrating whitelisted slices
//!
//! Each slice is stored under `<key_prefix>.<slice>` as a JSON value. The
//! engine loads them once at start (`rehydrate`) and saves a slice after any
//! action that changed it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{Result, SyncError};

/// Persisted slice names
pub const SESSION_SLICE: &str = "session";
pub const OFFLINE_SLICE: &str = "offline";
pub const CART_SLICE: &str = "cart";

pub fn slice_key(prefix: &str, slice: &str) -> String {
    format!("{}.{}", prefix, slice)
}

/// Storage backend for persisted slices
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned<E>(_: E) -> SyncError {
    SyncError::Persistence("memory store lock poisoned".into())
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
///
/// Writes go to a staging file first and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let staged = self.dir.join(format!(".{}.json.tmp", key));

        fs::write(&staged, serde_json::to_vec(value)?)?;
        fs::rename(&staged, &path)
            .map_err(|e| SyncError::Persistence(format!("failed to replace {}: {}", path.display(), e)))?;

        debug!(key = %key, path = %path.display(), "Persisted slice");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load("root.cart").unwrap().is_none());

        store.save("root.cart", &serde_json::json!({"items": []})).unwrap();
        assert_eq!(store.load("root.cart").unwrap(), Some(serde_json::json!({"items": []})));

        store.remove("root.cart").unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_file_store_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state"));

        store.save("root.session", &serde_json::json!({"n": 1})).unwrap();
        store.save("root.session", &serde_json::json!({"n": 2})).unwrap();

        assert_eq!(store.load("root.session").unwrap(), Some(serde_json::json!({"n": 2})));
        store.remove("root.session").unwrap();
        assert!(store.load("root.session").unwrap().is_none());
    }

    #[test]
    fn test_slice_key() {
        assert_eq!(slice_key("root", CART_SLICE), "root.cart");
    }
}
