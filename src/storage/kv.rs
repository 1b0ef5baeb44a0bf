//! Key-value store backends
//!
//! All persistent state goes through [`KeyValueStore`]: string keys mapped to
//! JSON documents. `FileStore` keeps one `<key>.json` file per key in a
//! directory; `MemoryStore` keeps everything in a map and is used by tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{KesefError, KesefResult};

use super::file_io::{read_string, write_atomic};

/// Prefix for every key the application writes
pub const KEY_PREFIX: &str = "kesef_";

/// A synchronous string-to-string store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> KesefResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> KesefResult<()>;

    /// Remove a key, returning whether it existed
    fn remove(&self, key: &str) -> KesefResult<bool>;

    /// All keys currently stored, sorted
    fn keys(&self) -> KesefResult<Vec<String>>;

    fn contains(&self, key: &str) -> KesefResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> KesefResult<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| KesefError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KesefResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| KesefError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KesefResult<bool> {
        let mut data = self
            .data
            .write()
            .map_err(|e| KesefError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        Ok(data.remove(key).is_some())
    }

    fn keys(&self) -> KesefResult<Vec<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| KesefError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.keys().cloned().collect())
    }
}

/// Directory-backed store with one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> KesefResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            KesefError::Storage(format!("Failed to create store {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, key: &str) -> KesefResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(KesefError::Storage(format!("Invalid store key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> KesefResult<Option<String>> {
        read_string(self.path_for(key)?)
    }

    fn set(&self, key: &str, value: &str) -> KesefResult<()> {
        write_atomic(self.path_for(key)?, value.as_bytes())
    }

    fn remove(&self, key: &str) -> KesefResult<bool> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| {
            KesefError::Storage(format!("Failed to remove {}: {}", path.display(), e))
        })?;
        Ok(true)
    }

    fn keys(&self) -> KesefResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            KesefError::Storage(format!("Failed to list {}: {}", self.dir.display(), e))
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn KeyValueStore) {
        assert!(store.get("kesef_missing").unwrap().is_none());

        store.set("kesef_b", "[1]").unwrap();
        store.set("kesef_a", "{\"שם\":\"ערך\"}").unwrap();
        assert_eq!(store.get("kesef_a").unwrap().as_deref(), Some("{\"שם\":\"ערך\"}"));
        assert!(store.contains("kesef_b").unwrap());
        assert_eq!(store.keys().unwrap(), vec!["kesef_a", "kesef_b"]);

        store.set("kesef_b", "[2]").unwrap();
        assert_eq!(store.get("kesef_b").unwrap().as_deref(), Some("[2]"));

        assert!(store.remove("kesef_b").unwrap());
        assert!(!store.remove("kesef_b").unwrap());
        assert_eq!(store.keys().unwrap(), vec!["kesef_a"]);
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_file_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("store")).unwrap();
        exercise(&store);
        assert!(temp_dir.path().join("store").join("kesef_a.json").exists());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        FileStore::open(temp_dir.path()).unwrap().set("kesef_x", "42").unwrap();
        let reopened = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get("kesef_x").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.set("../escape", "x").is_err());
        assert!(store.set("", "x").is_err());
        assert!(store.get(".hidden").is_err());
    }
}
