//! The key-value storage collaborator and two implementations.
//!
//! Values are JSON. A browser host backs this with extension storage; the
//! crate ships an in-memory store for tests and a single-file JSON store
//! for the command line.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::StorageError;

/// Persisted keys.
pub mod keys {
    pub const NOTES: &str = "dbnotes";
    pub const BIN_NOTES: &str = "binNotes";
    pub const QUICK_LINKS: &str = "quicklinks";
    pub const QUICK_LINKS_ORDER: &str = "quicklinksorder";
    pub const PINNED_NOTE_IDS: &str = "pinnedNoteIds";
    pub const LAST_ACTIVE_NOTE_ID: &str = "lastActiveNoteId";
    pub const THEME: &str = "theme";
    pub const SPELLCHECK: &str = "spellcheck";
    pub const SIDEBAR: &str = "sidebar";
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StorageError>>;

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StorageError>>;

    /// Write several keys. Stores that can do this in one write should.
    fn set_many(
        &self,
        entries: Vec<(&'static str, Value)>,
    ) -> impl Future<Output = Result<(), StorageError>> {
        async move {
            for (key, value) in entries {
                self.set(key, value).await?;
            }
            Ok(())
        }
    }
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, Value>,
    writes: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write.
    pub fn with_value(self, key: &str, value: Value) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.values.insert(key.to_string(), value);
        }
        self
    }

    /// Current value of `key`.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.inner.lock().ok()?.values.get(key).cloned()
    }

    /// Keys written so far, in order, one entry per write.
    pub fn writes(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.writes.clone())
            .unwrap_or_default()
    }

    pub fn clear_writes(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.writes.clear();
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StorageError>> {
        let result = self
            .inner
            .lock()
            .map(|inner| inner.values.get(key).cloned())
            .map_err(|_| StorageError::LockPoisoned);
        async move { result }
    }

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StorageError>> {
        let result = self
            .inner
            .lock()
            .map(|mut inner| {
                inner.values.insert(key.to_string(), value);
                inner.writes.push(key.to_string());
            })
            .map_err(|_| StorageError::LockPoisoned);
        async move { result }
    }
}

/// All keys in one JSON object file.
///
/// Every write rewrites the file. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<Map<String, Value>, StorageError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_map(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(map).map_err(|source| StorageError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;
        tokio::fs::write(&self.path, text).await.map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), keys = map.len(), "storage file written");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StorageError>> {
        let key = key.to_string();
        async move {
            let _guard = self.lock.lock().await;
            Ok(self.read_map().await?.remove(&key))
        }
    }

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StorageError>> {
        let key = key.to_string();
        async move {
            let _guard = self.lock.lock().await;
            let mut map = self.read_map().await?;
            map.insert(key, value);
            self.write_map(&map).await
        }
    }

    fn set_many(
        &self,
        entries: Vec<(&'static str, Value)>,
    ) -> impl Future<Output = Result<(), StorageError>> {
        async move {
            let _guard = self.lock.lock().await;
            let mut map = self.read_map().await?;
            for (key, value) in entries {
                map.insert(key.to_string(), value);
            }
            self.write_map(&map).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(keys::NOTES).await.unwrap(), None);
        store.set(keys::NOTES, json!([])).await.unwrap();
        assert_eq!(store.get(keys::NOTES).await.unwrap(), Some(json!([])));
        assert_eq!(store.writes(), vec![keys::NOTES.to_string()]);

        let shared = store.clone();
        shared.set(keys::THEME, json!("dark")).await.unwrap();
        assert_eq!(store.peek(keys::THEME), Some(json!("dark")));
    }

    #[tokio::test]
    async fn test_json_file_store_persists_between_instances() {
        let path = std::env::temp_dir().join(format!(
            "placenoter-store-{}/storage.json",
            uuid::Uuid::new_v4()
        ));
        let store = JsonFileStore::new(&path);
        assert_eq!(store.get(keys::NOTES).await.unwrap(), None);
        store
            .set_many(vec![
                (keys::NOTES, json!([{"id": "a"}])),
                (keys::SPELLCHECK, json!(false)),
            ])
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get(keys::SPELLCHECK).await.unwrap(),
            Some(json!(false))
        );
        assert_eq!(
            reopened.get(keys::NOTES).await.unwrap(),
            Some(json!([{"id": "a"}]))
        );
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
