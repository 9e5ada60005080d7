use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::PersistenceError;

/// String key-value storage shared by everything persisted in a process.
///
/// Methods take `&self` so one store can be handed to several owners through
/// an `Rc`. Implementations decide how durable a write is; callers only learn
/// whether it failed.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Read and decode a JSON value. Missing or unparseable data reads as `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable stored value");
            None
        }
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string(value).map_err(|source| PersistenceError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &json)
}

/// In-memory store. Used for tab-scoped data (it dies with the process) and
/// in tests. An optional byte quota mimics browser storage limits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: RefCell::default(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if let Some(quota) = self.quota {
            let available = quota.saturating_sub(self.used_bytes_without(key));
            let needed = key.len() + value.len();
            if needed > available {
                return Err(PersistenceError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Durable store: one file per key under a base directory, written atomically
/// through a temp file and rename.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn with_base_dir(base_dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(sanitize_key(key))
    }

    fn io_error(key: &str, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.file_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("tmp");

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Self::io_error(key, e)
        })
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.file_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let (_dir, store) = make_test_store();
        assert_eq!(store.get("tapvocab_coins"), None);
        store.set("tapvocab_coins", "12").unwrap();
        assert_eq!(store.get("tapvocab_coins").as_deref(), Some("12"));
        store.remove("tapvocab_coins").unwrap();
        assert_eq!(store.get("tapvocab_coins"), None);
        // Removing twice is fine.
        store.remove("tapvocab_coins").unwrap();
    }

    #[test]
    fn test_file_store_leaves_no_tmp_files() {
        let (dir, store) = make_test_store();
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
        assert_eq!(store.get("a").as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileStore {
            base_dir: dir.path().join("gone"),
        };
        assert!(matches!(
            store.set("k", "v"),
            Err(PersistenceError::Io { .. })
        ));
    }

    #[test]
    fn test_sanitize_key_keeps_keys_inside_base_dir() {
        assert_eq!(sanitize_key("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        // Overwriting the same key only counts the new value.
        store.set("k", "123456789").unwrap();
        let err = store.set("other", "1234").unwrap_err();
        assert!(matches!(err, PersistenceError::QuotaExceeded { .. }));
        assert_eq!(store.get("other"), None);
    }

    #[test]
    fn test_load_json_ignores_garbage() {
        let store = MemoryStore::new();
        store.set("list", "not json").unwrap();
        let value: Option<Vec<u32>> = load_json(&store, "list");
        assert!(value.is_none());
        save_json(&store, "list", &vec![1u32, 2]).unwrap();
        assert_eq!(load_json::<Vec<u32>>(&store, "list"), Some(vec![1, 2]));
    }
}
