use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// Key-value store persisted as a single JSON object on disk.
///
/// The whole map is loaded on open and rewritten on every mutation through a
/// temporary file and rename, so a crash never leaves a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty one if the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened json store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    // Writes go to disk before they become visible, so a failed persist
    // leaves the map as it was.
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        let mut next = map.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *map = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        if !map.contains_key(key) {
            return Ok(false);
        }
        let mut next = map.clone();
        next.remove(key);
        self.persist(&next)?;
        *map = next;
        Ok(true)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("env", "development").unwrap();
            store.set("development_max_res", "3").unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("env").unwrap().as_deref(), Some("development"));
        assert_eq!(store.keys().unwrap().len(), 2);
    }

    #[test]
    fn remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/storage.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        assert!(store.remove("a").unwrap());
        drop(store);
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn failed_write_leaves_entries_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("a", "1").unwrap();

        // A directory where the temp file goes makes every write fail.
        fs::create_dir(dir.path().join("storage.json.tmp")).unwrap();
        assert!(store.set("a", "2").is_err());
        assert!(store.set("b", "3").is_err());
        assert!(store.remove("a").is_err());

        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.get("b").unwrap().is_none());
        assert_eq!(store.keys().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1,2,3]").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn empty_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
