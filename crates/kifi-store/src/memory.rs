use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::error::StoreResult;
use crate::traits::KeyValueStore;

/// In-memory key-value store.
///
/// Intended for tests and embedding. Counts every successful `set` and
/// `remove` so callers can assert that redundant writes were skipped.
pub struct InMemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
    writes: AtomicU64,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Seed a store with initial contents without counting writes.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(map),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of mutating operations performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Copy of the full contents.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().expect("lock poisoned").clone()
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        let existed = map.remove(key).is_some();
        if existed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(existed)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyValueStore")
            .field("entries", &self.len())
            .field("writes", &self.write_count())
            .finish()
    }
}
