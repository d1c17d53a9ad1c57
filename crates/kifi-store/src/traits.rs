use crate::error::StoreResult;

/// Flat string-to-string persistent map.
///
/// Implementations must make a `set` visible to every later `get` on the same
/// store, and must never interpret the values they hold.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Returns `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key. Returns `true` if it existed.
    fn remove(&self, key: &str) -> StoreResult<bool>;

    /// All keys currently present, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
