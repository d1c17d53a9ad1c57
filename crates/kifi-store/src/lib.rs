//! Persistent string storage for the extension background.
//!
//! The host browser offers a flat `localStorage`-style map of string keys to
//! string values. [`KeyValueStore`] abstracts over it so configuration code
//! can run against an in-memory map in tests, or a JSON file on disk when the
//! background runs outside a browser.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::InMemoryKeyValueStore;
pub use traits::KeyValueStore;
