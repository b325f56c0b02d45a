//! Persistent key/value storage for the FoodNova client
//!
//! Everything the client keeps between runs (the credential pair and the
//! cart) goes through a [`StorageBackend`]. Backends are deliberately small:
//! string keys, string values, `get`/`set`/`remove`. Callers never reach into
//! ambient global storage, so tests swap in [`MemoryStorage`] and native
//! applications use [`FileStorage`].
//!
//! Several processes sharing one [`FileStorage`] path behave like several
//! browser tabs sharing `localStorage`: last write wins and there is no
//! change notification between them.

mod file;
mod memory;

use std::sync::Arc;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error type
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A synchronous string key/value store.
///
/// Reads and writes run to completion without suspending, which is what lets
/// the cart hydrate before anything else observes it.
pub trait StorageBackend: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Application namespace applied to every key, so that the client's entries
/// do not collide with anything else living in the same storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(prefix: &str) -> Self {
        Self(prefix.to_string())
    }

    /// Builds the fully qualified key, e.g. `foodnova:access_token`.
    pub fn key(&self, name: &str) -> String {
        format!("{}:{}", self.0, name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new("foodnova")
    }
}

/// A backend bound to a namespace. Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    namespace: Namespace,
}

impl Storage {
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: Namespace) -> Self {
        Self { backend, namespace }
    }

    /// In-memory storage under the default namespace
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Namespace::default())
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn get(&self, name: &str) -> Result<Option<String>> {
        self.backend.get(&self.namespace.key(name))
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        self.backend.set(&self.namespace.key(name), value)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.backend.remove(&self.namespace.key(name))
    }

    /// Reads and decodes a JSON value. Absent keys yield `Ok(None)`.
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(name, &raw)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_keys() {
        let backend = Arc::new(MemoryStorage::new());
        let storage = Storage::new(backend.clone(), Namespace::new("shop"));

        storage.set("cart", "[]").unwrap();

        assert_eq!(backend.get("shop:cart").unwrap(), Some("[]".to_string()));
        assert_eq!(backend.get("cart").unwrap(), None);
    }

    #[test]
    fn test_json_helpers() {
        let storage = Storage::in_memory();

        assert_eq!(storage.get_json::<Vec<u32>>("numbers").unwrap(), None);

        storage.set_json("numbers", &vec![1u32, 2, 3]).unwrap();
        assert_eq!(
            storage.get_json::<Vec<u32>>("numbers").unwrap(),
            Some(vec![1, 2, 3])
        );

        storage.set("numbers", "not json").unwrap();
        assert!(matches!(
            storage.get_json::<Vec<u32>>("numbers"),
            Err(StorageError::Serialization(_))
        ));
    }
}
