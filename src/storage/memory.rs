//! storage::memory
//!
//! In-memory storage for deterministic testing and embedding.
//!
//! # Design
//!
//! `MemoryStorage` implements the [`Storage`] trait over a shared in-memory
//! map. It is cloneable (clones share state), records every operation for
//! test verification, and can be configured to fail on `get` or `put` to
//! exercise error paths.
//!
//! # Example
//!
//! ```
//! use credence::storage::{MemoryStorage, Storage};
//!
//! # tokio_test::block_on(async {
//! let storage = MemoryStorage::new();
//! storage.put("belief/b1/deps", b"{}".to_vec()).await.unwrap();
//!
//! let clone = storage.clone();
//! assert!(clone.get("belief/b1/deps").await.unwrap().is_some());
//! assert_eq!(storage.operation_count(), 2);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Storage, StorageError};

/// In-memory storage for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Debug, Default)]
struct MemoryStorageInner {
    /// Stored values by key.
    values: HashMap<String, Vec<u8>>,
    /// Recorded operations for verification.
    operations: Vec<MemoryOperation>,
    /// Error to inject (for testing error paths).
    fail_on: Option<FailOn>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every `get` with the given error.
    Get(StorageError),
    /// Fail every `put` with the given error.
    Put(StorageError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOperation {
    Get { key: String },
    Put { key: String },
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure an injected failure.
    pub fn fail_on(&self, fail: FailOn) {
        self.inner.lock().expect("storage lock").fail_on = Some(fail);
    }

    /// Clear any injected failure.
    pub fn clear_failure(&self) {
        self.inner.lock().expect("storage lock").fail_on = None;
    }

    /// Number of operations performed so far.
    pub fn operation_count(&self) -> usize {
        self.inner.lock().expect("storage lock").operations.len()
    }

    /// Snapshot of recorded operations.
    pub fn operations(&self) -> Vec<MemoryOperation> {
        self.inner.lock().expect("storage lock").operations.clone()
    }

    /// All keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .lock()
            .expect("storage lock")
            .values
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut inner = self.inner.lock().expect("storage lock");
        inner.operations.push(MemoryOperation::Get {
            key: key.to_string(),
        });
        if let Some(FailOn::Get(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        Ok(inner.values.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("storage lock");
        inner.operations.push(MemoryOperation::Put {
            key: key.to_string(),
        });
        if let Some(FailOn::Put(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        inner.values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_returns_none() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let storage = MemoryStorage::new();
        storage.put("k", vec![1, 2, 3]).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn put_replaces_existing() {
        let storage = MemoryStorage::new();
        storage.put("k", vec![1]).await.unwrap();
        storage.put("k", vec![2]).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.put("k", vec![9]).await.unwrap();
        assert_eq!(clone.get("k").await.unwrap(), Some(vec![9]));
    }

    #[tokio::test]
    async fn operations_are_recorded() {
        let storage = MemoryStorage::new();
        storage.put("a", vec![]).await.unwrap();
        storage.get("a").await.unwrap();
        assert_eq!(
            storage.operations(),
            vec![
                MemoryOperation::Put {
                    key: "a".to_string()
                },
                MemoryOperation::Get {
                    key: "a".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn injected_get_failure() {
        let storage = MemoryStorage::new();
        storage.put("k", vec![1]).await.unwrap();
        storage.fail_on(FailOn::Get(StorageError::Io("disk gone".into())));
        assert!(storage.get("k").await.is_err());
        storage.clear_failure();
        assert!(storage.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn injected_put_failure_writes_nothing() {
        let storage = MemoryStorage::new();
        storage.fail_on(FailOn::Put(StorageError::Io("disk full".into())));
        assert!(storage.put("k", vec![1]).await.is_err());
        storage.clear_failure();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_sorted() {
        let storage = MemoryStorage::new();
        storage.put("b", vec![]).await.unwrap();
        storage.put("a", vec![]).await.unwrap();
        assert_eq!(storage.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
