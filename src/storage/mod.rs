//! storage
//!
//! Single async interface for all durable reads and writes.
//!
//! # Design
//!
//! The core is indifferent to the concrete store: file, database, or
//! network service. Everything below this seam is the embedder's choice;
//! everything above it sees only `get`/`put` over opaque byte values.
//! The trait is async because real backends involve I/O.
//!
//! The core performs no I/O retries itself. A backend that wants retry
//! behavior implements it below this interface.
//!
//! # Example
//!
//! ```
//! use credence::storage::{MemoryStorage, Storage};
//!
//! # tokio_test::block_on(async {
//! let storage = MemoryStorage::new();
//! storage.put("k", b"v".to_vec()).await.unwrap();
//! assert_eq!(storage.get("k").await.unwrap(), Some(b"v".to_vec()));
//! assert_eq!(storage.get("missing").await.unwrap(), None);
//! # });
//! ```

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStorage;

/// Errors from the storage backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backend failed to read or write.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored value could not be decoded.
    #[error("corrupt stored value at {key}: {reason}")]
    Corrupt {
        /// Storage key of the bad value
        key: String,
        /// What failed to decode
        reason: String,
    },
}

/// Durable key-value surface the core persists through.
///
/// Implementations must be safe to share across tasks (`Send + Sync`);
/// the core wraps them in `Arc<dyn Storage>` and calls them concurrently
/// for distinct beliefs.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the value at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write `value` at `key`, replacing any existing value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
}
