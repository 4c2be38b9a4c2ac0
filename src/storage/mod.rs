use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod common;
pub mod file_storage;
pub mod in_memory;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Key-value store holding one opaque state blob per project key.
///
/// Operations on a single key are atomic. The store offers no conditional
/// writes; lock gating is done by the caller.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Short backend name used in metrics labels.
    fn backend_name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Store `data` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError>;

    /// Remove the blob under `key`. Returns whether a blob was present.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}
