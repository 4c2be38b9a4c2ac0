use crate::storage::common::{key_path, read_optional, remove_optional, write_atomic};
use crate::storage::{BlobStore, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem-backed blob store. The blob for key `alice/net.tfstate` lives
/// at `<root>/alice/net.tfstate`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Internal(format!("init root {:?}: {}", root, e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        key_path(&self.root, key, "")
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let path = self.blob_path(key)?;
        Ok(read_optional(&path).await?.map(Bytes::from))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let path = self.blob_path(key)?;
        write_atomic(&path, &data).await?;
        tracing::debug!(key, size = data.len(), "blob written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.blob_path(key)?;
        remove_optional(&path).await
    }
}
