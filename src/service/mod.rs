//! State resource controller.
//!
//! Orchestrates the blob store and the lock actors for one project key at a
//! time. Holds no persistent state of its own.
//!
//! The lock check and the blob mutation that follows it are two separate
//! steps: a lock taken between them is not observed by the mutation. Locking
//! stays cooperative and best effort, as in the state protocol itself.

use crate::actor::{LockActorPool, LockError};
use crate::key::ProjectKey;
use crate::lock_info::LockInfo;
use crate::observability::metrics;
use crate::storage::{BlobStore, StorageError};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The mutation is disallowed by the current lock holder
    #[error("state is locked by {}", .0.id)]
    Locked(Box<LockInfo>),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Clone)]
pub struct StateService {
    blobs: Arc<dyn BlobStore>,
    locks: LockActorPool,
}

impl StateService {
    pub fn new(blobs: Arc<dyn BlobStore>, locks: LockActorPool) -> Self {
        Self { blobs, locks }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn locks(&self) -> &LockActorPool {
        &self.locks
    }

    /// Read the blob for `key`. Reads never consult the lock.
    pub async fn fetch(&self, key: &ProjectKey) -> Result<Option<Bytes>, ServiceError> {
        let start = Instant::now();
        let res = self.blobs.get(key.as_str()).await;
        metrics::record_storage_op("get", self.blobs.backend_name(), start.elapsed().as_secs_f64());
        Ok(res?)
    }

    /// Write the blob for `key`, replacing any previous one.
    ///
    /// With no lock held the write always goes through. With a lock held it
    /// goes through only if `lock_id` matches the holder's ID.
    pub async fn create(
        &self,
        key: &ProjectKey,
        data: Bytes,
        lock_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        if let Some(held) = self.locks.inspect(key).await? {
            if lock_id != Some(held.id.as_str()) {
                tracing::warn!(
                    key = %key,
                    presented = lock_id.unwrap_or("<none>"),
                    held_by = %held.id,
                    "state write rejected: locked by another ID"
                );
                return Err(ServiceError::Locked(Box::new(held)));
            }
        }

        let start = Instant::now();
        let size = data.len();
        let res = self.blobs.put(key.as_str(), data).await;
        metrics::record_storage_op("put", self.blobs.backend_name(), start.elapsed().as_secs_f64());
        res?;

        tracing::info!(key = %key, size, "state created or updated");
        Ok(())
    }

    /// Delete the blob for `key`. Any held lock blocks the delete, whoever
    /// holds it.
    pub async fn delete(&self, key: &ProjectKey) -> Result<(), ServiceError> {
        if let Some(held) = self.locks.inspect(key).await? {
            tracing::warn!(key = %key, held_by = %held.id, "state delete rejected: locked");
            return Err(ServiceError::Locked(Box::new(held)));
        }

        let start = Instant::now();
        let res = self.blobs.delete(key.as_str()).await;
        metrics::record_storage_op("delete", self.blobs.backend_name(), start.elapsed().as_secs_f64());
        let existed = res?;

        tracing::info!(key = %key, existed, "state deleted");
        Ok(())
    }
}
