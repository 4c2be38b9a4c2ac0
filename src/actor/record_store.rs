// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Durable per-key storage for lock records
//!
//! A lock actor writes its record through on every transition, so a
//! restarted process sees the same lock state it left behind.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::lock_info::LockInfo;
use crate::storage::common::{key_path, read_optional, remove_optional, write_atomic};
use crate::storage::StorageError;

const LOCK_SUFFIX: &str = ".lock";

#[async_trait]
pub trait LockRecordStore: Send + Sync + 'static {
    /// Short backend name used in logs and health checks.
    fn backend_name(&self) -> &'static str;

    async fn load(&self, key: &str) -> Result<Option<LockInfo>, StorageError>;

    async fn save(&self, key: &str, info: &LockInfo) -> Result<(), StorageError>;

    /// Remove the record for `key`. Clearing an absent record is not an error.
    async fn clear(&self, key: &str) -> Result<(), StorageError>;
}

/// Lock records held in process memory. Clones share state, which lets
/// tests simulate a restart by building a new pool over the same store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockStore {
    records: Arc<RwLock<HashMap<String, LockInfo>>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockRecordStore for InMemoryLockStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &str) -> Result<Option<LockInfo>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, info: &LockInfo) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .insert(key.to_string(), info.clone());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

/// One JSON file per key: `<root>/<key>.lock`.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    root: PathBuf,
}

impl FileLockStore {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Internal(format!("init lock root {:?}: {}", root, e)))?;
        Ok(Self { root })
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        key_path(&self.root, key, LOCK_SUFFIX)
    }
}

#[async_trait]
impl LockRecordStore for FileLockStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, key: &str) -> Result<Option<LockInfo>, StorageError> {
        let path = self.record_path(key)?;
        match read_optional(&path).await? {
            Some(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| StorageError::Internal(format!("deserialize lock {}: {e}", path.display()))),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, info: &LockInfo) -> Result<(), StorageError> {
        let path = self.record_path(key)?;
        let data = serde_json::to_vec(info)
            .map_err(|e| StorageError::Internal(format!("serialize lock: {e}")))?;
        write_atomic(&path, &data).await
    }

    async fn clear(&self, key: &str) -> Result<(), StorageError> {
        let path = self.record_path(key)?;
        remove_optional(&path).await.map(|_| ())
    }
}
