use crate::storage::StorageError;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must be non-empty".into()));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!("key {key:?} is not a relative path")));
    }
    Ok(())
}

/// Map a key to a file below `root`, appending `suffix` to the file name.
pub fn key_path(root: &Path, key: &str, suffix: &str) -> Result<PathBuf, StorageError> {
    validate_key(key)?;
    let rel = PathBuf::from(format!("{key}{suffix}"));
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(StorageError::InvalidKey(format!("key {key:?} escapes the store root")));
    }
    Ok(root.join(rel))
}

/// Write `data` to `path` through a sibling temp file and an atomic rename,
/// so readers observe either the old or the new contents.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Internal(format!("no parent for {}", path.display())))?;
    fs::create_dir_all(parent)
        .await
        .map_err(|e| StorageError::Internal(format!("create parents: {e}")))?;

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    // Unique per write; concurrent writers to one key must not share a temp file.
    tmp_name.push(format!(".{}.tmp", TMP_SEQ.fetch_add(1, Ordering::Relaxed)));
    let tmp = parent.join(tmp_name);

    let res = write_then_rename(&tmp, path, data).await;
    if res.is_err() {
        // Leave no partial temp file behind
        if let Err(e) = fs::remove_file(&tmp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
            }
        }
    }
    res
}

async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::File::create(tmp)
        .await
        .map_err(|e| StorageError::Internal(format!("create {}: {e}", tmp.display())))?;
    file.write_all(data)
        .await
        .map_err(|e| StorageError::Internal(format!("write {}: {e}", tmp.display())))?;
    file.sync_all()
        .await
        .map_err(|e| StorageError::Internal(format!("fsync {}: {e}", tmp.display())))?;
    drop(file);

    fs::rename(tmp, path)
        .await
        .map_err(|e| StorageError::Internal(format!("rename {}: {e}", path.display())))
}

/// Read a file, mapping "not found" to `None`.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Internal(format!("read {}: {e}", path.display()))),
    }
}

/// Remove a file, returning whether it existed.
pub async fn remove_optional(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::Internal(format!("remove {}: {e}", path.display()))),
    }
}
