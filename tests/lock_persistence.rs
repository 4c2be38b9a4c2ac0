use estado::actor::{FileLockStore, LockActorPool, LockRecordStore};
use estado::service::{ServiceError, StateService};
use estado::storage::file_storage::FileBlobStore;
use estado::{LockInfo, ProjectKey};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

async fn open_service(root: &Path) -> StateService {
    let blobs = FileBlobStore::new(root.join("states")).await.unwrap();
    let locks = FileLockStore::new(root.join("locks")).await.unwrap();
    StateService::new(Arc::new(blobs), LockActorPool::new(Arc::new(locks)))
}

#[tokio::test]
async fn test_held_lock_survives_restart() {
    let dir = tempdir().unwrap();
    let key = ProjectKey::derive("ops", "network").unwrap();

    {
        let service = open_service(dir.path()).await;
        let info = LockInfo::new("lock-1", "OperationTypeApply").with_who("alice@host");
        assert!(service.locks().lock(&key, info).await.unwrap());
    }

    // Lock record is on disk next to the key layout
    assert!(dir.path().join("locks/ops/network.tfstate.lock").exists());

    let service = open_service(dir.path()).await;
    let held = service.locks().inspect(&key).await.unwrap().unwrap();
    assert_eq!(held.id, "lock-1");
    assert_eq!(held.who, "alice@host");

    let rival = LockInfo::new("lock-2", "OperationTypePlan");
    assert!(!service.locks().lock(&key, rival).await.unwrap());

    let res = service.create(&key, r#"{"v":1}"#.into(), None).await;
    assert!(matches!(res, Err(ServiceError::Locked(_))));
}

#[tokio::test]
async fn test_release_survives_restart() {
    let dir = tempdir().unwrap();
    let key = ProjectKey::derive("ops", "network").unwrap();

    {
        let service = open_service(dir.path()).await;
        let info = LockInfo::new("lock-1", "OperationTypeApply");
        assert!(service.locks().lock(&key, info.clone()).await.unwrap());
        assert!(service.locks().unlock(&key, info).await.unwrap());
    }

    assert!(!dir.path().join("locks/ops/network.tfstate.lock").exists());

    let service = open_service(dir.path()).await;
    assert!(service.locks().inspect(&key).await.unwrap().is_none());
    service.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let key = ProjectKey::derive("ops", "network").unwrap();

    {
        let service = open_service(dir.path()).await;
        service
            .create(&key, r#"{"serial":7}"#.into(), None)
            .await
            .unwrap();
    }

    let service = open_service(dir.path()).await;
    let state = service.fetch(&key).await.unwrap().unwrap();
    assert_eq!(&state[..], br#"{"serial":7}"#);
}

#[tokio::test]
async fn test_record_store_written_through_on_each_transition() {
    let dir = tempdir().unwrap();
    let store = Arc::new(FileLockStore::new(dir.path()).await.unwrap());
    let pool = LockActorPool::new(store.clone());
    let key = ProjectKey::derive("ops", "dns").unwrap();
    let info = LockInfo::new("x", "OperationTypeApply");

    assert!(pool.lock(&key, info.clone()).await.unwrap());
    let stored = store.load(key.as_str()).await.unwrap().unwrap();
    assert_eq!(stored.id, "x");

    assert!(pool.unlock(&key, info).await.unwrap());
    assert!(store.load(key.as_str()).await.unwrap().is_none());
}
