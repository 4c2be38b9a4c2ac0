/// Health check implementations for the blob store and the lock record store
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::actor::LockRecordStore;
use crate::service::StateService;
use crate::storage::BlobStore;

/// Key probed by the checks. It is not a valid project key, so it never
/// collides with real state.
const PROBE_KEY: &str = "__health_check__";

/// Overall health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub checks: Vec<HealthCheck>,
}

/// Individual health check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub duration_ms: f64,
}

impl HealthCheck {
    fn from_result<E: std::fmt::Display>(
        name: &str,
        start: std::time::Instant,
        res: Result<(), E>,
    ) -> Self {
        let (status, message) = match res {
            Ok(()) => ("healthy", None),
            Err(e) => ("unhealthy", Some(format!("{name} check failed: {e}"))),
        };
        HealthCheck {
            name: name.to_string(),
            status: status.to_string(),
            message,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Check blob store health with a read of the probe key
pub async fn check_storage_health(blobs: &Arc<dyn BlobStore>) -> HealthCheck {
    let start = std::time::Instant::now();
    let res = blobs.get(PROBE_KEY).await.map(|_| ());
    HealthCheck::from_result("storage", start, res)
}

/// Check lock record store health with a load of the probe key
pub async fn check_lock_store_health(store: &Arc<dyn LockRecordStore>) -> HealthCheck {
    let start = std::time::Instant::now();
    let res = store.load(PROBE_KEY).await.map(|_| ());
    HealthCheck::from_result("locks", start, res)
}

/// Get overall health status by checking all backends
pub async fn get_health_status(service: &StateService) -> HealthStatus {
    let checks = vec![
        check_storage_health(service.blobs()).await,
        check_lock_store_health(service.locks().store()).await,
    ];

    let all_healthy = checks.iter().all(|c| c.status == "healthy");

    HealthStatus {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
    }
}
