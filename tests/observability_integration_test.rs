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

//! Ops listener: Prometheus exposition and health checks.
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use estado::actor::{FileLockStore, InMemoryLockStore, LockActorPool};
use estado::auth::{AnonymousAuthenticator, Authenticator};
use estado::handler::BaseHandler;
use estado::http::StateHttpHandler;
use estado::observability::health::HealthStatus;
use estado::observability::metrics;
use estado::service::StateService;
use estado::storage::file_storage::FileBlobStore;
use estado::storage::in_memory::InMemoryBlobStore;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn create_handler(service: StateService) -> StateHttpHandler {
    let auth: Arc<dyn Authenticator> = Arc::new(AnonymousAuthenticator::new("anonymous"));
    StateHttpHandler::new(BaseHandler::new(auth, service))
}

fn in_memory_handler() -> StateHttpHandler {
    create_handler(StateService::new(
        Arc::new(InMemoryBlobStore::new()),
        LockActorPool::new(Arc::new(InMemoryLockStore::new())),
    ))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_request_and_lock_series() {
    let handler = in_memory_handler();
    let state_app = handler.clone().router();
    let ops_app = handler.ops_router();

    let resp = state_app
        .clone()
        .oneshot(
            Request::builder()
                .method("LOCK")
                .uri("/metrics-proj/lock")
                .body(Body::from(r#"{"ID":"m1","Operation":"apply"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ops_app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4"
    );
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("estado_http_requests_total"));
    assert!(text.contains("estado_lock_operations_total"));
    assert!(text.contains("/:project/lock"));
}

#[tokio::test]
async fn test_health_is_ok_for_in_memory_backends() {
    let ops_app = in_memory_handler().ops_router();
    let (status, body) = get(&ops_app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(health.status, "healthy");
    let names: Vec<_> = health.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["storage", "locks"]);
}

#[tokio::test]
async fn test_health_is_503_when_lock_store_is_broken() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FileBlobStore::new(dir.path().join("states")).await.unwrap();
    let locks = FileLockStore::new(dir.path().join("locks")).await.unwrap();
    // A directory in place of the probe record makes reads fail
    std::fs::create_dir_all(dir.path().join("locks/__health_check__.lock")).unwrap();

    let handler = create_handler(StateService::new(
        Arc::new(blobs),
        LockActorPool::new(Arc::new(locks)),
    ));
    let (status, body) = get(&handler.ops_router(), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let health: HealthStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(health.status, "unhealthy");
    let locks_check = health.checks.iter().find(|c| c.name == "locks").unwrap();
    assert_eq!(locks_check.status, "unhealthy");
}

#[tokio::test]
async fn test_ops_paths_are_projects_on_state_router() {
    let state_app = in_memory_handler().router();
    // /health on the state listener is just a project that was never written
    let (status, _) = get(&state_app, "/health").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_auth_metrics_recorded() {
    let app = in_memory_handler().router();
    let req = Request::builder()
        .uri("/p")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("ignored:pw")),
        )
        .body(Body::empty())
        .unwrap();
    app.oneshot(req).await.unwrap();

    let text = String::from_utf8(metrics::gather_metrics()).unwrap();
    assert!(text.contains("estado_auth_total"));
}
