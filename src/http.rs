use crate::actor::LockError;
use crate::auth::{AuthContext, AuthError};
use crate::handler::BaseHandler;
use crate::key::{KeyError, ProjectKey};
use crate::lock_info::LockInfo;
use crate::observability::{health, metrics};
use crate::service::ServiceError;
use crate::storage::StorageError;
use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Default cap on request bodies. State files can be large.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// HTTP handler for the state protocol, wrapping BaseHandler
#[derive(Clone)]
pub struct StateHttpHandler {
    handler: Arc<BaseHandler>,
    max_body_bytes: usize,
}

impl StateHttpHandler {
    pub fn new(handler: BaseHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Router for the state protocol:
    ///
    /// - `GET|POST|DELETE /{project}`: the state blob
    /// - `GET|PUT|LOCK|DELETE|UNLOCK /{project}/lock`: the lock
    pub fn router(self) -> Router {
        Router::new()
            .route(
                "/:project",
                get(fetch_state)
                    .post(create_state)
                    .delete(delete_state)
                    // other verbs on a state path are unmatched routes, not 405
                    .fallback(route_not_found),
            )
            // `any` so the non-standard LOCK/UNLOCK verbs reach the handler
            .route("/:project/lock", any(lock_state))
            .fallback(route_not_found)
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(middleware::from_fn(track_http_metrics))
            .with_state(self.handler)
    }

    /// Router for operational endpoints, served on its own listener so the
    /// paths never shadow a project name.
    pub fn ops_router(self) -> Router {
        Router::new()
            .route("/health", get(health_endpoint))
            .route("/metrics", get(metrics_endpoint))
            .with_state(self.handler)
    }
}

#[derive(Debug)]
enum ApiError {
    Unauthorized { realm: String },
    BadRequest(String),
    UnsupportedBody(String),
    Locked(Option<LockInfo>),
    MethodNotAllowed,
    Internal(String),
}

impl From<KeyError> for ApiError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::MissingProject => ApiError::BadRequest("No project name specified".into()),
            KeyError::InvalidProject(_) => ApiError::BadRequest(e.to_string()),
            KeyError::MissingIdentity => ApiError::Internal("Unable to determine username".into()),
            KeyError::InvalidIdentity(_) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidKey(msg) => ApiError::BadRequest(msg),
            StorageError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<LockError> for ApiError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::MissingId => ApiError::BadRequest("Lock info must carry an ID".into()),
            LockError::Storage(e) => e.into(),
            LockError::Unavailable(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Locked(held) => ApiError::Locked(Some(*held)),
            ServiceError::Storage(e) => e.into(),
            ServiceError::Lock(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized { realm } => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, format!("Basic realm=\"{realm}\""))],
                "Invalid authentication credentials",
            )
                .into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::UnsupportedBody(msg) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg).into_response()
            }
            // The holder is returned so clients can report who has the lock
            ApiError::Locked(Some(held)) => (StatusCode::LOCKED, Json(held)).into_response(),
            ApiError::Locked(None) => {
                (StatusCode::LOCKED, "State is currently locked").into_response()
            }
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                metrics::increment_error("Internal", "http");
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}

async fn authenticate(handler: &BaseHandler, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let scheme = handler.auth.scheme();
    let start = Instant::now();
    let res = handler.auth.authenticate(headers).await;
    metrics::record_auth_duration(scheme, start.elapsed().as_secs_f64());

    match res {
        Ok(ctx) => {
            metrics::increment_auth_success(scheme);
            Ok(ctx)
        }
        Err(AuthError::Internal(msg)) => {
            metrics::increment_auth_failure(scheme);
            Err(ApiError::Internal(msg))
        }
        Err(e) => {
            metrics::increment_auth_failure(scheme);
            tracing::warn!(scheme, error = %e, "rejected credentials");
            Err(ApiError::Unauthorized {
                realm: handler.realm.clone(),
            })
        }
    }
}

/// Authenticate and derive the project key in one step.
async fn resolve_key(
    handler: &BaseHandler,
    headers: &HeaderMap,
    project: &str,
) -> Result<ProjectKey, ApiError> {
    let ctx = authenticate(handler, headers).await?;
    ProjectKey::derive(&ctx.identity, project).map_err(|e| match e {
        KeyError::InvalidIdentity(identity) => {
            tracing::warn!(identity = %identity, "rejected identity that is not a single key segment");
            ApiError::Unauthorized {
                realm: handler.realm.clone(),
            }
        }
        e => e.into(),
    })
}

/// GET /{project} - Fetch state
async fn fetch_state(
    State(handler): State<Arc<BaseHandler>>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = resolve_key(&handler, &headers, &project).await?;

    match handler.service.fetch(&key).await? {
        Some(state) => {
            tracing::debug!(key = %key, size = state.len(), "fetched state");
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                state,
            )
                .into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct CreateStateParams {
    /// Lock ID presented by a client that holds the lock
    #[serde(rename = "ID")]
    id: Option<String>,
}

/// POST /{project}?ID=<lock id> - Create or replace state
async fn create_state(
    State(handler): State<Arc<BaseHandler>>,
    Path(project): Path<String>,
    Query(params): Query<CreateStateParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let key = resolve_key(&handler, &headers, &project).await?;

    if body.is_empty() {
        return Err(ApiError::UnsupportedBody("Invalid request data".into()));
    }
    if serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_err() {
        return Err(ApiError::UnsupportedBody("State must be a JSON document".into()));
    }

    handler
        .service
        .create(&key, body, params.id.as_deref())
        .await?;
    Ok((StatusCode::OK, "State created or updated successfully"))
}

/// DELETE /{project} - Delete state
async fn delete_state(
    State(handler): State<Arc<BaseHandler>>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let key = resolve_key(&handler, &headers, &project).await?;
    handler.service.delete(&key).await?;
    Ok((StatusCode::OK, "State deleted successfully"))
}

fn parse_lock_info(body: &[u8]) -> Result<LockInfo, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("No lock info provided".into()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid lock info: {e}")))
}

/// /{project}/lock
///
/// - GET: current lock info, or `null`
/// - PUT | LOCK: acquire
/// - DELETE | UNLOCK: release
async fn lock_state(
    State(handler): State<Arc<BaseHandler>>,
    Path(project): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let key = resolve_key(&handler, &headers, &project).await?;
    let locks = handler.service.locks();

    match method.as_str() {
        "GET" => {
            let held = locks.inspect(&key).await?;
            Ok((StatusCode::OK, Json(held)).into_response())
        }
        "PUT" | "LOCK" => {
            let candidate = parse_lock_info(&body)?;
            if locks.lock(&key, candidate).await? {
                Ok((StatusCode::OK, "Acquired state lock").into_response())
            } else {
                Err(ApiError::Locked(locks.inspect(&key).await?))
            }
        }
        "DELETE" | "UNLOCK" => {
            let candidate = parse_lock_info(&body)?;
            if locks.unlock(&key, candidate).await? {
                Ok((StatusCode::OK, "Unlocked state").into_response())
            } else {
                Err(ApiError::Locked(locks.inspect(&key).await?))
            }
        }
        _ => Err(ApiError::MethodNotAllowed),
    }
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": "Route not found",
        })),
    )
}

/// GET /health - storage and lock store health
async fn health_endpoint(State(handler): State<Arc<BaseHandler>>) -> impl IntoResponse {
    let status = health::get_health_status(&handler.service).await;
    let code = if status.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// GET /metrics - Prometheus text exposition
async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Method label with bounded cardinality
fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "LOCK" => "LOCK",
        "UNLOCK" => "UNLOCK",
        _ => "OTHER",
    }
}

async fn track_http_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = method_label(req.method());
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::increment_http_request(method, &endpoint, &status);
    metrics::record_http_duration(method, &endpoint, &status, start.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{InMemoryLockStore, LockActorPool};
    use crate::auth::{Authenticator, BasicAuthenticator};
    use crate::service::StateService;
    use crate::storage::in_memory::InMemoryBlobStore;
    use axum::body::Body;
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn create_test_router() -> Router {
        let auth: Arc<dyn Authenticator> = Arc::new(BasicAuthenticator);
        let service = StateService::new(
            Arc::new(InMemoryBlobStore::new()),
            LockActorPool::new(Arc::new(InMemoryLockStore::new())),
        );
        StateHttpHandler::new(BaseHandler::new(auth, service)).router()
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("test-user:test-pass")),
            )
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_credentials_is_401_with_challenge() {
        let app = create_test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/proj")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"estado\""
        );
    }

    #[tokio::test]
    async fn test_post_then_get_sets_json_content_type() {
        let app = create_test_router();
        let response = app
            .clone()
            .oneshot(request("POST", "/proj", r#"{"v":1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(request("GET", "/proj", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, r#"{"v":1}"#);
    }

    #[tokio::test]
    async fn test_post_rejects_empty_and_non_json_bodies() {
        let app = create_test_router();
        for body in ["", "not json"] {
            let response = app
                .clone()
                .oneshot(request("POST", "/proj", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        }
    }

    #[tokio::test]
    async fn test_lock_conflict_returns_holder() {
        let app = create_test_router();
        let response = app
            .clone()
            .oneshot(request("LOCK", "/proj/lock", r#"{"ID":"a","Operation":"apply"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("LOCK", "/proj/lock", r#"{"ID":"b","Operation":"plan"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::LOCKED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let holder: LockInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(holder.id, "a");
    }

    #[tokio::test]
    async fn test_lock_get_returns_null_when_unlocked() {
        let app = create_test_router();
        let response = app.oneshot(request("GET", "/proj/lock", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "null");
    }

    #[tokio::test]
    async fn test_lock_rejects_malformed_and_missing_id() {
        let app = create_test_router();
        for body in ["", "{", r#"{"Operation":"apply"}"#, r#"{"ID":""}"#] {
            let response = app
                .clone()
                .oneshot(request("PUT", "/proj/lock", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        }
    }

    #[tokio::test]
    async fn test_other_methods_on_lock_are_405() {
        let app = create_test_router();
        for method in ["POST", "PATCH", "FROB"] {
            let response = app
                .clone()
                .oneshot(request(method, "/proj/lock", r#"{"ID":"a"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        }
    }

    #[tokio::test]
    async fn test_unmatched_routes_are_404() {
        let app = create_test_router();
        for uri in ["/", "/proj/lock/extra", "/a/b/c"] {
            let response = app
                .clone()
                .oneshot(request("GET", uri, ""))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_blank_project_name_is_400() {
        let app = create_test_router();
        let response = app.oneshot(request("GET", "/%20", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_identities_do_not_share_state() {
        let app = create_test_router();
        let response = app
            .clone()
            .oneshot(request("POST", "/proj", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/proj")
                    .header(
                        header::AUTHORIZATION,
                        format!("Basic {}", STANDARD.encode("someone-else:pw")),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
