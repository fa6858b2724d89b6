//! HTTP router for secretgate

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use secretgate_manager::{ManagerError, SecretManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::handlers;
use crate::logger::LogFiles;

/// Shared state for all routes
pub struct AppState {
    pub manager: SecretManager,
    pub logs: Arc<LogFiles>,
}

impl AppState {
    /// Record a failed manager operation in both diagnostic channels.
    pub(crate) fn report(&self, operation: &str, err: &ManagerError) {
        error!(operation, error = %err, "secret operation failed");
        self.logs.error(&format!("{operation}: {err}"));
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs", get(handlers::api_docs))
        .route(
            "/secrets",
            get(handlers::list_secrets).post(handlers::create_secret),
        )
        .route(
            "/secrets/:name",
            get(handlers::get_secret)
                .put(handlers::update_secret)
                .delete(handlers::delete_secret),
        )
        .layer(middleware::from_fn_with_state(shared.clone(), access_log))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Write one combined-format access record per completed request.
async fn access_log(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let remote = connect.map_or_else(|| "-".to_string(), |info| info.0.ip().to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let referer = header_or_dash(request.headers(), header::REFERER);
    let user_agent = header_or_dash(request.headers(), header::USER_AGENT);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let timestamp = Utc::now().format("%d/%b/%Y:%H:%M:%S %z");

    state.logs.access(&format!(
        "{remote} - - [{timestamp}] \"{method} {uri} {version:?}\" {status} {length} \"{referer}\" \"{user_agent}\""
    ));
    response
}

fn header_or_dash(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use secretgate_manager::{
        MemoryStore, Replication, SecretInfo, SecretStore, StoreError, VersionInfo,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Store double whose version listing fails for the secret named
    /// `broken`; everything else passes through to a [`MemoryStore`].
    struct HalfBrokenStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl SecretStore for HalfBrokenStore {
        async fn list_secrets(&self, parent: &str) -> Result<Vec<SecretInfo>, StoreError> {
            self.inner.list_secrets(parent).await
        }

        async fn create_secret(
            &self,
            parent: &str,
            secret_id: &str,
            replication: Replication,
        ) -> Result<SecretInfo, StoreError> {
            self.inner.create_secret(parent, secret_id, replication).await
        }

        async fn add_version(
            &self,
            secret_name: &str,
            payload: bytes::Bytes,
        ) -> Result<VersionInfo, StoreError> {
            self.inner.add_version(secret_name, payload).await
        }

        async fn list_versions(&self, secret_name: &str) -> Result<Vec<VersionInfo>, StoreError> {
            if secret_name.ends_with("/secrets/broken") {
                return Err(StoreError::Internal("version listing down".to_string()));
            }
            self.inner.list_versions(secret_name).await
        }

        async fn access_version(&self, version_name: &str) -> Result<bytes::Bytes, StoreError> {
            self.inner.access_version(version_name).await
        }

        async fn disable_version(&self, version_name: &str) -> Result<(), StoreError> {
            self.inner.disable_version(version_name).await
        }

        async fn delete_secret(&self, secret_name: &str) -> Result<(), StoreError> {
            self.inner.delete_secret(secret_name).await
        }
    }

    fn test_router() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let logs = Arc::new(LogFiles::open(dir.path()).unwrap());
        let manager = SecretManager::new("test-project", Arc::new(MemoryStore::new()));
        (create_router(AppState { manager, logs }), dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, bytes::Bytes) {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes)
    }

    fn as_json(bytes: &bytes::Bytes) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = test_router();
        let (status, _) = send(&app, "GET", "/health", "").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_docs_served() {
        let (app, _dir) = test_router();
        let (status, body) = send(&app, "GET", "/api-docs", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["openapi"], "3.0.3");
    }

    #[tokio::test]
    async fn test_list_empty_project() {
        let (app, _dir) = test_router();
        let (status, body) = send(&app, "GET", "/secrets", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_create_requires_name_and_value() {
        let (app, _dir) = test_router();

        for bad in [
            r#"{"name": "db-pass"}"#,
            r#"{"value": "s3cr3t"}"#,
            r#"{"name": "", "value": "s3cr3t"}"#,
            "not json",
        ] {
            let (status, _) = send(&app, "POST", "/secrets", bad).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "accepted body {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (app, _dir) = test_router();

        let (status, body) = send(
            &app,
            "POST",
            "/secrets",
            r#"{"name": "db-pass", "value": "s3cr3t"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created = as_json(&body);
        assert_eq!(created["name"], "db-pass");
        assert_eq!(created["value"], "s3cr3t");
        assert_eq!(
            created["canonicalName"],
            "projects/test-project/secrets/db-pass"
        );
        assert_eq!(
            created["currentVersion"],
            "projects/test-project/secrets/db-pass/versions/1"
        );

        let (status, body) = send(&app, "GET", "/secrets/db-pass", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), created);

        let (status, body) = send(&app, "GET", "/secrets", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), serde_json::json!([created]));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let (app, _dir) = test_router();
        let body = r#"{"name": "db-pass", "value": "s3cr3t"}"#;

        send(&app, "POST", "/secrets", body).await;
        let (status, _) = send(&app, "POST", "/secrets", body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_get_missing_is_404_and_logged() {
        let (app, dir) = test_router();

        let (status, body) = send(&app, "GET", "/secrets/missing", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(as_json(&body)["message"], "Secret not found.");

        let error_log = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
        assert!(error_log.contains("missing"));
    }

    #[tokio::test]
    async fn test_update_requires_value() {
        let (app, _dir) = test_router();
        send(
            &app,
            "POST",
            "/secrets",
            r#"{"name": "db-pass", "value": "s3cr3t"}"#,
        )
        .await;

        for bad in [r#"{}"#, r#"{"value": ""}"#, "not json"] {
            let (status, _) = send(&app, "PUT", "/secrets/db-pass", bad).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "accepted body {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_update_missing_secret_is_403() {
        let (app, _dir) = test_router();
        let (status, _) = send(&app, "PUT", "/secrets/ghost", r#"{"value": "v"}"#).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_advances_current_version() {
        let (app, _dir) = test_router();
        send(
            &app,
            "POST",
            "/secrets",
            r#"{"name": "db-pass", "value": "s3cr3t"}"#,
        )
        .await;

        let (status, body) = send(&app, "PUT", "/secrets/db-pass", r#"{"value": "n3wpass"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let updated = as_json(&body);
        assert_eq!(updated["value"], "n3wpass");
        assert_eq!(
            updated["currentVersion"],
            "projects/test-project/secrets/db-pass/versions/2"
        );

        let (_, body) = send(&app, "GET", "/secrets/db-pass", "").await;
        assert_eq!(as_json(&body)["value"], "n3wpass");
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let (app, _dir) = test_router();
        send(
            &app,
            "POST",
            "/secrets",
            r#"{"name": "db-pass", "value": "s3cr3t"}"#,
        )
        .await;

        let (status, body) = send(&app, "DELETE", "/secrets/db-pass", "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = send(&app, "GET", "/secrets/db-pass", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_secret_is_403() {
        let (app, _dir) = test_router();
        let (status, _) = send(&app, "DELETE", "/secrets/ghost", "").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_access_log_records_requests() {
        let (app, dir) = test_router();
        send(&app, "GET", "/secrets", "").await;

        let access_log = std::fs::read_to_string(dir.path().join("access.log")).unwrap();
        // The empty list body is two bytes; the record carries the real count
        assert!(
            access_log.contains("\"GET /secrets HTTP/1.1\" 200 2 "),
            "unexpected access record: {access_log}"
        );
    }

    #[tokio::test]
    async fn test_list_logs_unresolvable_secrets() {
        let store = Arc::new(HalfBrokenStore {
            inner: MemoryStore::new(),
        });
        store
            .inner
            .create_secret("projects/test-project", "alpha", Replication::Automatic)
            .await
            .unwrap();
        store
            .inner
            .add_version(
                "projects/test-project/secrets/alpha",
                bytes::Bytes::from_static(b"a"),
            )
            .await
            .unwrap();
        store
            .inner
            .create_secret("projects/test-project", "broken", Replication::Automatic)
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let logs = Arc::new(LogFiles::open(dir.path()).unwrap());
        let manager = SecretManager::new("test-project", store);
        let app = create_router(AppState { manager, logs });

        let (status, body) = send(&app, "GET", "/secrets", "").await;
        assert_eq!(status, StatusCode::OK);
        let listed = as_json(&body);
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert_eq!(
            listed
                .as_array()
                .unwrap()
                .iter()
                .filter(|entry| entry.is_null())
                .count(),
            1
        );

        let error_log = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
        assert!(
            error_log.contains("list secrets"),
            "missing error record: {error_log}"
        );
    }
}
