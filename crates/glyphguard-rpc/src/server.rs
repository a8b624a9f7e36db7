//! HTTP server implementation using Axum.

use crate::handlers::{
    get_conflict_detection, handle_health, report_conflicts, set_conflict_detection,
};
use axum::{
    routing::{get, post},
    Router,
};
use glyphguard_core::config::RestConfig;
use glyphguard_core::{BootOutcome, ConflictAggregator};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Application state shared across handlers.
pub struct AppState {
    /// Result of arbitrating the registered installations
    pub boot: BootOutcome,
    /// Merge point for conflict reports
    pub aggregator: ConflictAggregator,
    /// Bearer token granting the administrative capability
    pub admin_token: Option<String>,
    /// Route namespace, e.g. `glyphguard/v1`
    pub namespace: String,
    pub settings_page_url: String,
    /// Public base of the namespaced routes, handed to page loads
    pub api_url: String,
}

/// Build the router for `state`.
///
/// Conflict routes are only mounted when boot succeeded.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().route("/health", get(handle_health));

    if state.boot.active().is_some() {
        let api = Router::new()
            .route(
                &format!("/{}", RestConfig::REPORT_CONFLICTS_ROUTE),
                post(report_conflicts),
            )
            .route(
                &format!("/{}", RestConfig::CONFLICT_DETECTION_ROUTE),
                get(get_conflict_detection).post(set_conflict_detection),
            );
        app = app.nest(&format!("/{}", state.namespace.trim_matches('/')), api);
    } else {
        warn!("Boot failed; conflict routes not mounted");
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
    .with_state(state)
}

/// Start the REST server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let namespace = state.namespace.clone();
    let app = build_router(Arc::new(state));

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(
        "Server listening on {} (namespace {})",
        actual_addr, namespace
    );

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use glyphguard_core::config::StoreConfig;
    use glyphguard_core::{
        AdminNotice, DottedVersion, InstallationRecord, MemoryOptionStore, OptionStore,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const REPORT: &str = "/glyphguard/v1/report-conflicts";
    const DETECTION: &str = "/glyphguard/v1/conflict-detection";

    fn loaded() -> BootOutcome {
        BootOutcome::Loaded(InstallationRecord::new(
            "/plugins/glyphguard",
            DottedVersion::parse("4.0.0").unwrap(),
        ))
    }

    fn state_with(store: Arc<MemoryOptionStore>, admin_token: Option<&str>) -> Arc<AppState> {
        Arc::new(AppState {
            boot: loaded(),
            aggregator: ConflictAggregator::new(store),
            admin_token: admin_token.map(String::from),
            namespace: RestConfig::NAMESPACE.to_string(),
            settings_page_url: "http://localhost/admin/options.php?page=glyphguard".to_string(),
            api_url: "https://example.test/glyphguard/v1".to_string(),
        })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn enable_scanner(app: &Router) {
        let response = app
            .clone()
            .oneshot(post_json(DETECTION, r#"{"enable": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state_with(Arc::new(MemoryOptionStore::new()), None));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_report_while_disabled_is_404() {
        let store = Arc::new(MemoryOptionStore::new());
        let app = build_router(state_with(store.clone(), None));

        let response = app.oneshot(post_json(REPORT, r#"{"a": {}}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_report_while_enabled_is_204() {
        let store = Arc::new(MemoryOptionStore::new());
        let app = build_router(state_with(store.clone(), None));
        enable_scanner(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(REPORT, r#"{"a": {"src": "x"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            store.get(StoreConfig::UNREGISTERED_CLIENTS_KEY).unwrap(),
            Some(json!({"a": {"src": "x"}}))
        );
    }

    #[tokio::test]
    async fn test_refused_write_is_400_update_failed() {
        let store = Arc::new(MemoryOptionStore::new());
        let app = build_router(state_with(store.clone(), None));
        enable_scanner(&app).await;
        store.set_refuse_writes(true);

        let response = app.oneshot(post_json(REPORT, r#"{"a": {}}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "update_failed");
        assert_eq!(body["data"]["status"], 400);
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let store = Arc::new(MemoryOptionStore::new());
        let app = build_router(state_with(store.clone(), None));
        store.set_fail_reads(true);

        let response = app.oneshot(post_json(REPORT, r#"{"a": {}}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], "caught_exception");
        assert!(!body["message"].as_str().unwrap().contains("Injected"));
    }

    #[tokio::test]
    async fn test_non_object_body_is_400() {
        let app = build_router(state_with(Arc::new(MemoryOptionStore::new()), None));
        let response = app.oneshot(post_json(REPORT, r#""hello""#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_body");
    }

    #[tokio::test]
    async fn test_admin_token_required() {
        let app = build_router(state_with(Arc::new(MemoryOptionStore::new()), Some("secret")));

        let response = app
            .clone()
            .oneshot(post_json(REPORT, r#"{"a": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "rest_forbidden");

        let mut request = post_json(DETECTION, r#"{"enable": true}"#);
        request
            .headers_mut()
            .insert("authorization", "Bearer secret".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_scanner() {
        let app = build_router(state_with(Arc::new(MemoryOptionStore::new()), None));
        enable_scanner(&app).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri(DETECTION)
                    .header("host", "attacker.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["showConflictDetectionReporter"], true);
        assert_eq!(body["apiUrl"], "https://example.test/glyphguard/v1");
        assert!(body["troubleshootTabUrl"]
            .as_str()
            .unwrap()
            .ends_with("tab=ts"));
    }

    #[tokio::test]
    async fn test_failed_boot_mounts_health_only() {
        let state = Arc::new(AppState {
            boot: BootOutcome::Failed(AdminNotice::new("Unable to load GlyphGuard.")),
            aggregator: ConflictAggregator::new(Arc::new(MemoryOptionStore::new())),
            admin_token: None,
            namespace: RestConfig::NAMESPACE.to_string(),
            settings_page_url: String::new(),
            api_url: String::new(),
        });
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(REPORT, r#"{"a": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["notice"], "Unable to load GlyphGuard.");
    }

    #[tokio::test]
    async fn test_server_starts() {
        let state = AppState {
            boot: loaded(),
            aggregator: ConflictAggregator::new(Arc::new(MemoryOptionStore::new())),
            admin_token: None,
            namespace: RestConfig::NAMESPACE.to_string(),
            settings_page_url: String::new(),
            api_url: String::new(),
        };
        let addr = start_server(state, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }
}
