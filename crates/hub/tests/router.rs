//! Route-level tests driven through the router without a live listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use overmark_hub::config::HubConfig;
use overmark_hub::state::AppState;
use overmark_hub::ws::HubManager;
use overmark_hub::router;

fn test_state() -> AppState {
    AppState {
        config: Arc::new(HubConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            heartbeat_interval_secs: 30,
        }),
        hub: Arc::new(HubManager::new()),
    }
}

#[tokio::test]
async fn health_endpoint_responds_ok() {
    let app = router::router().with_state(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ws_route_rejects_plain_http() {
    let app = router::router().with_state(test_state());

    // No upgrade headers: the handshake must be refused.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws/client-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::OK);
}
