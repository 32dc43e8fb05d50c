use super::{app, metrics_handler, ACTIVE_REQUESTS, BACKEND_CALLS, REQUEST_COUNT};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use mux_common::AppConfig;
use mux_runtime::FederationEngine;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_metrics_registration() {
    let before = BACKEND_CALLS.get();
    BACKEND_CALLS.inc_by(2);
    assert!(BACKEND_CALLS.get() >= before + 2);
}

#[tokio::test]
async fn test_metrics_endpoint_format() {
    let _ = REQUEST_COUNT.get();
    let _ = ACTIVE_REQUESTS.get();

    let response = metrics_handler().await.into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body_str = String::from_utf8(body_bytes.to_vec()).unwrap();

    assert!(body_str.contains("mux_requests_total"), "Body: {}", body_str);
    assert!(body_str.contains("mux_active_requests"), "Body: {}", body_str);
}

#[tokio::test]
async fn test_health_and_ready() {
    let engine = Arc::new(FederationEngine::from_config(&AppConfig::default()));
    for (uri, status) in [("/health", "ok"), ("/ready", "ready")] {
        let response = app(engine.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], status);
    }
}
