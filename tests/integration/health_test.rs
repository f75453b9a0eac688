//! Health endpoints and route fallback.

use axum::http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::scalar().await;

    let response = app.request("GET", "/api/health", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["lifecycle"], "ready");
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = TestApp::scalar().await;
    app.request("POST", "/increment", None, &[]).await;

    let response = app.request("GET", "/api/health/detailed", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["instance"], "main");
    assert_eq!(data["store"], "memory");
    assert_eq!(data["store_healthy"], true);
    assert_eq!(data["dirty_keys"], 1);
    assert_eq!(data["metrics"]["increments_applied"], 1);
}

#[tokio::test]
async fn test_detailed_health_lists_live_connections() {
    let app = TestApp::scalar().await;
    let _connection = app.engine.main().on_connect(None).await.unwrap();

    let response = app.request("GET", "/api/health/detailed", None, &[]).await;

    let data = &response.body["data"];
    assert_eq!(data["connections"], 1);
    let live = data["live_connections"].as_array().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["alive"], true);
    assert!(live[0]["classification"].is_null());
}

#[tokio::test]
async fn test_detailed_health_reports_store_outage() {
    let app = TestApp::scalar().await;
    app.store.set_offline(true);

    let response = app.request("GET", "/api/health/detailed", None, &[]).await;

    assert_eq!(response.body["data"]["status"], "degraded");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::scalar().await;

    let response = app.request("GET", "/nope", None, &[]).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}
