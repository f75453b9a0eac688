//! `POST /increment`.

use axum::http::StatusCode;
use serde_json::json;

use tally_core::traits::store::CounterStore;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_scalar_increment() {
    let app = TestApp::scalar().await;

    app.request("POST", "/increment", None, &[]).await;
    let response = app.request("POST", "/increment", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["updated"]["count"], 2);
}

#[tokio::test]
async fn test_hierarchical_increment_from_body() {
    let app = TestApp::hierarchical().await;

    let body = json!({ "region": "DE", "bits": [0, 1] });
    app.request("POST", "/increment", Some(body.clone()), &[]).await;
    let response = app.request("POST", "/increment", Some(body), &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["data"]["updated"],
        json!({ "DE": 2, "DE.0": 2, "DE.0.1": 2 })
    );
}

#[tokio::test]
async fn test_hierarchical_increment_from_headers() {
    let app = TestApp::hierarchical().await;

    let headers = [("cf-ipcountry", "us"), ("cf-connecting-ip", "3.4.5.6")];
    let response = app.request("POST", "/increment", None, &headers).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["data"]["updated"],
        json!({ "US": 1, "US.1": 1, "US.1.0": 1 })
    );
}

#[tokio::test]
async fn test_missing_classification_is_rejected() {
    let app = TestApp::hierarchical().await;

    let response = app.request("POST", "/increment", None, &[]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_malformed_classification_is_rejected() {
    let app = TestApp::hierarchical().await;

    for body in [
        json!({ "region": "DEU", "bits": [0, 1] }),
        json!({ "region": "DE", "bits": [0, 2] }),
        json!({ "region": "DE", "bits": [0] }),
    ] {
        let response = app.request("POST", "/increment", Some(body), &[]).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let counts = app.request("GET", "/api/counts", None, &[]).await;
    assert_eq!(counts.body["data"]["root"], 0);
    assert_eq!(app.engine.main().scheduler().dirty_len().await, 0);
}

#[tokio::test]
async fn test_increments_reach_the_store_after_flush() {
    let app = TestApp::scalar().await;
    app.request("POST", "/increment", None, &[]).await;

    let report = app.engine.main().scheduler().flush().await.unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(app.store.get("count").await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_unknown_instance_is_not_found() {
    let app = TestApp::scalar().await;

    let response = app
        .request("POST", "/increment?instance=other", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");

    let response = app
        .request("POST", "/increment?instance=main", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.engine.main().snapshot().await.unwrap().get("count"), 1);
}
