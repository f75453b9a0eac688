//! `GET /api/counts` rollup views.

use axum::http::StatusCode;
use serde_json::json;

use tally_core::config::CounterMode;
use tally_store::memory::MemoryStore;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_counts_include_recomputed_root() {
    let app = TestApp::hierarchical().await;
    for body in [
        json!({ "region": "DE", "bits": [0, 1] }),
        json!({ "region": "DE", "bits": [1, 1] }),
        json!({ "region": "FR", "bits": [0, 0] }),
    ] {
        app.request("POST", "/increment", Some(body), &[]).await;
    }

    let response = app.request("GET", "/api/counts", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["root"], 3);
    assert_eq!(data["counts"]["DE"], 2);
    assert_eq!(data["tree"]["count"], 3);
    assert_eq!(data["tree"]["children"][0]["key"], "DE");
}

#[tokio::test]
async fn test_key_view_lists_children() {
    let app = TestApp::hierarchical().await;
    app.request("POST", "/increment", Some(json!({ "region": "DE", "bits": [0, 1] })), &[])
        .await;
    app.request("POST", "/increment", Some(json!({ "region": "DE", "bits": [1, 0] })), &[])
        .await;

    let response = app.request("GET", "/api/counts/DE", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["count"], 2);
    assert_eq!(response.body["data"]["children"], json!({ "DE.0": 1, "DE.1": 1 }));
}

#[tokio::test]
async fn test_unknown_key_is_not_found() {
    let app = TestApp::hierarchical().await;

    let response = app.request("GET", "/api/counts/ZZ", None, &[]).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_counts_hydrated_from_store() {
    let store = MemoryStore::with_entries([("DE", 4), ("DE.1", 4), ("DE.1.0", 4)]);
    let app = TestApp::with_store(CounterMode::Hierarchical, store).await;

    let response = app.request("GET", "/api/counts", None, &[]).await;

    assert_eq!(response.body["data"]["root"], 4);
    assert_eq!(response.body["data"]["counts"]["DE.1.0"], 4);
}
