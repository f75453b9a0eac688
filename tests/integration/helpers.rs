//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use tally_api::{AppState, build_router};
use tally_core::config::{AppConfig, CounterMode};
use tally_realtime::CounterEngine;
use tally_store::memory::MemoryStore;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: CounterEngine,
    /// Store the engine persists into
    pub store: MemoryStore,
}

impl TestApp {
    /// A hierarchical counter with two address bits.
    pub async fn hierarchical() -> Self {
        Self::with_store(CounterMode::Hierarchical, MemoryStore::new()).await
    }

    /// A scalar counter.
    pub async fn scalar() -> Self {
        Self::with_store(CounterMode::Scalar, MemoryStore::new()).await
    }

    /// Build an app over an existing store and wait for hydration.
    pub async fn with_store(mode: CounterMode, store: MemoryStore) -> Self {
        let mut config = AppConfig::default();
        config.counter.mode = mode;
        config.counter.depth = 2;

        let engine = CounterEngine::new(&config, Arc::new(store.clone()));
        engine.start().await.expect("Hydration failed");

        let router = build_router(AppState::new(Arc::new(config), engine.clone()));
        Self {
            router,
            engine,
            store,
        }
    }

    /// Make a request with optional JSON body and extra headers
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Parsed test response
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
