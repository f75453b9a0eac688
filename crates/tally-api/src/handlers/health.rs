//! Health check handlers.

use axum::Json;
use axum::extract::State;

use tally_realtime::Lifecycle;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        lifecycle: state.engine.main().lifecycle(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let actor = state.engine.main();
    let scheduler = actor.scheduler();
    let store_healthy = scheduler.store_health().await.unwrap_or(false);
    let lifecycle = actor.lifecycle();

    let status = if lifecycle == Lifecycle::Ready && store_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: status.to_string(),
        instance: actor.name().to_string(),
        lifecycle,
        store: scheduler.provider_type().to_string(),
        store_healthy,
        connections: actor.registry().len(),
        live_connections: actor.registry().connections(),
        dirty_keys: scheduler.dirty_len().await,
        metrics: state.engine.metrics().snapshot(),
    }))
}
