//! Route definitions for the Tally HTTP API.
//!
//! The counter surface (`/connect`, `/increment`) sits at the root; read-only
//! views live under `/api`. Everything else falls through to `404`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(health_routes()).merge(count_routes());
    let cors = middleware::cors::build_cors_layer(&state.config.server);

    Router::new()
        .route("/connect", get(handlers::ws::connect))
        .route("/increment", post(handlers::increment::increment))
        .nest("/api", api_routes)
        .fallback(handlers::fallback::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Liveness and detailed health
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

/// Count snapshot and per-key rollup
fn count_routes() -> Router<AppState> {
    Router::new()
        .route("/counts", get(handlers::counts::list_counts))
        .route("/counts/{key}", get(handlers::counts::get_count))
}
