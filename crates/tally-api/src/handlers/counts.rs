//! Read-only count views.

use axum::Json;
use axum::extract::Path;

use tally_core::error::AppError;

use crate::dto::response::{ApiResponse, CountsResponse, KeyCountResponse};
use crate::error::ApiError;
use crate::extractors::CounterInstance;

/// GET /api/counts
pub async fn list_counts(
    CounterInstance(actor): CounterInstance,
) -> Result<Json<ApiResponse<CountsResponse>>, ApiError> {
    let snapshot = actor.snapshot().await?;
    Ok(Json(ApiResponse::ok(CountsResponse {
        root: snapshot.root_total(),
        tree: snapshot.tree(),
        counts: snapshot.entries().clone(),
    })))
}

/// GET /api/counts/{key}
pub async fn get_count(
    CounterInstance(actor): CounterInstance,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<KeyCountResponse>>, ApiError> {
    let snapshot = actor.snapshot().await?;
    let Some(count) = snapshot.entries().get(&key).copied() else {
        return Err(AppError::not_found(format!("Key '{key}' has no count")).into());
    };

    Ok(Json(ApiResponse::ok(KeyCountResponse {
        children: snapshot.children(&key),
        key,
        count,
    })))
}
