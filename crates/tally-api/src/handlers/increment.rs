//! Out-of-band increment over HTTP.

use axum::Json;
use axum::body::Bytes;

use tally_core::error::AppError;
use tally_core::types::Classification;

use crate::dto::response::{ApiResponse, IncrementResponse};
use crate::error::ApiError;
use crate::extractors::{ClientClassification, CounterInstance};

/// POST /increment
///
/// The classification is taken from a JSON body (`{"region": "DE",
/// "bits": [0, 1]}`) when one is sent, otherwise from the request's
/// connection metadata.
pub async fn increment(
    CounterInstance(actor): CounterInstance,
    ClientClassification(from_metadata): ClientClassification,
    body: Bytes,
) -> Result<Json<ApiResponse<IncrementResponse>>, ApiError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let parsed: Classification = serde_json::from_slice(&body)
            .map_err(|e| AppError::validation(format!("Invalid classification body: {e}")))?;
        Some(parsed)
    };

    let classification = from_body.or(from_metadata);
    let outcome = actor.on_increment(classification.as_ref()).await?;

    Ok(Json(ApiResponse::ok(IncrementResponse {
        updated: outcome.updated,
        delivered: outcome.delivered,
    })))
}
