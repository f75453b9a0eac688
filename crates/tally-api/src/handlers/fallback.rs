//! Fallback for unknown routes.

use axum::http::Uri;

use tally_core::error::AppError;

use crate::error::ApiError;

/// Any route not matched above.
pub async fn not_found(uri: Uri) -> ApiError {
    AppError::not_found(format!("No route for {}", uri.path())).into()
}
