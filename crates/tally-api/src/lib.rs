//! # tally-api
//!
//! HTTP layer for Tally built on Axum.
//!
//! Routes the WebSocket `/connect` upgrade and `POST /increment` to the
//! counter actor, exposes health and count views under `/api`, and maps
//! [`AppError`](tally_core::error::AppError) kinds to HTTP responses.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
