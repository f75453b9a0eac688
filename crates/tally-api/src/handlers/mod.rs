//! HTTP and WebSocket handlers.

pub mod counts;
pub mod fallback;
pub mod health;
pub mod increment;
pub mod ws;
