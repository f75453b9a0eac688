//! Integration tests for the Tally HTTP and WebSocket surface.

mod helpers;

mod counts_test;
mod health_test;
mod increment_test;
mod ws_test;
