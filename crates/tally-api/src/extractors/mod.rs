//! Custom Axum extractors.

pub mod classification;
pub mod instance;

pub use classification::ClientClassification;
pub use instance::CounterInstance;
