//! Core type definitions used across the Tally workspace.

pub mod classification;
pub mod id;
pub mod key;

pub use classification::Classification;
pub use id::ConnectionId;
pub use key::{KEY_SEPARATOR, SCALAR_KEY};
