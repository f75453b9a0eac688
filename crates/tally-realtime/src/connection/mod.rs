//! Client connection management — handles and the per-instance registry.

pub mod handle;
pub mod registry;

pub use handle::{ConnectionHandle, ConnectionInfo, SendFailure};
pub use registry::{BroadcastReport, ConnectionRegistry};
