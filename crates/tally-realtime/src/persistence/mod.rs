//! Write-behind persistence: dirty-key tracking and the debounced flusher.

pub mod dirty;
pub mod scheduler;

pub use dirty::DirtySet;
pub use scheduler::{FlushReport, WriteBehindScheduler};
