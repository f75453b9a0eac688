//! Core traits defined in `tally-core` and implemented by other crates.

pub mod store;

pub use store::CounterStore;
