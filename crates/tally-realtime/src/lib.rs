//! # tally-realtime
//!
//! The stateful heart of Tally. Provides:
//!
//! - A connection registry with snapshot-on-join and isolated broadcast
//! - The hierarchical key aggregator (region + bits → prefix chain)
//! - The counter actor, which serializes every mutation of one instance
//! - The write-behind scheduler that debounces store writes
//! - Engine-level metrics

pub mod connection;
pub mod counter;
pub mod message;
pub mod metrics;
pub mod persistence;
pub mod server;

pub use connection::registry::ConnectionRegistry;
pub use counter::actor::{CounterActor, Lifecycle};
pub use persistence::scheduler::WriteBehindScheduler;
pub use server::CounterEngine;
