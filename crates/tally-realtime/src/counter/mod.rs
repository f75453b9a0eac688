//! The counter actor and the pieces it owns.

pub mod actor;
pub mod aggregator;
pub mod state;

pub use actor::{Connection, CounterActor, IncrementOutcome, Lifecycle};
pub use aggregator::KeyAggregator;
pub use state::{CountNode, CounterState};
