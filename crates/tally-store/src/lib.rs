//! # tally-store
//!
//! Durable store implementations for Tally counters. Supports three providers:
//!
//! - **memory**: process-local map using [dashmap](https://crates.io/crates/dashmap)
//! - **file**: a single JSON document on the local filesystem, replaced atomically
//! - **redis**: one Redis hash per counter instance
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "memory")]
pub mod memory;
pub mod manager;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use manager::StoreManager;
