//! ferrum-cache - cache façade over a Redis-compatible key-value store
//!
//! - `store`: the client capability the façade needs, plus an in-memory implementation
//! - `client`: the same capability against a remote store, through the `redis` crate
//! - `service`: the façade itself, which only sees the capability

pub mod store;
pub mod client;
pub mod service;
pub mod retry;
pub mod config;
pub mod error;
pub mod logging;

#[cfg(test)]
mod protocol;

/// Re-export commonly used types
pub use store::{MemoryStore, StoreClient};
pub use client::RespStore;
pub use service::CacheService;
pub use retry::RetryPolicy;
pub use config::{CacheConfig, LockConfig};
pub use error::StoreError;
