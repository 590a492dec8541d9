//! Store client capability
//!
//! The command set the cache façade consumes, plus an in-process implementation
//! of it. The remote implementation lives in [`crate::client`].

mod entry;
mod value;
mod memory;

pub use entry::Entry;
pub use value::Value;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Commands a key-value store must offer to back the façade
///
/// Each method is one store command and is expected to be atomic at the store.
/// Nothing is assumed about atomicity across calls.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// SET key value (clears any TTL)
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// SET key value NX, returns whether the write happened
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// GET key
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// DEL key, returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// EXISTS key
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// EXPIRE key seconds, returns whether the key existed
    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool, StoreError>;

    /// TTL key: seconds left, -1 without expiration, -2 when missing
    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;

    /// SADD key member..., returns the number of new members
    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64, StoreError>;

    /// SMEMBERS key
    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError>;

    /// RPUSH key value..., returns the new length
    async fn list_push(&self, key: &str, values: &[String]) -> Result<u64, StoreError>;

    /// LRANGE key start end (inclusive, negative indices count from the tail)
    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError>;

    /// LLEN key
    async fn list_len(&self, key: &str) -> Result<u64, StoreError>;

    /// RPOP key
    async fn list_pop_tail(&self, key: &str) -> Result<Option<String>, StoreError>;
}
