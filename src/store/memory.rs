//! In-memory store implementation
//!
//! Mirrors the observable behaviour of a Redis-compatible server for the
//! commands in [`StoreClient`]: lazy expiration, typed values, WRONGTYPE
//! errors and removal of collections once they are emptied.

use super::entry::Entry;
use super::value::Value;
use super::StoreClient;
use crate::error::StoreError;
use async_trait::async_trait;
use siphasher::sip::SipHasher13;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<String, Entry, BuildHasherDefault<SipHasher13>>;

/// The keyspace behind the mutex
struct Keyspace {
    map: StoreMap,
}

impl Keyspace {
    /// Drop `key` if its deadline has passed
    fn evict_expired(&mut self, key: &str) {
        if self.map.get(key).map(Entry::is_expired).unwrap_or(false) {
            self.map.remove(key);
        }
    }

    /// Entry for `key` if present and not expired
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        self.evict_expired(key);
        self.map.get_mut(key)
    }

    /// Entry for `key`, creating it with `init` when absent
    fn live_or_insert(&mut self, key: &str, init: fn() -> Value) -> &mut Entry {
        self.evict_expired(key);
        self.map
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(init()))
    }

    /// Remove `key` if it holds a collection that became empty
    fn drop_if_empty(&mut self, key: &str) {
        if self
            .map
            .get(key)
            .map(|entry| entry.value.is_empty_collection())
            .unwrap_or(false)
        {
            self.map.remove(key);
        }
    }
}

/// In-memory key-value store
///
/// Cheap to clone; clones share the same keyspace.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Keyspace>>,
}

impl MemoryStore {
    /// Create a new memory store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new memory store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            inner: Arc::new(Mutex::new(Keyspace {
                map: HashMap::with_capacity_and_hasher(
                    capacity,
                    BuildHasherDefault::<SipHasher13>::default(),
                ),
            })),
        }
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let ks = self.inner.lock().await;
        ks.map.values().filter(|entry| !entry.is_expired()).count()
    }

    /// Check if the store holds no live key
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every expired entry, returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut ks = self.inner.lock().await;
        let before = ks.map.len();
        ks.map.retain(|_, entry| !entry.is_expired());
        before - ks.map.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve LRANGE indices against a list of `len` elements
fn resolve_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };

    if start > end || start >= len {
        None
    } else {
        Some((start as usize, end as usize))
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut ks = self.inner.lock().await;
        ks.map.insert(key.to_string(), Entry::new(Value::string(value)));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut ks = self.inner.lock().await;
        if ks.live(key).is_some() {
            return Ok(false);
        }
        ks.map.insert(key.to_string(), Entry::new(Value::string(value)));
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut ks = self.inner.lock().await;
        match ks.live(key) {
            Some(entry) => entry
                .value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or(StoreError::WrongType),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut ks = self.inner.lock().await;
        let existed = ks.live(key).is_some();
        ks.map.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut ks = self.inner.lock().await;
        Ok(ks.live(key).is_some())
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool, StoreError> {
        let mut ks = self.inner.lock().await;
        if ttl_seconds <= 0 {
            // A non-positive TTL expires the key right away
            let existed = ks.live(key).is_some();
            ks.map.remove(key);
            return Ok(existed);
        }

        let deadline = Entry::deadline(ttl_seconds).ok_or_else(|| {
            StoreError::Server("ERR invalid expire time in 'expire' command".to_string())
        })?;
        match ks.live(key) {
            Some(entry) => {
                entry.expire_at = Some(deadline);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let mut ks = self.inner.lock().await;
        Ok(ks.live(key).map(|entry| entry.ttl_seconds()).unwrap_or(-2))
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        let mut ks = self.inner.lock().await;
        let set = ks
            .live_or_insert(key, Value::empty_set)
            .value
            .as_set_mut()
            .ok_or(StoreError::WrongType)?;

        let added = members
            .iter()
            .filter(|member| set.insert((*member).clone()))
            .count();
        ks.drop_if_empty(key);
        Ok(added as u64)
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        let mut ks = self.inner.lock().await;
        match ks.live(key) {
            Some(entry) => entry.value.as_set().cloned().ok_or(StoreError::WrongType),
            None => Ok(HashSet::new()),
        }
    }

    async fn list_push(&self, key: &str, values: &[String]) -> Result<u64, StoreError> {
        let mut ks = self.inner.lock().await;
        let list = ks
            .live_or_insert(key, Value::empty_list)
            .value
            .as_list_mut()
            .ok_or(StoreError::WrongType)?;

        list.extend(values.iter().cloned());
        let len = list.len() as u64;
        ks.drop_if_empty(key);
        Ok(len)
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError> {
        let mut ks = self.inner.lock().await;
        let list = match ks.live(key) {
            Some(entry) => entry.value.as_list().ok_or(StoreError::WrongType)?,
            None => return Ok(Vec::new()),
        };

        Ok(match resolve_range(list.len(), start, end) {
            Some((from, to)) => list.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        let mut ks = self.inner.lock().await;
        match ks.live(key) {
            Some(entry) => entry
                .value
                .as_list()
                .map(|list| list.len() as u64)
                .ok_or(StoreError::WrongType),
            None => Ok(0),
        }
    }

    async fn list_pop_tail(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut ks = self.inner.lock().await;
        let popped = match ks.live(key) {
            Some(entry) => entry
                .value
                .as_list_mut()
                .ok_or(StoreError::WrongType)?
                .pop_back(),
            None => return Ok(None),
        };
        ks.drop_if_empty(key);
        Ok(popped)
    }
}
