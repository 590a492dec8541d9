//! Cache façade
//!
//! Typed value, set and list operations over a [`StoreClient`]. Every operation
//! maps to one or two store commands; failures are logged and reported as
//! `false`, empty or `0` so callers never handle store errors themselves.
//! `lookup`, `try_contains_key` and `try_size` keep "absent" and "failed" apart
//! for callers that need to know.

use crate::config::CacheConfig;
use crate::error::StoreError;
use crate::retry::RetryPolicy;
use crate::store::StoreClient;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// TTL applied by [`CacheService::set_exclusive`] unless configured otherwise
pub const DEFAULT_LOCK_TTL_SECONDS: i64 = 9;

/// TTL value meaning "do not expire"
const NO_EXPIRE: i64 = -1;

/// Stateless façade over a shared store client
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn StoreClient>,
    retry: RetryPolicy,
    lock_ttl_seconds: i64,
}

impl CacheService {
    /// Façade with the default retry policy and lock TTL
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        CacheService {
            store,
            retry: RetryPolicy::default(),
            lock_ttl_seconds: DEFAULT_LOCK_TTL_SECONDS,
        }
    }

    /// Façade using the lock settings of `config`
    pub fn with_config(store: Arc<dyn StoreClient>, config: &CacheConfig) -> Self {
        CacheService {
            store,
            retry: config.lock.retry_policy(),
            lock_ttl_seconds: config.lock.ttl_seconds,
        }
    }

    /// Replace the retry policy of the exclusive set
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying store client
    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// Retry policy used by [`set_exclusive`](Self::set_exclusive)
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    // ---------------------------------------------------------------
    // Scalar values
    // ---------------------------------------------------------------

    /// Write `value` and, when `ttl_seconds > 0`, expire it after that many seconds.
    ///
    /// True only if the write and the requested TTL both went through.
    pub async fn set_with_expire(&self, key: &str, value: impl ToString, ttl_seconds: i64) -> bool {
        let value = value.to_string();
        match self.write_value(key, &value, ttl_seconds).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Cache [{}] written but gone before its TTL was applied", key);
                false
            }
            Err(e) => {
                error!("Failed to cache [{}], value [{}]: {}", key, value, e);
                false
            }
        }
    }

    /// Write `value` without expiration
    pub async fn cache_value(&self, key: &str, value: impl ToString) -> bool {
        self.set_with_expire(key, value, NO_EXPIRE).await
    }

    async fn write_value(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<bool, StoreError> {
        self.store.set(key, value).await?;
        if ttl_seconds > 0 {
            return self.store.expire(key, ttl_seconds).await;
        }
        Ok(true)
    }

    /// [`set_exclusive_with_expire`](Self::set_exclusive_with_expire) with the
    /// configured retry policy and lock TTL
    pub async fn set_exclusive(&self, key: &str, value: impl ToString) -> bool {
        self.write_exclusive(key, value.to_string(), self.retry, self.lock_ttl_seconds)
            .await
    }

    /// First writer wins: write `value` only if `key` is absent.
    ///
    /// While another holder owns the key the same conditional write is retried
    /// up to `retry_count` times, waiting the policy interval between attempts
    /// (`retry_count <= 0` means
    /// [`DEFAULT_MAX_RETRIES`](crate::retry::DEFAULT_MAX_RETRIES)). The winner's
    /// key gets a TTL of `ttl_seconds` when positive. There is no ownership
    /// token and the TTL may run out while the winner still relies on the key.
    pub async fn set_exclusive_with_expire(
        &self,
        key: &str,
        value: impl ToString,
        retry_count: i32,
        ttl_seconds: i64,
    ) -> bool {
        let policy = self.retry.with_retries(retry_count);
        self.write_exclusive(key, value.to_string(), policy, ttl_seconds)
            .await
    }

    async fn write_exclusive(
        &self,
        key: &str,
        value: String,
        policy: RetryPolicy,
        ttl_seconds: i64,
    ) -> bool {
        let store = &self.store;
        let candidate = value.as_str();

        let won = match policy.poll(move || store.set_if_absent(key, candidate)).await {
            Ok(won) => won,
            Err(e) => {
                error!("Exclusive set of [{}] failed, value [{}]: {}", key, value, e);
                return false;
            }
        };

        if !won {
            debug!("[{}] still held after {} attempts", key, policy.attempts());
            return false;
        }
        if ttl_seconds <= 0 {
            return true;
        }

        match store.expire(key, ttl_seconds).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Exclusive key [{}] vanished before its TTL was applied", key);
                false
            }
            Err(e) => {
                error!("Failed to expire exclusive key [{}]: {}", key, e);
                // Do not leave a key without TTL behind
                if let Err(e) = store.delete(key).await {
                    warn!("Could not release exclusive key [{}]: {}", key, e);
                }
                false
            }
        }
    }

    /// Whether `key` exists; also `false` when the store could not be asked
    pub async fn contains_key(&self, key: &str) -> bool {
        self.try_contains_key(key).await.unwrap_or_else(|e| {
            error!("Failed to check cache [{}]: {}", key, e);
            false
        })
    }

    /// Whether `key` exists, keeping store failures apart from absence
    pub async fn try_contains_key(&self, key: &str) -> Result<bool, StoreError> {
        self.store.exists(key).await
    }

    /// Scalar value of `key`; `None` when missing or when the store failed
    pub async fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).await.unwrap_or_else(|e| {
            error!("Failed to read cache [{}]: {}", key, e);
            None
        })
    }

    /// Scalar value of `key`, keeping store failures apart from absence
    pub async fn lookup(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store.get(key).await
    }

    /// Delete `key` whatever it holds; deleting a missing key succeeds
    pub async fn remove(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to remove cache [{}]: {}", key, e);
                false
            }
        }
    }

    // ---------------------------------------------------------------
    // Sets
    // ---------------------------------------------------------------

    /// Add one member to the set at `key`
    pub async fn append_to_set(&self, key: &str, value: impl ToString, ttl_seconds: i64) -> bool {
        self.append_all_to_set(key, [value.to_string()], ttl_seconds).await
    }

    /// Add every member of `values` to the set at `key` (union)
    pub async fn append_all_to_set<I>(&self, key: &str, values: I, ttl_seconds: i64) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let members: Vec<String> = values.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return true;
        }

        let result = async {
            self.store.set_add(key, &members).await?;
            self.apply_ttl(key, ttl_seconds).await
        };
        match result.await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to cache set [{}], values {:?}: {}", key, members, e);
                false
            }
        }
    }

    /// Add one member to the set at `key`, without expiration
    pub async fn cache_set(&self, key: &str, value: impl ToString) -> bool {
        self.append_to_set(key, value, NO_EXPIRE).await
    }

    /// Add every member of `values` to the set at `key`, without expiration
    pub async fn cache_all_set<I>(&self, key: &str, values: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.append_all_to_set(key, values, NO_EXPIRE).await
    }

    /// Members of the set at `key`; empty when missing or on failure
    pub async fn get_set(&self, key: &str) -> HashSet<String> {
        self.store.set_members(key).await.unwrap_or_else(|e| {
            error!("Failed to read set cache [{}]: {}", key, e);
            HashSet::new()
        })
    }

    // ---------------------------------------------------------------
    // Lists
    // ---------------------------------------------------------------

    /// Push one value at the tail of the list at `key`
    pub async fn append_to_list(&self, key: &str, value: impl ToString, ttl_seconds: i64) -> bool {
        self.append_all_to_list(key, [value.to_string()], ttl_seconds).await
    }

    /// Push `values`, in order, at the tail of the list at `key`
    pub async fn append_all_to_list<I>(&self, key: &str, values: I, ttl_seconds: i64) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let items: Vec<String> = values.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return true;
        }

        let result = async {
            self.store.list_push(key, &items).await?;
            self.apply_ttl(key, ttl_seconds).await
        };
        match result.await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to cache list [{}], values {:?}: {}", key, items, e);
                false
            }
        }
    }

    /// Push one value at the tail of the list at `key`, without expiration
    pub async fn cache_list(&self, key: &str, value: impl ToString) -> bool {
        self.append_to_list(key, value, NO_EXPIRE).await
    }

    /// Push `values`, in order, at the tail of the list at `key`, without expiration
    pub async fn cache_all_list<I>(&self, key: &str, values: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.append_all_to_list(key, values, NO_EXPIRE).await
    }

    /// Elements `start..=end` of the list at `key`; negative indices count from
    /// the tail. Empty when missing or on failure.
    pub async fn get_range(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        self.store.list_range(key, start, end).await.unwrap_or_else(|e| {
            error!("Failed to read list cache [{}]: {}", key, e);
            Vec::new()
        })
    }

    /// Length of the list at `key`; `0` when missing, empty, or on failure
    pub async fn size(&self, key: &str) -> u64 {
        self.try_size(key).await.unwrap_or_else(|e| {
            error!("Failed to read list length of [{}]: {}", key, e);
            0
        })
    }

    /// Length of the list at `key`, keeping store failures apart from absence
    pub async fn try_size(&self, key: &str) -> Result<u64, StoreError> {
        self.store.list_len(key).await
    }

    /// Drop the last element of the list at `key`.
    ///
    /// True when the command ran, even if the list was already empty.
    pub async fn pop_tail(&self, key: &str) -> bool {
        match self.store.list_pop_tail(key).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to pop list cache [{}]: {}", key, e);
                false
            }
        }
    }

    async fn apply_ttl(&self, key: &str, ttl_seconds: i64) -> Result<(), StoreError> {
        if ttl_seconds > 0 {
            self.store.expire(key, ttl_seconds).await?;
        }
        Ok(())
    }
}
