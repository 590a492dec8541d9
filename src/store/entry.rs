//! Entry structure for the memory store

use super::value::Value;
use tokio::time::{Duration, Instant};

/// Longest TTL a key can get, in seconds (deadlines are kept in milliseconds server side)
pub const MAX_TTL_SECONDS: i64 = i64::MAX / 1000;

/// A value together with its expiration deadline
///
/// Deadlines use tokio's clock so paused-time tests can drive expiry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The value
    pub value: Value,

    /// Optional expiration time (absolute)
    pub expire_at: Option<Instant>,
}

impl Entry {
    /// Create a new entry without expiration
    pub fn new(value: Value) -> Self {
        Entry {
            value,
            expire_at: None,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        match self.expire_at {
            Some(expire_at) => Instant::now() >= expire_at,
            None => false,
        }
    }

    /// Deadline `ttl_seconds` from now, `None` when it is not a positive TTL
    /// or does not fit the clock
    pub fn deadline(ttl_seconds: i64) -> Option<Instant> {
        if !(1..=MAX_TTL_SECONDS).contains(&ttl_seconds) {
            return None;
        }
        Instant::now().checked_add(Duration::from_secs(ttl_seconds as u64))
    }

    /// Remaining TTL in whole seconds, rounded up, or -1 without expiration
    pub fn ttl_seconds(&self) -> i64 {
        match self.expire_at {
            Some(expire_at) => {
                let left = expire_at.saturating_duration_since(Instant::now());
                let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                secs as i64
            }
            None => -1,
        }
    }
}
