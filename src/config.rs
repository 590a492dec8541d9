//! Cache configuration
//!
//! Every field has a default so a partial JSON document (or none at all)
//! yields a usable configuration. Environment variables override the file.

use crate::retry::{RetryPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_RETRIES};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "FERRUM_CACHE_";

/// Settings of the exclusive set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Retries after the first conditional write of `set_exclusive`
    pub max_retries: u32,
    /// Wait between attempts, in milliseconds
    pub interval_ms: u64,
    /// Upper bound of the random extra wait, in milliseconds
    pub jitter_ms: u64,
    /// TTL applied to a won key, in seconds
    pub ttl_seconds: i64,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            jitter_ms: 0,
            ttl_seconds: 9,
        }
    }
}

impl LockConfig {
    /// Retry policy described by these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            interval: Duration::from_millis(self.interval_ms),
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

/// Configuration of the cache façade and its remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Address of the store, `host:port` or a full `redis://` URL
    pub address: String,
    /// TCP connect timeout, in milliseconds
    pub connect_timeout_ms: u64,
    /// Timeout of one command round trip, in milliseconds
    pub command_timeout_ms: u64,
    /// Exclusive set settings
    pub lock: LockConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            address: "127.0.0.1:6379".to_string(),
            connect_timeout_ms: 1000,
            command_timeout_ms: 1000,
            lock: LockConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Load a JSON configuration file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading cache config {}", path.display()))?;
        let mut config: CacheConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing cache config {}", path.display()))?;

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        debug!("Loaded cache config from {}", path.display());
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = CacheConfig::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FERRUM_CACHE_*` overrides found through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}{}", ENV_PREFIX, suffix);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, value)) = var("ADDRESS") {
            self.address = value;
        }
        if let Some((name, value)) = var("CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = parse_var(&name, &value)?;
        }
        if let Some((name, value)) = var("COMMAND_TIMEOUT_MS") {
            self.command_timeout_ms = parse_var(&name, &value)?;
        }
        if let Some((name, value)) = var("LOCK_RETRIES") {
            self.lock.max_retries = parse_var(&name, &value)?;
        }
        if let Some((name, value)) = var("LOCK_INTERVAL_MS") {
            self.lock.interval_ms = parse_var(&name, &value)?;
        }
        if let Some((name, value)) = var("LOCK_JITTER_MS") {
            self.lock.jitter_ms = parse_var(&name, &value)?;
        }
        if let Some((name, value)) = var("LOCK_TTL_SECONDS") {
            self.lock.ttl_seconds = parse_var(&name, &value)?;
        }
        Ok(())
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.address.trim().is_empty() {
            bail!("cache address must not be empty");
        }
        if self.connect_timeout_ms == 0 || self.command_timeout_ms == 0 {
            bail!("cache timeouts must be greater than zero");
        }
        Ok(())
    }

    /// Connection URL handed to the `redis` client
    pub fn url(&self) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("redis://{}", self.address)
        }
    }

    /// Timeout of opening the store connection
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Timeout of one command
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn parse_var<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", name, value))
}
