//! Remote store client
//!
//! [`RespStore`] implements [`StoreClient`] on a `redis` [`ConnectionManager`],
//! which multiplexes commands over one connection and reconnects after I/O
//! errors. The manager is opened on first use; a command that times out drops
//! it so the next one starts from a fresh connection.

use crate::config::CacheConfig;
use crate::error::StoreError;
use crate::store::StoreClient;
use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, FromRedisValue};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Shared {
    client: Client,
    url: String,
    connect_timeout: Duration,
    command_timeout: Duration,
    manager: Mutex<Option<ConnectionManager>>,
}

/// Store client for a Redis-compatible server
///
/// Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct RespStore {
    shared: Arc<Shared>,
}

impl RespStore {
    /// Client that connects on its first command
    pub fn new(config: &CacheConfig) -> Result<Self, StoreError> {
        let url = config.url();
        let client = Client::open(url.as_str())?;

        Ok(RespStore {
            shared: Arc::new(Shared {
                client,
                url,
                connect_timeout: config.connect_timeout(),
                command_timeout: config.command_timeout(),
                manager: Mutex::new(None),
            }),
        })
    }

    /// Client that connects right away, so a bad address fails at startup
    pub async fn connect(config: &CacheConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let store = Self::new(config)
            .with_context(|| format!("invalid cache store address {}", config.address))?;
        store
            .manager()
            .await
            .with_context(|| format!("connecting to cache store at {}", config.address))?;

        info!("Cache store client ready on {}", store.url());
        Ok(store)
    }

    /// URL this client talks to
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// The shared connection manager, opened if needed
    async fn manager(&self) -> Result<ConnectionManager, StoreError> {
        let mut slot = self.shared.manager.lock().await;
        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }

        let timeout = self.shared.connect_timeout;
        let manager = tokio::time::timeout(timeout, ConnectionManager::new(self.shared.client.clone()))
            .await
            .map_err(|_| StoreError::Timeout(timeout))??;

        debug!("Connected to store at {}", self.shared.url);
        *slot = Some(manager.clone());
        Ok(manager)
    }

    /// Run one command within the command timeout
    async fn query<T>(&self, cmd: &Cmd) -> Result<T, StoreError>
    where
        T: FromRedisValue + Send,
    {
        let mut manager = self.manager().await?;
        let timeout = self.shared.command_timeout;

        match tokio::time::timeout(timeout, cmd.query_async(&mut manager)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                warn!(
                    "Store at {} did not answer within {:?}, dropping the connection",
                    self.shared.url, timeout
                );
                self.shared.manager.lock().await.take();
                Err(StoreError::Timeout(timeout))
            }
        }
    }
}

/// `name key`, the start of every command sent
fn command(name: &str, key: &str) -> Cmd {
    debug!("{} {}", name, key);
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}

#[async_trait]
impl StoreClient for RespStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.query(command("SET", key).arg(value)).await
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        // Nil when the key was already there
        let reply: Option<String> = self.query(command("SET", key).arg(value).arg("NX")).await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.query(&command("GET", key)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed: i64 = self.query(&command("DEL", key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.query(&command("EXISTS", key)).await
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<bool, StoreError> {
        self.query(command("EXPIRE", key).arg(ttl_seconds)).await
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        self.query(&command("TTL", key)).await
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        let mut cmd = command("SADD", key);
        for member in members {
            cmd.arg(member);
        }
        self.query(&cmd).await
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        self.query(&command("SMEMBERS", key)).await
    }

    async fn list_push(&self, key: &str, values: &[String]) -> Result<u64, StoreError> {
        let mut cmd = command("RPUSH", key);
        for value in values {
            cmd.arg(value);
        }
        self.query(&cmd).await
    }

    async fn list_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>, StoreError> {
        self.query(command("LRANGE", key).arg(start).arg(end)).await
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        self.query(&command("LLEN", key)).await
    }

    async fn list_pop_tail(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.query(&command("RPOP", key)).await
    }
}
