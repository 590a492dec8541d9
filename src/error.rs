//! Errors raised by store clients

use std::time::Duration;
use thiserror::Error;

/// Failure of a single store interaction
///
/// The façade collapses these into `false` / empty / `0`; the `try_*` methods
/// on [`crate::CacheService`] and the [`crate::StoreClient`] trait hand them out as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store client error: {0}")]
    Client(#[source] redis::RedisError),

    #[error("store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("store replied with an error: {0}")]
    Server(String),
}

impl StoreError {
    /// Whether the connection that produced this error can still be trusted
    pub fn is_connection_error(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Client(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            StoreError::WrongType | StoreError::Server(_) => false,
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        // Replies the store rejected keep their own kind
        if err.code() == Some("WRONGTYPE") {
            StoreError::WrongType
        } else {
            StoreError::Client(err)
        }
    }
}
