//! Storage backends for cached response bodies.
//!
//! [`Store`] is the only contract the response cache needs from where bytes
//! physically live. Two backends ship with the crate:
//!
//! | Backend          | Medium                    | Default name        |
//! |------------------|---------------------------|---------------------|
//! | [`MemoryStore`]  | in-process `HashMap`      | `"In-Memory Store"` |
//! | [`RedisStore`]   | Redis, JSON-encoded entry | `"Redis Store"`     |
//!
//! Neither backend expires entries on its own; freshness is decided by the
//! reader against the cache TTL.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::CachedEntry;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Descriptive metadata about a mounted backend. Has no behavioral effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub name: String,
}

impl StoreConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Backend faults. A missing key is not one of them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode cache entry: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode cache entry: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Persists and retrieves opaque byte payloads by key.
///
/// Implementations must tolerate concurrent calls from many request tasks
/// without corrupting their state. No atomicity is promised across separate
/// calls: an entry read by one task may be deleted by another a moment later.
#[async_trait]
pub trait Store: Send + Sync {
    /// Writes `payload` under `key`, stamping the current time and replacing
    /// any existing entry.
    async fn store(&self, key: &str, payload: Bytes) -> Result<(), StoreError>;

    /// Reads the entry under `key`. `Ok(None)` means the key is absent.
    async fn retrieve(&self, key: &str) -> Result<Option<CachedEntry>, StoreError>;

    /// Removes the entry under `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    fn config(&self) -> StoreConfig;

    fn set_config(&self, config: StoreConfig);
}
