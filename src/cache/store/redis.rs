//! Redis-backed store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{Store, StoreConfig, StoreError};
use crate::cache::CachedEntry;

/// Name reported by a freshly created [`RedisStore`].
pub const REDIS_STORE_NAME: &str = "Redis Store";

/// A [`Store`] keeping JSON-encoded entries in Redis.
///
/// Entries are written with a plain `SET`, without a native expiry: stale
/// entries stay in Redis until overwritten, deleted by the cache's deferred
/// expiry, or invalidated.
///
/// Transport and encoding faults are returned as errors, never reported as a
/// missing key. Calls block for as long as the connection does; no timeout is
/// added on top of the client's own.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: Arc<RwLock<StoreConfig>>,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &*self.config.read())
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Wraps an established connection.
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            config: Arc::new(RwLock::new(StoreConfig::new(REDIS_STORE_NAME))),
        }
    }

    /// Connects to the Redis server at `url` (e.g. `"redis://127.0.0.1:6379"`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self::new(connection))
    }
}

fn encode_entry(entry: &CachedEntry) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(entry).map_err(StoreError::Encode)
}

fn decode_entry(raw: &[u8]) -> Result<CachedEntry, StoreError> {
    serde_json::from_slice(raw).map_err(StoreError::Decode)
}

#[async_trait]
impl Store for RedisStore {
    async fn store(&self, key: &str, payload: Bytes) -> Result<(), StoreError> {
        let record = encode_entry(&CachedEntry::new(payload))?;
        let mut conn = self.connection.clone();

        let _: () = conn.set(key, record).await?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<CachedEntry>, StoreError> {
        let mut conn = self.connection.clone();

        // A nil reply is the only "not found" signal.
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        raw.as_deref().map(decode_entry).transpose()
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();

        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    fn config(&self) -> StoreConfig {
        self.config.read().clone()
    }

    fn set_config(&self, config: StoreConfig) {
        *self.config.write() = config;
    }
}
