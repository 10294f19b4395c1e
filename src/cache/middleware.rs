//! The response cache middleware.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    CONTENT_TYPE_JSON, CacheConfig, CacheKey, CachedEntry, KeyFn, MemoryStore, SkipCache, Store,
    StoreError, default_key_fn,
};
use crate::context::Context;
use crate::middleware::{BoxError, Middleware, MiddlewareFuture, Next};
use crate::{Request, Response, StatusCode};

/// Faults raised by [`ResponseCache`]. Each one aborts the request it belongs to.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache lookup for key {key} failed: {source}")]
    Lookup {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("cache write-back for key {key} failed: {source}")]
    WriteBack {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("cache invalidation for key {key} failed: {source}")]
    Invalidate {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Caches response bodies of one content type for a fixed TTL.
///
/// Cheap to clone; clones share the store and configuration.
///
/// Concurrent misses for the same key each run the downstream handler and each
/// write their result back; the last write wins.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn Store>,
    key_fn: KeyFn,
    config: Arc<CacheConfig>,
}

impl ResponseCache {
    /// Mounts `store` under `config`. A missing `key_fn` is replaced with
    /// [`request_uri_md5`](super::request_uri_md5).
    pub fn new(mut config: CacheConfig, store: Arc<dyn Store>) -> Self {
        let key_fn = config.key_fn.get_or_insert_with(default_key_fn).clone();
        Self {
            store,
            key_fn,
            config: Arc::new(config),
        }
    }

    /// An in-memory JSON cache whose entries are deleted once `ttl` has elapsed.
    pub fn json(ttl: Duration) -> Self {
        let config = CacheConfig::new(ttl)
            .with_content_type(CONTENT_TYPE_JSON)
            .with_auto_remove(true);
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The key `request` is cached under.
    pub fn key_for(&self, request: &Request) -> String {
        (self.key_fn)(request)
    }

    /// Deletes the entry for `key` regardless of its freshness.
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.store
            .delete(key)
            .await
            .map_err(|source| CacheError::Invalidate {
                key: key.to_owned(),
                source,
            })?;
        debug!(key, "cache entry invalidated");
        Ok(())
    }

    async fn serve(self, mut ctx: Context, next: Next) -> Result<Response, BoxError> {
        if ctx.extensions().contains::<SkipCache>() {
            return next.run(ctx).await;
        }

        let key = self.key_for(ctx.request());
        ctx.extensions_mut().insert(CacheKey(key.clone()));

        let cached = match self.store.retrieve(&key).await {
            Ok(cached) => cached,
            Err(source) => return Err(CacheError::Lookup { key, source }.into()),
        };

        match cached {
            Some(entry) if entry.is_fresh(self.config.ttl) => {
                debug!(key = %key, "cache hit");
                return Ok(self.hit_response(entry, ctx.request()));
            }
            Some(_) => debug!(key = %key, "cache entry stale"),
            None => debug!(key = %key, "cache miss"),
        }

        let response = next.run(ctx).await?;

        if response.content_type() != Some(self.config.content_type.as_str()) {
            return Ok(response);
        }

        // The framework may reuse the response buffer; keep an independent copy.
        let snapshot = Bytes::copy_from_slice(response.payload());
        if let Err(source) = self.store.store(&key, snapshot).await {
            return Err(CacheError::WriteBack { key, source }.into());
        }
        let written_at = Utc::now();
        debug!(key = %key, bytes = response.payload().len(), "response cached");

        if self.config.auto_remove {
            self.schedule_expiry(key, written_at);
        }

        Ok(response)
    }

    fn hit_response(&self, entry: CachedEntry, request: &Request) -> Response {
        let mut response = Response::new(StatusCode::Ok)
            .content_type_header(self.config.content_type.as_str())
            .body_bytes(entry.into_payload().to_vec());

        if self.config.gzip_enabled && request.accepts_encoding("gzip") {
            response.add_header("Content-Encoding", "gzip");
        }

        response
    }

    /// Spawns a detached task that deletes `key` once its entry has gone stale.
    ///
    /// The task is never awaited or cancelled. After sleeping `ttl` on the
    /// runtime's monotonic clock it re-reads the entry. An entry stamped no
    /// later than `written_at` is the one this task guards and is deleted
    /// whatever the wall clock now says, so a clock stepped backwards cannot
    /// keep it alive. A later stamp means the key was refreshed meanwhile; that
    /// entry is only deleted if the wall clock already finds it stale.
    fn schedule_expiry(&self, key: String, written_at: DateTime<Utc>) {
        let store = Arc::clone(&self.store);
        let ttl = self.config.ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;

            match store.retrieve(&key).await {
                Ok(None) => {}
                Ok(Some(entry)) if entry.created_at() > written_at && entry.is_fresh(ttl) => {
                    debug!(key = %key, "cache entry refreshed, expiry skipped");
                }
                Ok(Some(_)) => match store.delete(&key).await {
                    Ok(()) => debug!(key = %key, "stale cache entry removed"),
                    Err(e) => warn!(key = %key, error = %e, "failed to remove stale cache entry"),
                },
                Err(e) => warn!(key = %key, error = %e, "failed to check cache entry for expiry"),
            }
        });
    }
}

impl Middleware for ResponseCache {
    fn handle(&self, ctx: Context, next: Next) -> MiddlewareFuture {
        Box::pin(self.clone().serve(ctx, next))
    }
}
