//! Response caching layer.
//!
//! [`ResponseCache`] is a [`Middleware`](crate::middleware::Middleware) that
//! memoizes the bodies of responses carrying a configured content type, for a
//! bounded TTL, in a swappable [`Store`].
//!
//! Per request it walks a small state machine:
//!
//! 1. If an upstream layer inserted [`SkipCache`], pass the request through untouched.
//! 2. Compute the key with the configured [`KeyFn`] and record it as [`CacheKey`].
//! 3. Look the key up. A backend fault fails the request.
//! 4. Fresh hit: answer `200 OK` with the cached body; downstream never runs.
//! 5. Miss or stale entry: run the rest of the pipeline.
//! 6. If the response's `Content-Type` equals the configured one exactly, snapshot
//!    the body and write it back, then, with `auto_remove`, schedule a detached
//!    task that deletes the entry once it has gone stale.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use rttp_cache::cache::{CacheConfig, MemoryStore, ResponseCache};
//! use rttp_cache::middleware::Pipeline;
//! use rttp_cache::{Response, StatusCode};
//!
//! let cache = ResponseCache::new(
//!     CacheConfig::new(Duration::from_secs(300)),
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! let pipeline = Pipeline::builder().with(cache).handler(|_ctx| async {
//!     Response::new(StatusCode::Ok)
//!         .json(&serde_json::json!({ "name": "test" }))
//!         .unwrap_or_default()
//! });
//! ```

pub mod config;
pub mod entry;
pub mod key;
pub mod middleware;
pub mod store;

pub use config::{CacheConfig, DEFAULT_TTL};
pub use entry::CachedEntry;
pub use key::{KeyFn, default_key_fn, request_uri_md5, request_uri_sha1};
pub use middleware::{CacheError, ResponseCache};
pub use store::{MemoryStore, RedisStore, Store, StoreConfig, StoreError};

/// The JSON media type, as written by [`Response::json`](crate::Response::json).
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Context extension holding the cache key computed for the current request.
///
/// Inserted by [`ResponseCache`] before the lookup; downstream handlers can
/// read it to invalidate or correlate the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(pub String);

/// Context extension that makes [`ResponseCache`] ignore the request.
///
/// Insert it from a layer registered before the cache; the cache then neither
/// reads nor writes the store for that request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipCache;
