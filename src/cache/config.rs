//! Response cache configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{CONTENT_TYPE_JSON, KeyFn};
use crate::Request;

/// TTL used by [`CacheConfig::default`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Settings for a [`ResponseCache`](super::ResponseCache).
///
/// Supplied once at construction and immutable afterwards.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::cache::{CacheConfig, request_uri_sha1};
///
/// let config = CacheConfig::new(Duration::from_secs(30))
///     .with_auto_remove(true)
///     .with_content_type("text/html; charset=utf-8")
///     .with_key_fn(request_uri_sha1);
///
/// assert!(config.auto_remove);
/// assert!(config.key_fn.is_some());
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    /// Spawn a deferred task per write that deletes the entry once stale.
    pub auto_remove: bool,
    /// Replay `Content-Encoding: gzip` on hits for clients that accept it.
    ///
    /// Enable only when the pipeline below the cache emits gzip bodies for
    /// cacheable responses; the cache itself never compresses.
    pub gzip_enabled: bool,
    /// Length of the freshness window.
    pub ttl: Duration,
    /// The only `Content-Type` whose responses are cached (exact match).
    pub content_type: String,
    /// Key supplier; `None` falls back to [`request_uri_md5`](super::request_uri_md5).
    pub key_fn: Option<KeyFn>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            auto_remove: false,
            gzip_enabled: false,
            ttl: DEFAULT_TTL,
            content_type: CONTENT_TYPE_JSON.to_string(),
            key_fn: None,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with the given TTL and defaults elsewhere.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    pub fn with_auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = auto_remove;
        self
    }

    pub fn with_gzip(mut self, gzip_enabled: bool) -> Self {
        self.gzip_enabled = gzip_enabled;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("auto_remove", &self.auto_remove)
            .field("gzip_enabled", &self.gzip_enabled)
            .field("ttl", &self.ttl)
            .field("content_type", &self.content_type)
            .field("key_fn", &self.key_fn.as_ref().map_or("<default>", |_| "<custom>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert!(!config.auto_remove);
        assert!(!config.gzip_enabled);
        assert_eq!(config.ttl, DEFAULT_TTL);
        assert_eq!(config.content_type, CONTENT_TYPE_JSON);
        assert!(config.key_fn.is_none());
    }

    #[test]
    fn debug_hides_key_fn() {
        let config = CacheConfig::new(Duration::from_secs(1)).with_key_fn(|r| r.path().to_owned());
        let rendered = format!("{config:?}");
        assert!(rendered.contains("key_fn: \"<custom>\""));
    }
}
