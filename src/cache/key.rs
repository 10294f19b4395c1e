//! Cache key suppliers.
//!
//! A key supplier maps a request to the string its cached response is stored
//! under. It must be deterministic for semantically identical requests; any
//! `Fn(&Request) -> String` qualifies, so callers can fold in query
//! parameters, headers, or an authenticated identity.

use std::sync::Arc;

use md5::{Digest, Md5};
use sha1::Sha1;

use crate::Request;

/// A shared, type-erased key supplier.
pub type KeyFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Lowercase hex MD5 digest of the request URI (path plus query string).
///
/// This is the supplier used when a [`CacheConfig`](super::CacheConfig) does
/// not name one.
pub fn request_uri_md5(request: &Request) -> String {
    hex::encode(Md5::digest(request.uri().as_bytes()))
}

/// Lowercase hex SHA-1 digest of the request URI (path plus query string).
pub fn request_uri_sha1(request: &Request) -> String {
    hex::encode(Sha1::digest(request.uri().as_bytes()))
}

/// The supplier substituted for a missing `key_fn`.
pub fn default_key_fn() -> KeyFn {
    Arc::new(request_uri_md5)
}
