//! # rttp-cache
//!
//! Response caching middleware for the rttp async HTTP/1.1 stack.
//!
//! A [`ResponseCache`](cache::ResponseCache) sits in a middleware
//! [`Pipeline`](middleware::Pipeline) and memoizes response bodies of one
//! content type for a bounded TTL, keyed by a function of the request, in an
//! in-process map or in Redis.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//! use rttp_cache::cache::{CacheConfig, MemoryStore, ResponseCache};
//! use rttp_cache::middleware::Pipeline;
//! use rttp_cache::server::Server;
//! use rttp_cache::{Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = ResponseCache::new(
//!         CacheConfig::new(Duration::from_secs(300)),
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     let pipeline = Pipeline::builder().with(cache).handler(|_ctx| async {
//!         Response::new(StatusCode::Ok)
//!             .json(&serde_json::json!({ "name": "test" }))
//!             .unwrap_or_default()
//!     });
//!
//!     Server::bind("127.0.0.1:8080").await?.serve(pipeline).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheConfig, ResponseCache};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use middleware::Pipeline;
pub use server::{Server, ServerError};
