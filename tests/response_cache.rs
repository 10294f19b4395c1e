//! End-to-end: a real TCP server with the response cache in its pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use rttp_cache::cache::{
    CONTENT_TYPE_JSON, CacheConfig, CachedEntry, MemoryStore, RedisStore, ResponseCache, Store,
    StoreConfig, StoreError,
};
use rttp_cache::middleware::{LoggerMiddleware, Pipeline};
use rttp_cache::{Response, Server, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const SLEEP_TIME: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Dummy {
    name: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn cache_config() -> CacheConfig {
    CacheConfig::new(Duration::from_secs(5 * 60))
        .with_content_type(CONTENT_TYPE_JSON)
        .with_auto_remove(false)
        .with_gzip(false)
}

async fn spawn_server(store: Arc<dyn Store>) -> SocketAddr {
    init_tracing();

    let pipeline = Pipeline::builder()
        .with(LoggerMiddleware)
        .with(ResponseCache::new(cache_config(), store))
        .handler(|_ctx| async {
            tokio::time::sleep(SLEEP_TIME).await;
            Response::new(StatusCode::Ok)
                .json(&Dummy {
                    name: "test".to_owned(),
                })
                .unwrap_or_default()
        });

    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.serve(pipeline));
    addr
}

/// Sends `GET path` with `Connection: close` and returns `(status line, headers, body)`.
async fn get(addr: SocketAddr, path: &str) -> (String, String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header terminator");
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let body = raw[split + 4..].to_vec();
    let (status, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
    (status.to_owned(), headers.to_owned(), body)
}

async fn assert_second_request_is_cached(addr: SocketAddr) {
    let start = Instant::now();
    let (status, headers, first) = get(addr, "/json").await;
    assert!(start.elapsed() >= SLEEP_TIME);
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("Content-Type: application/json"));
    let dummy: Dummy = serde_json::from_slice(&first).unwrap();
    assert_eq!(dummy.name, "test");

    let start = Instant::now();
    let (status, headers, second) = get(addr, "/json").await;
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("Content-Type: application/json"));
    assert_eq!(second, first);
}

#[tokio::test]
async fn memory_store_serves_repeat_request_from_cache() {
    let store = Arc::new(MemoryStore::new());
    let addr = spawn_server(store.clone()).await;

    assert_second_request_is_cached(addr).await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn pipelined_requests_in_one_write_are_all_answered() {
    let store = Arc::new(MemoryStore::new());
    let addr = spawn_server(store.clone()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let requests = format!(
        "GET /json HTTP/1.1\r\nHost: {addr}\r\n\r\n\
         GET /json HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(requests.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(SLEEP_TIME * 3, stream.read_to_end(&mut raw))
        .await
        .expect("both responses arrive before the connection closes")
        .unwrap();

    let text = String::from_utf8(raw).unwrap();
    assert_eq!(text.matches("HTTP/1.1 200 OK\r\n").count(), 2);
    assert_eq!(text.matches(r#"{"name":"test"}"#).count(), 2);
    assert!(text.contains("Connection: close\r\n"));
    assert_eq!(store.len(), 1);
}

struct UnreachableStore;

#[async_trait]
impl Store for UnreachableStore {
    async fn store(&self, _key: &str, _payload: Bytes) -> Result<(), StoreError> {
        Err(StoreError::Other("backend unreachable".into()))
    }

    async fn retrieve(&self, _key: &str) -> Result<Option<CachedEntry>, StoreError> {
        Err(StoreError::Other("backend unreachable".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Other("backend unreachable".into()))
    }

    fn config(&self) -> StoreConfig {
        StoreConfig::new("unreachable")
    }

    fn set_config(&self, _config: StoreConfig) {}
}

#[tokio::test]
async fn backend_fault_answers_500_without_running_the_handler() {
    let addr = spawn_server(Arc::new(UnreachableStore)).await;

    let start = Instant::now();
    let (status, _headers, body) = get(addr, "/json").await;
    assert!(start.elapsed() < SLEEP_TIME);
    assert_eq!(status, "HTTP/1.1 500 Internal Server Error");
    assert_eq!(body, b"Internal Server Error");
}

#[tokio::test]
#[ignore = "Requires running Redis instance"]
async fn redis_store_serves_repeat_request_from_cache() {
    let store = RedisStore::connect("redis://127.0.0.1:6379").await.unwrap();
    let key = rttp_cache::cache::request_uri_md5(
        &rttp_cache::Request::parse(b"GET /json HTTP/1.1\r\n\r\n").unwrap().0,
    );
    store.delete(&key).await.unwrap();

    let addr = spawn_server(Arc::new(store.clone())).await;
    assert_second_request_is_cached(addr).await;

    assert!(store.retrieve(&key).await.unwrap().is_some());
    store.delete(&key).await.unwrap();
}
