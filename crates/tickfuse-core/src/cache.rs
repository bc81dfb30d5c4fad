//! Cache port consulted by the orchestrator, plus an in-memory implementation.
//!
//! Payloads travel through the port as JSON strings. The orchestrator treats
//! every [`CacheError`] as a miss, so implementations backed by a remote
//! store may fail freely.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// How a single aggregation request interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read a fresh entry if present, otherwise fetch and write. (Default)
    #[default]
    Use,
    /// Skip the read, always fetch, then write the new payload.
    Refresh,
    /// Neither read nor write.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

/// Transport-level cache failure. Never surfaced to aggregation callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache {operation} failed: {message}")]
pub struct CacheError {
    operation: &'static str,
    message: String,
}

impl CacheError {
    pub fn read(message: impl Into<String>) -> Self {
        Self {
            operation: "read",
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self {
            operation: "write",
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Key/value store abstraction. An absent key is `Ok(None)`, never an error.
pub trait CachePort: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

    fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> CacheFuture<'a, ()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    enabled: bool,
}

impl CacheInner {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.body.clone())
            } else {
                None
            }
        })
    }

    /// Writes drop expired entries first, so the map never outgrows the
    /// set of keys still fresh. A TTL past the clock's range is not stored.
    fn put(&mut self, key: String, body: String, ttl: Duration) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
        let Some(expires_at) = now.checked_add(ttl) else {
            return;
        };
        self.map.insert(key, CacheEntry { body, expires_at });
    }
}

/// Thread-safe in-memory TTL cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<CacheInner>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Store that never retains anything; every read is a miss.
    pub fn disabled() -> Self {
        Self::build(false)
    }

    fn build(enabled: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                map: HashMap::new(),
                enabled,
            })),
        }
    }

    /// Fresh value for `key`, if any.
    pub async fn lookup(&self, key: &str) -> Option<String> {
        self.inner.read().await.get(key)
    }

    /// Stores `body` for `ttl`. A zero TTL or a disabled store is a no-op.
    pub async fn put(&self, key: impl Into<String>, body: impl Into<String>, ttl: Duration) {
        let mut store = self.inner.write().await;
        if !store.enabled || ttl.is_zero() {
            return;
        }
        store.put(key.into(), body.into(), ttl);
    }

    /// Remove expired entries.
    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner
            .write()
            .await
            .map
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries, including expired ones not yet swept by a write.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_disabled(&self) -> bool {
        !self.inner.read().await.enabled
    }
}

impl CachePort for CacheStore {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.lookup(key).await) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            self.put(key, value, ttl).await;
            Ok(())
        })
    }
}
