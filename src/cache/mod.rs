//! Write-through cache in front of the store.
//!
//! Reads go through [`CacheLayer::read_through`]: a hit is served from the
//! cache, a miss loads from the store and writes the result back with a TTL.
//! Writes never update cached values in place; handlers write the store and
//! then call [`CacheLayer::invalidate`] with a pattern covering every key the
//! write could have made stale (`users:*`, `products:*`).
//!
//! The cache is optional. Backend failures are logged and absorbed here, so a
//! missing or broken Redis only costs the performance benefit.

mod memory;
mod redis_store;

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

pub mod keys {
    pub const USERS_ALL: &str = "users:all";
    pub const USERS_PATTERN: &str = "users:*";
    pub const PRODUCTS_ALL: &str = "products:all";
    pub const PRODUCTS_PATTERN: &str = "products:*";

    pub fn user(id: i64) -> String {
        format!("users:id:{id}")
    }

    pub fn product(id: i64) -> String {
        format!("products:id:{id}")
    }

    pub fn products_of_user(user_id: i64) -> String {
        format!("products:user:{user_id}")
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("timed out connecting to cache")]
    Timeout,

    #[error("cache payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("key pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Key-value backend with expiring entries and glob key lookup.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Deletes `keys` in one batch and returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    async fn flush(&self) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidations: u64,
    pub hit_rate: f64,
    pub total_requests: u64,
    pub backend: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
}

struct Inner {
    store: Option<Arc<dyn CacheStore>>,
    default_ttl: Duration,
    counters: Counters,
}

/// Shared handle to the cache; cheap to clone into handler state.
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<Inner>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self::build(Some(store), default_ttl)
    }

    /// A layer with no backend: every read falls through to the store.
    pub fn disabled() -> Self {
        Self::build(None, Duration::ZERO)
    }

    fn build(store: Option<Arc<dyn CacheStore>>, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                default_ttl,
                counters: Counters::default(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.store.is_some()
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.inner.store.as_ref()?;
        let counters = &self.inner.counters;

        let raw = match store.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed");
                counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match raw.map(|raw| serde_json::from_str::<T>(&raw)) {
            Some(Ok(value)) => {
                tracing::debug!(key = %key, "cache hit");
                counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                tracing::debug!(key = %key, "cache miss");
                counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns `false` when the value was not stored.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let Some(store) = self.inner.store.as_ref() else {
            return false;
        };

        let result = match serde_json::to_string(value) {
            Ok(raw) => store.set_ex(key, &raw, ttl).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => {
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache write");
                self.inner.counters.writes.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache write failed");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(store) = self.inner.store.as_ref() else {
            return false;
        };

        match store.delete(&[key.to_string()]).await {
            Ok(0) => false,
            Ok(removed) => {
                tracing::debug!(key = %key, "cache invalidated");
                self.inner
                    .counters
                    .invalidations
                    .fetch_add(removed, Ordering::Relaxed);
                true
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache delete failed");
                false
            }
        }
    }

    /// Removes every key matching the glob `pattern`; returns how many went.
    pub async fn invalidate(&self, pattern: &str) -> u64 {
        let Some(store) = self.inner.store.as_ref() else {
            return 0;
        };

        let result = match store.keys(pattern).await {
            Ok(keys) if keys.is_empty() => Ok(0),
            Ok(keys) => store.delete(&keys).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(removed) => {
                if removed > 0 {
                    tracing::debug!(pattern = %pattern, removed, "cache invalidated");
                    self.inner
                        .counters
                        .invalidations
                        .fetch_add(removed, Ordering::Relaxed);
                }
                removed
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "cache invalidation failed");
                0
            }
        }
    }

    pub async fn clear(&self) -> bool {
        let Some(store) = self.inner.store.as_ref() else {
            return false;
        };

        match store.flush().await {
            Ok(()) => {
                tracing::info!("cache cleared");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache clear failed");
                false
            }
        }
    }

    /// Serves `key` from the cache, or runs `load` and caches its result for
    /// the default TTL.
    pub async fn read_through<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.read_through_with_ttl(key, self.inner.default_ttl, load)
            .await
    }

    pub async fn read_through_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let fresh = load().await?;
        self.set(key, &fresh, ttl).await;
        Ok(fresh)
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        let hits = counters.hits.load(Ordering::Relaxed);
        let misses = counters.misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            (hits as f64 / total_requests as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            writes: counters.writes.load(Ordering::Relaxed),
            invalidations: counters.invalidations.load(Ordering::Relaxed),
            hit_rate,
            total_requests,
            backend: self.inner.store.as_ref().map_or("disabled", |s| s.name()),
            timestamp: chrono::Utc::now(),
        }
    }
}
