//! Cache components
//!
//! Provides:
//! - The `CacheStore` seam the pipeline depends on (injected, never ambient)
//! - A bounded in-process cache with oldest-first eviction
//! - A Redis-backed implementation for multi-process deployments
//! - Cache key builders
//!
//! Caching is a performance optimization, not a correctness requirement:
//! callers must behave identically (modulo staleness) with any implementation,
//! including one that never retains anything.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Storage seam for the pipeline's shared caches.
///
/// Values are JSON so implementations stay object-safe; typed access goes
/// through [`get_typed`]/[`set_typed`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a cached value
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Set a cached value
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Evict a key; returns whether it was present
    async fn evict(&self, key: &str) -> Result<bool>;

    /// Number of retained entries (best-effort; 0 where unknowable)
    async fn len(&self) -> usize;
}

/// Typed get over any cache store
pub async fn get_typed<T: serde::de::DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Typed set over any cache store
pub async fn set_typed<T: serde::Serialize>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}

/// Bounded in-process cache.
///
/// Keys are tracked in insertion order; when capacity is exceeded the oldest
/// ~20% are evicted in one sweep, keeping eviction off the hot path.
pub struct BoundedMemoryCache {
    inner: Mutex<MemoryCacheInner>,
    capacity: usize,
}

struct MemoryCacheInner {
    entries: HashMap<String, Value>,
    order: Vec<String>,
}

impl BoundedMemoryCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryCacheInner {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    fn evict_oldest(inner: &mut MemoryCacheInner, capacity: usize) {
        if inner.entries.len() <= capacity {
            return;
        }
        let evict_count = (capacity / 5).max(1);
        let victims: Vec<String> = inner.order.drain(..evict_count.min(inner.order.len())).collect();
        for key in &victims {
            inner.entries.remove(key);
        }
        debug!(evicted = victims.len(), "Cache eviction sweep");
    }
}

#[async_trait]
impl CacheStore for BoundedMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.entries.insert(key.to_string(), value).is_none() {
            inner.order.push(key.to_string());
        }
        Self::evict_oldest(&mut inner, self.capacity);
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.order.retain(|k| k != key);
        }
        Ok(removed)
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
    /// Default TTL in seconds
    pub default_ttl_secs: u64,
    /// Key prefix for namespacing
    pub key_prefix: String,
}

/// Redis-backed cache store
pub struct RedisCache {
    connection: RwLock<MultiplexedConnection>,
    config: RedisCacheConfig,
}

impl RedisCache {
    /// Create a new Redis cache store
    pub async fn new(config: RedisCacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self {
            connection: RwLock::new(connection),
            config,
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.write().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let value: Option<String> =
            conn.get(&full_key)
                .await
                .map_err(|e| AppError::CacheError {
                    message: format!("Failed to get key '{}': {}", full_key, e),
                })?;

        match value {
            Some(json) => {
                debug!(key = %full_key, "Cache hit");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_string(&value)?;

        let mut conn = self.connection.write().await;
        conn.set_ex::<_, _, ()>(&full_key, &json, self.config.default_ttl_secs)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let deleted: i32 = conn.del(&full_key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to delete key '{}': {}", full_key, e),
        })?;

        Ok(deleted > 0)
    }

    async fn len(&self) -> usize {
        // Redis keyspace size is not tracked per prefix
        0
    }
}

/// Get-or-load helper; a failed cache write is logged, never fatal
pub async fn get_or_load<T, F, Fut>(store: &dyn CacheStore, key: &str, loader: F) -> Result<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    if let Some(cached) = get_typed::<T>(store, key).await? {
        return Ok(cached);
    }

    let value = loader().await?;

    if let Err(e) = set_typed(store, key, &value).await {
        warn!(error = %e, "Failed to cache value, continuing without cache");
    }

    Ok(value)
}

/// Cache key builders
pub mod keys {
    use sha2::{Digest, Sha256};

    /// Normalized hash of query text: lowercase, collapsed whitespace
    pub fn query_hash(text: &str) -> String {
        let normalized = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let digest = Sha256::digest(normalized.as_bytes());
        hex::encode(&digest[..16])
    }

    /// Build an embedding cache key
    pub fn embedding(model: &str, text: &str) -> String {
        format!("embedding:{}:{}", model, query_hash(text))
    }

    /// Build a retrieval result cache key
    pub fn search_result(text: &str, k: usize) -> String {
        format!("search:{}:{}", query_hash(text), k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = BoundedMemoryCache::new(8);
        cache.set("a", json!({"v": 1})).await.unwrap();

        let got = cache.get("a").await.unwrap();
        assert_eq!(got, Some(json!({"v": 1})));

        assert!(cache.evict("a").await.unwrap());
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_evicts_oldest() {
        let cache = BoundedMemoryCache::new(10);
        for i in 0..11 {
            cache.set(&format!("k{}", i), json!(i)).await.unwrap();
        }

        // Oldest ~20% (2 entries) swept once capacity was exceeded
        assert!(cache.len().await <= 10);
        assert_eq!(cache.get("k0").await.unwrap(), None);
        assert!(cache.get("k10").await.unwrap().is_some());
    }

    #[test]
    fn test_query_hash_normalizes() {
        assert_eq!(
            keys::query_hash("Salinity  in  October"),
            keys::query_hash("salinity in october")
        );
        assert_ne!(keys::query_hash("salinity"), keys::query_hash("temperature"));
    }

    #[test]
    fn test_key_builders() {
        assert!(keys::embedding("model-a", "some text").starts_with("embedding:model-a:"));
        assert!(keys::search_result("some text", 5).starts_with("search:"));
    }
}
