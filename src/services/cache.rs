use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis, shared across instances,
/// and only used when a Redis URL is configured.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            ..Self::in_memory(l1_size, ttl_secs)
        })
    }

    /// L1-only cache manager
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            redis: None,
            l1_cache,
            ttl_secs,
        }
    }

    /// Connect to Redis when a URL is given, falling back to L1 only if that fails
    pub async fn connect(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Self {
        match redis_url.filter(|url| !url.is_empty()) {
            Some(url) => match Self::new(url, l1_size, ttl_secs).await {
                Ok(cache) => {
                    tracing::info!("Cache: L1 + Redis");
                    cache
                }
                Err(e) => {
                    tracing::warn!("Redis unavailable, using in-memory cache only: {}", e);
                    Self::in_memory(l1_size, ttl_secs)
                }
            },
            None => {
                tracing::info!("Cache: L1 only");
                Self::in_memory(l1_size, ttl_secs)
            }
        }
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;
                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;
        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.has_redis(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Coordinates derived for a property
    pub fn coordinates(property_number: &str) -> String {
        format!("coords:{}", property_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    #[tokio::test]
    async fn test_in_memory_set_get_delete() {
        let cache = CacheManager::in_memory(100, 60);
        let key = CacheKey::coordinates("AA100");
        let value = Some(Coordinates::new(33.23, 131.60));

        cache.set(&key, &value).await.unwrap();
        let cached: Option<Coordinates> = cache.get(&key).await.unwrap();
        assert_eq!(cached, value);

        cache.delete(&key).await.unwrap();
        assert!(matches!(
            cache.get::<Option<Coordinates>>(&key).await,
            Err(CacheError::CacheMiss(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_without_url_is_l1_only() {
        let cache = CacheManager::connect(None, 10, 60).await;
        assert!(!cache.has_redis());
        assert!(!cache.stats().redis_enabled);
        assert!(!CacheManager::connect(Some(""), 10, 60).await.has_redis());
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_redis_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        cache.set("test_key", &"test_value").await.unwrap();
        let result: String = cache.get("test_key").await.unwrap();
        assert_eq!(result, "test_value");
        cache.delete("test_key").await.unwrap();
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::coordinates("AA100"), "coords:AA100");
    }
}
