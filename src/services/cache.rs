use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::CacheSettings;
use crate::core::ports::{ImageStore, StoreError};
use crate::models::UserId;

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
/// L1 is an in-process moka cache, L2 is Redis and is shared across instances.
/// Both tiers expire entries after the same TTL.
pub struct CacheManager {
    redis: Option<ConnectionManager>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(redis),
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an in-process cache without a Redis tier
    pub fn local_only(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    /// Build the cache described by the settings.
    ///
    /// The L1 tier always runs. Redis is added on top when configured; if it
    /// cannot be reached the cache falls back to L1 only.
    pub async fn from_settings(settings: &CacheSettings) -> Self {
        let ttl_secs = settings.ttl_secs.unwrap_or(300);
        let l1_size = settings.l1_cache_size.unwrap_or(10_000);

        match settings.redis_url.as_deref() {
            Some(url) => match Self::new(url, l1_size, ttl_secs).await {
                Ok(cache) => {
                    tracing::info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_size, ttl_secs);
                    cache
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                    Self::local_only(l1_size, ttl_secs)
                }
            },
            None => {
                tracing::info!("No Redis configured, using in-process cache only");
                Self::local_only(l1_size, ttl_secs)
            }
        }
    }

    /// Whether the Redis tier is active
    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: DeserializeOwned,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;

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

    /// Set a value in both tiers
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;
        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }
}

fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
    moka::future::CacheBuilder::new(l1_size)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a user's image URLs
    pub fn images(user_id: UserId) -> String {
        format!("images:{}", user_id)
    }
}

/// Image store decorator that serves URL lists from the cache
///
/// Cache faults are logged and fall through to the wrapped store; they never
/// fail a lookup on their own.
pub struct CachedImageStore {
    inner: Arc<dyn ImageStore>,
    cache: Arc<CacheManager>,
}

impl CachedImageStore {
    pub fn new(inner: Arc<dyn ImageStore>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ImageStore for CachedImageStore {
    async fn fetch_image_urls(&self, id: UserId) -> Result<Vec<String>, StoreError> {
        let key = CacheKey::images(id);

        match self.cache.get::<Vec<String>>(&key).await {
            Ok(urls) => return Ok(urls),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Image cache read failed for {}: {}", id, e),
        }

        let urls = self.inner.fetch_image_urls(id).await?;

        if let Err(e) = self.cache.set(&key, &urls).await {
            tracing::warn!("Image cache write failed for {}: {}", id, e);
        }

        Ok(urls)
    }
}
