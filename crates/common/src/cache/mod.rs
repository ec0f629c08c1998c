//! Redis view cache
//!
//! Provides:
//! - Multiplexed connection management
//! - JSON get/set with TTL
//! - Memoized loads that degrade to the loader when Redis misbehaves
//! - Pattern deletion for tag invalidation

mod revalidate;

pub use revalidate::{CacheRevalidator, NoopRevalidator, Revalidate, ViewTag};

use crate::config::RedisConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_cache;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Redis cache client
pub struct Cache {
    connection: RwLock<MultiplexedConnection>,
    default_ttl_secs: u64,
    key_prefix: String,
}

impl Cache {
    /// Connect when a Redis URL is configured
    pub async fn from_config(config: &RedisConfig) -> Result<Option<Self>> {
        match config.url.as_deref() {
            Some(url) => Self::connect(url, config).await.map(Some),
            None => Ok(None),
        }
    }

    /// Create a new cache client
    pub async fn connect(url: &str, config: &RedisConfig) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::CacheError {
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
            default_ttl_secs: config.default_ttl_secs,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let value: Option<String> = conn.get(&full_key).await?;

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

    /// Set a value in cache with default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl_secs).await
    }

    /// Set a value in cache with custom TTL
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_string(value)?;

        let mut conn = self.connection.write().await;
        conn.set_ex::<_, _, ()>(&full_key, &json, ttl_secs).await?;

        debug!(key = %full_key, ttl_secs, "Cache set");
        Ok(())
    }

    /// Delete every key under `pattern` (glob, unprefixed). Returns the count removed.
    pub async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let full_pattern = self.key(pattern);
        let mut conn = self.connection.write().await;

        let keys: Vec<String> = {
            let mut iter = conn.scan_match::<_, String>(&full_pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: usize = conn.del(&keys).await?;
        debug!(pattern = %full_pattern, deleted, "Cache invalidated");
        Ok(deleted)
    }

    /// Memoize `loader` under `key`.
    ///
    /// Redis failures are logged and the loader result is served uncached.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, view: &str, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(cached)) => {
                record_cache(true, view);
                return Ok(cached);
            }
            Ok(None) => record_cache(false, view),
            Err(e) => warn!(error = %e, key, "Cache read failed, loading directly"),
        }

        let value = loader().await?;

        if let Err(e) = self.set(key, &value).await {
            warn!(error = %e, "Failed to cache value, continuing without cache");
        }

        Ok(value)
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

/// Cache key builder helpers
pub mod keys {
    use super::ViewTag;
    use serde::Serialize;
    use sha2::{Digest, Sha256};

    /// Stable SHA-256 of a value's JSON form
    pub fn hashed<T: Serialize>(value: &T) -> String {
        let json = serde_json::to_vec(value).unwrap_or_default();
        hex::encode(Sha256::digest(&json))
    }

    /// Key for one memoized variant of a tagged view
    pub fn view<T: Serialize>(tag: &ViewTag, variant: &T) -> String {
        format!("{}:{}", tag.key_space(), hashed(variant))
    }

    /// Glob covering every variant of a tagged view
    pub fn view_pattern(tag: &ViewTag) -> String {
        format!("{}:*", tag.key_space())
    }
}
