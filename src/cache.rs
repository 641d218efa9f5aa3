//! # Cache Adapter Module
//!
//! ## Purpose
//! Key-value cache adapter used by the pipeline for raw search results and
//! generated summaries. Wraps Redis behind a small trait so components depend
//! on the cache contract, not on the store.
//!
//! ## Input/Output Specification
//! - **Input**: String keys, serialized string values, TTLs in seconds
//! - **Output**: Cached values or `None`; a missing key is never an error
//! - **Lifecycle**: Entries expire server-side via Redis TTLs
//!
//! ## Key Features
//! - `RedisCache`: multiplexed async connections, prefix-scoped keys,
//!   SCAN-based clearing
//! - `NoopCache`: documented cache-disabled mode; every get misses, every
//!   set is a no-op
//! - `MemoryCache`: in-process TTL-aware store for local runs and tests

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::errors::{PipelineError, Result};

/// Cache contract shared by the search client and the summarizer.
///
/// `get` returns `Ok(None)` for a missing key; only store failures are
/// errors. Callers treat `set` as best-effort.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Look up a key, returning the stored value if present and unexpired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under a key with an expiry in seconds
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Remove every entry owned by this service
    async fn clear_all(&self) -> Result<()>;
}

/// Redis-backed cache adapter.
///
/// All keys are stored under a fixed prefix so `clear_all` only touches
/// entries owned by this service.
pub struct RedisCache {
    client: redis::Client,
    prefix: String,
}

impl RedisCache {
    /// Connect to Redis and verify the server is reachable.
    ///
    /// An unreachable store is a fatal configuration error: the caller is
    /// expected to abort startup (or construct a [`NoopCache`] instead when
    /// running with the cache disabled).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| PipelineError::Config {
            message: format!("Invalid Redis URL: {}", e),
        })?;

        let mut con = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PipelineError::Config {
                message: format!("Failed to connect to Redis: {}", e),
            })?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut con)
            .await
            .map_err(|e| PipelineError::Config {
                message: format!("Redis PING failed: {}", e),
            })?;
        debug!("Redis connection verified: {}", pong);

        Ok(Self {
            client,
            prefix: "caselaw:".to_string(),
        })
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PipelineError::Cache {
                details: format!("Redis connection error: {}", e),
            })?;
        Ok(con)
    }

    /// Collect all keys under this service's prefix via incremental SCAN
    async fn collect_own_keys(
        &self,
        con: &mut redis::aio::MultiplexedConnection,
    ) -> Result<Vec<String>> {
        let pattern = format!("{}*", self.prefix);
        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(con)
                .await
                .map_err(|e| PipelineError::Cache {
                    details: format!("Redis SCAN error: {}", e),
                })?;
            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.connection().await?;
        let raw: Option<String> = con
            .get(self.redis_key(key))
            .await
            .map_err(|e| PipelineError::Cache {
                details: format!("Redis GET error: {}", e),
            })?;
        Ok(raw)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut con = self.connection().await?;
        con.set_ex::<_, _, ()>(self.redis_key(key), value, ttl_seconds)
            .await
            .map_err(|e| PipelineError::Cache {
                details: format!("Redis SETEX error: {}", e),
            })?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut con = self.connection().await?;
        let keys = self.collect_own_keys(&mut con).await?;

        if !keys.is_empty() {
            // Delete in batches to avoid issues with large key sets
            for chunk in keys.chunks(100) {
                con.del::<_, ()>(chunk)
                    .await
                    .map_err(|e| PipelineError::Cache {
                        details: format!("Redis DEL error: {}", e),
                    })?;
            }
        }

        info!("Cleared {} cache entries", keys.len());
        Ok(())
    }
}

/// Cache adapter for running with caching disabled.
///
/// Every lookup misses and every write succeeds without storing anything, so
/// the pipeline behaves identically minus the deduplication.
pub struct NoopCache;

#[async_trait]
impl KeyValueCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> Result<()> {
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        Ok(())
    }
}

/// In-process cache with TTL expiry checked on read.
///
/// Used for local runs without a Redis instance and by the integration
/// tests. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries (test helper)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if Instant::now() < *expires_at {
                return Ok(Some(value.clone()));
            }
        }
        self.entries.remove_if(key, |_, (_, expires_at)| Instant::now() >= *expires_at);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("case_law:miranda").await.unwrap(), None);

        cache.set("case_law:miranda", "{}", 600).await.unwrap();
        assert_eq!(
            cache.get("case_law:miranda").await.unwrap(),
            Some("{}".to_string())
        );

        cache.clear_all().await.unwrap();
        assert_eq!(cache.get("case_law:miranda").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 0).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_noop_cache_never_stores() {
        let cache = NoopCache;
        cache.set("k", "v", 600).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.clear_all().await.unwrap();
    }
}
