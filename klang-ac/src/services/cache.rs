//! Result cache
//!
//! Key-value store for classification results, keyed by the namespaced
//! source URL and expiring after a configurable TTL. `RedisStore` is the
//! production backend; `MemoryStore` backs tests and cache-less runs.
//! Entries are independent: `put` overwrites and resets the TTL, and a
//! present-but-expired entry is a miss.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::models::ClassificationResult;
use klang_common::{Error, Result};

/// Namespace prefix for all cache keys
pub const CACHE_NAMESPACE: &str = "klang:classify:v1:";

/// Derive the cache key for a source URL.
pub fn cache_key(url: &str) -> String {
    format!("{}{}", CACHE_NAMESPACE, url)
}

/// TTL'd key-value store for classification results.
#[async_trait]
pub trait ClassificationStore: Send + Sync {
    /// Fetch a cached result. Absent and expired entries are both `None`.
    async fn get(&self, key: &str) -> Result<Option<ClassificationResult>>;

    /// Store a result, overwriting any existing entry and resetting its TTL.
    async fn put(&self, key: &str, result: &ClassificationResult, ttl: Duration) -> Result<()>;
}

/// Redis-backed store. Expiry is delegated to Redis (`SET ... EX`).
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis. Fails with `Error::Cache` when the target is
    /// unreachable or the URL is invalid.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Cache(format!("invalid redis URL {}: {}", url, e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Cache(format!("failed to connect to redis at {}: {}", url, e)))?;
        info!(url, "Connected to result cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ClassificationStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<ClassificationResult>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| Error::Cache(format!("cache read failed: {}", e)))?;

        match raw {
            None => Ok(None),
            Some(json) => match serde_json::from_str(&json) {
                Ok(result) => Ok(Some(result)),
                Err(e) => {
                    // Entry written by an incompatible build: recompute
                    // rather than fail the request until it expires.
                    warn!(key, error = %e, "Discarding undeserializable cache entry");
                    Ok(None)
                }
            },
        }
    }

    async fn put(&self, key: &str, result: &ClassificationResult, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(result)
            .map_err(|e| Error::Cache(format!("cache serialization failed: {}", e)))?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs())
            .await
            .map_err(|e| Error::Cache(format!("cache write failed: {}", e)))?;
        debug!(key, ttl_secs = ttl.as_secs(), "Cached classification result");
        Ok(())
    }
}

/// In-process store with the same expiry semantics as `RedisStore`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClassificationStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<ClassificationResult>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory store lock poisoned".to_string()))?;

        match entries.get(key) {
            None => Ok(None),
            Some((_, expiry)) if *expiry <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((json, _)) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| Error::Cache(format!("cache deserialization failed: {}", e))),
        }
    }

    async fn put(&self, key: &str, result: &ClassificationResult, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(result)
            .map_err(|e| Error::Cache(format!("cache serialization failed: {}", e)))?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), (json, Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioFeatures, TaxonomyLabel};

    fn sample_result() -> ClassificationResult {
        ClassificationResult {
            features: AudioFeatures {
                duration: 5.23,
                sample_rate: 44100,
                channels: 2,
            },
            classification: TaxonomyLabel::Music,
        }
    }

    #[test]
    fn test_cache_key_is_namespaced() {
        let key = cache_key("https://example.com/clip.wav");
        assert_eq!(key, "klang:classify:v1:https://example.com/clip.wav");
        assert!(key.starts_with(CACHE_NAMESPACE));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let key = cache_key("https://example.com/a.wav");

        assert!(store.get(&key).await.unwrap().is_none());

        let result = sample_result();
        store
            .put(&key, &result, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get(&key).await.unwrap(), Some(result));
    }

    #[tokio::test]
    async fn test_memory_store_expiry_is_a_miss() {
        let store = MemoryStore::new();
        let key = cache_key("https://example.com/b.wav");

        store
            .put(&key, &sample_result(), Duration::from_millis(30))
            .await
            .unwrap();
        assert!(store.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_resets_ttl() {
        let store = MemoryStore::new();
        let key = cache_key("https://example.com/c.wav");

        store
            .put(&key, &sample_result(), Duration::from_millis(30))
            .await
            .unwrap();

        let mut replacement = sample_result();
        replacement.classification = TaxonomyLabel::Speech;
        store
            .put(&key, &replacement, Duration::from_secs(60))
            .await
            .unwrap();

        // Past the first entry's TTL, the rewritten entry still lives
        tokio::time::sleep(Duration::from_millis(60)).await;
        let hit = store.get(&key).await.unwrap().unwrap();
        assert_eq!(hit.classification, TaxonomyLabel::Speech);
    }

    #[tokio::test]
    async fn test_entries_are_independent() {
        let store = MemoryStore::new();
        store
            .put(&cache_key("one"), &sample_result(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.get(&cache_key("two")).await.unwrap().is_none());
        assert!(store.get(&cache_key("one")).await.unwrap().is_some());
    }
}
