//! In-process cache backend.
//!
//! Used for single-instance deployments and tests. Entries carry their own
//! deadline; moka bounds the entry count.

use async_trait::async_trait;
use augment_core::Result;
use moka::future::Cache;
use std::time::Duration;
use tokio::time::Instant;

use crate::store::CacheStore;

#[derive(Clone)]
struct Slot {
    value: String,
    expires_at: Instant,
}

/// moka-backed [`CacheStore`].
#[derive(Clone)]
pub struct MemoryCacheStore {
    cache: Cache<String, Slot>,
}

impl MemoryCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    async fn live(&self, key: &str) -> Option<String> {
        let slot = self.cache.get(key).await?;
        if slot.expires_at <= Instant::now() {
            self.cache.invalidate(key).await;
            return None;
        }
        Some(slot.value)
    }

    async fn put(&self, key: String, value: String, ttl: Duration) {
        let slot = Slot {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key, slot).await;
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live(key).await)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.put(key.to_string(), value, ttl).await;
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.live(key).await);
        }
        Ok(values)
    }

    async fn set_many(&self, entries: Vec<(String, String)>, ttl: Duration) -> Result<()> {
        for (key, value) in entries {
            self.put(key, value, ttl).await;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn flush_all(&self) -> Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
