//! Cache client.
//!
//! Single-key operations surface backend errors to the caller. Bulk
//! operations absorb them: a failed bulk read is reported as all misses and
//! a failed bulk write as zero keys stored, both logged and counted.
//! Undecodable or expired values are misses everywhere.

use augment_core::{PairKey, Result, Seniority};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, warn};

use crate::config::{CacheBackend, CacheConfig};
use crate::entry::CacheEntry;
use crate::memory::MemoryCacheStore;
use crate::redis_store::RedisCacheStore;
use crate::store::CacheStore;

/// Cache-aside seniority cache keyed by normalized (company, title).
#[derive(Clone)]
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CacheClient {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Builds the configured backend.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Redis => Arc::new(RedisCacheStore::new(&config.url)?),
            CacheBackend::Memory => Arc::new(MemoryCacheStore::new(config.max_capacity)),
        };
        Ok(Self::new(store, config.ttl()))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn get(&self, company: &str, title: &str) -> Result<Option<Seniority>> {
        let key = PairKey::new(company, title);
        let raw = self.store.get(&key.cache_key()).await?;
        Ok(raw.and_then(|raw| decode(&key, &raw)))
    }

    pub async fn set(&self, company: &str, title: &str, seniority: Seniority) -> Result<()> {
        let key = PairKey::new(company, title);
        let value = CacheEntry::new(seniority, self.ttl).encode()?;
        self.store.set(&key.cache_key(), value, self.ttl).await
    }

    /// Looks up every key in one round trip; returns only the hits.
    pub async fn bulk_get(&self, keys: &[PairKey]) -> HashMap<PairKey, Seniority> {
        let mut found = HashMap::new();
        if keys.is_empty() {
            return found;
        }

        let start = Instant::now();
        let cache_keys: Vec<String> = keys.iter().map(PairKey::cache_key).collect();

        let values = match self.store.get_many(&cache_keys).await {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    backend = self.store.name(),
                    keys = keys.len(),
                    error = %e,
                    "Cache bulk get failed, treating all keys as misses"
                );
                metrics().cache_errors.inc();
                metrics().cache_misses.inc_by(keys.len() as u64);
                return found;
            }
        };

        for (key, raw) in keys.iter().zip(values) {
            if let Some(seniority) = raw.and_then(|raw| decode(key, &raw)) {
                found.insert(key.clone(), seniority);
            }
        }

        let hits = found.len() as u64;
        metrics().cache_hits.inc_by(hits);
        metrics().cache_misses.inc_by(keys.len() as u64 - hits);
        metrics()
            .cache_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        debug!(
            keys = keys.len(),
            hits = hits,
            latency_ms = %start.elapsed().as_millis(),
            "Cache bulk get"
        );

        found
    }

    /// Stores every result in one round trip; returns how many were written.
    pub async fn bulk_set(&self, results: &HashMap<PairKey, Seniority>) -> usize {
        if results.is_empty() {
            return 0;
        }

        let mut entries = Vec::with_capacity(results.len());
        for (key, seniority) in results {
            match CacheEntry::new(*seniority, self.ttl).encode() {
                Ok(value) => entries.push((key.cache_key(), value)),
                Err(e) => warn!(
                    company = %key.company(),
                    title = %key.title(),
                    error = %e,
                    "Failed to encode cache entry"
                ),
            }
        }

        let count = entries.len();
        match self.store.set_many(entries, self.ttl).await {
            Ok(()) => {
                debug!(count = count, "Cache bulk set");
                count
            }
            Err(e) => {
                warn!(
                    backend = self.store.name(),
                    keys = count,
                    error = %e,
                    "Cache bulk set failed"
                );
                metrics().cache_errors.inc();
                0
            }
        }
    }

    pub async fn delete(&self, company: &str, title: &str) -> Result<bool> {
        self.store.delete(&PairKey::new(company, title).cache_key()).await
    }

    /// Clears the whole cache keyspace.
    pub async fn flush_all(&self) -> Result<()> {
        warn!(backend = self.store.name(), "Flushing seniority cache");
        self.store.flush_all().await
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

fn decode(key: &PairKey, raw: &str) -> Option<Seniority> {
    match CacheEntry::decode(raw) {
        Ok(entry) if entry.is_expired() => None,
        Ok(entry) => Some(entry.seniority()),
        Err(e) => {
            warn!(
                company = %key.company(),
                title = %key.title(),
                error = %e,
                "Undecodable cache entry, treating as miss"
            );
            None
        }
    }
}
