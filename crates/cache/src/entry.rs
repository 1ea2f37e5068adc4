//! Stored cache value.

use augment_core::{Result, Seniority};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value stored under a cache key: `{"seniority":3,"last_updated":1700000000,"ttl":2592000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub seniority: i32,
    /// Unix seconds
    pub last_updated: i64,
    /// Seconds
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(seniority: Seniority, ttl: Duration) -> Self {
        Self::at(seniority, ttl, Utc::now().timestamp())
    }

    pub fn at(seniority: Seniority, ttl: Duration, last_updated: i64) -> Self {
        Self {
            seniority: seniority.level(),
            last_updated,
            ttl: ttl.as_secs(),
        }
    }

    pub fn seniority(&self) -> Seniority {
        Seniority::new(self.seniority)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        let ttl = i64::try_from(self.ttl).unwrap_or(i64::MAX);
        self.last_updated.saturating_add(ttl) <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
