//! Cache configuration.

use augment_core::limits::DEFAULT_CACHE_TTL_SECS;
use augment_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which cache backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Cache client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: CacheBackend,
    /// Redis URL, including the database index
    #[serde(default = "default_url")]
    pub url: String,
    /// Entry time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Entry limit for the in-process backend
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

fn default_backend() -> CacheBackend {
    CacheBackend::Redis
}

fn default_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_max_capacity() -> u64 {
    100_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_url(),
            ttl_secs: default_ttl_secs(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(Error::config("cache.ttl_secs must be positive"));
        }
        Ok(())
    }
}
