//! Inference client configuration.

use augment_core::limits::{
    DEFAULT_INFERENCE_BATCH_SIZE, DEFAULT_INFERENCE_TIMEOUT_MS, DEFAULT_RATE_LIMIT,
};
use augment_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inference client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Classifier base URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
    /// Requests allowed back-to-back before pacing applies
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Maximum pairs per request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_url() -> String {
    "http://localhost:50051".to_string()
}

fn default_rate_limit() -> f64 {
    DEFAULT_RATE_LIMIT
}

fn default_burst() -> u32 {
    1
}

fn default_max_batch_size() -> usize {
    DEFAULT_INFERENCE_BATCH_SIZE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_INFERENCE_TIMEOUT_MS
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            rate_limit: default_rate_limit(),
            burst: default_burst(),
            max_batch_size: default_max_batch_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rate_limit.is_finite() && self.rate_limit > 0.0) {
            return Err(Error::config("inference.rate_limit must be a positive number"));
        }
        if self.burst == 0 {
            return Err(Error::config("inference.burst must be at least 1"));
        }
        if self.max_batch_size == 0 {
            return Err(Error::config("inference.max_batch_size must be at least 1"));
        }
        // request ids are u32 positions within one chunk
        if u32::try_from(self.max_batch_size).is_err() {
            return Err(Error::config(format!(
                "inference.max_batch_size must be at most {}",
                u32::MAX
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::config("inference.timeout_ms must be positive"));
        }
        Ok(())
    }
}
