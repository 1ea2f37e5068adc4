//! Worker configuration.

use augment_core::limits::{DEFAULT_BATCH_SIZE, DEFAULT_OUTPUT_PREFIX, INPUT_EXTENSION};
use augment_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with records whose seniority could not be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Drop the records and still acknowledge the unit.
    #[default]
    Drop,
    /// Fail the unit so it is redelivered.
    FailUnit,
}

/// Batch processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Records per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Key prefix for augmented output
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Batches of one unit processed at the same time
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    #[serde(default)]
    pub unresolved_policy: UnresolvedPolicy,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}

fn default_batch_concurrency() -> usize {
    1
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            output_prefix: default_output_prefix(),
            batch_concurrency: default_batch_concurrency(),
            unresolved_policy: UnresolvedPolicy::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("processor.batch_size must be at least 1"));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::config("processor.batch_concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Accepted input file suffixes
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec![INPUT_EXTENSION.to_string()]
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

/// Periodic housekeeping intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_metrics_log_interval_secs")]
    pub metrics_log_interval_secs: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

fn default_metrics_log_interval_secs() -> u64 {
    60
}

fn default_health_check_interval_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            metrics_log_interval_secs: default_metrics_log_interval_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_log_interval_secs.max(1))
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }
}
