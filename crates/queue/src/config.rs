//! Queue configuration.

use augment_core::limits::{DEFAULT_MAX_MESSAGES, DEFAULT_VISIBILITY_TIMEOUT_SECS, DEFAULT_WAIT_SECS};
use augment_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Redis,
    Memory,
}

/// Queue configuration shared by the intake and notification streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,
    #[serde(default = "default_url")]
    pub url: String,
    /// Stream carrying one file reference per input unit
    #[serde(default = "default_intake_stream")]
    pub intake_stream: String,
    /// Stream carrying storage event notifications
    #[serde(default = "default_notification_stream")]
    pub notification_stream: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_consumer")]
    pub consumer: String,
    /// Seconds an unacknowledged message stays hidden before redelivery
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
    /// Long-poll wait per receive
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Deliveries pulled per receive
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_intake_stream() -> String {
    "augment:intake".to_string()
}

fn default_notification_stream() -> String {
    "augment:notifications".to_string()
}

fn default_group() -> String {
    "augmenter".to_string()
}

fn default_consumer() -> String {
    "worker-1".to_string()
}

fn default_visibility_timeout_secs() -> u64 {
    DEFAULT_VISIBILITY_TIMEOUT_SECS
}

fn default_wait_secs() -> u64 {
    DEFAULT_WAIT_SECS
}

fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            url: default_url(),
            intake_stream: default_intake_stream(),
            notification_stream: default_notification_stream(),
            group: default_group(),
            consumer: default_consumer(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            wait_secs: default_wait_secs(),
            max_messages: default_max_messages(),
        }
    }
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            return Err(Error::config("queue.max_messages must be at least 1"));
        }
        if self.visibility_timeout_secs == 0 {
            return Err(Error::config("queue.visibility_timeout_secs must be positive"));
        }
        if self.intake_stream == self.notification_stream {
            return Err(Error::config(
                "queue.intake_stream and queue.notification_stream must differ",
            ));
        }
        Ok(())
    }
}
