//! Application state shared across handlers.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Process facts reported by the health endpoint.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<StateInner>,
}

struct StateInner {
    mode: String,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StateInner {
                mode: mode.into(),
                started_at: Utc::now(),
            }),
        }
    }

    /// Run mode: `watcher`, `processor` or `all`.
    pub fn mode(&self) -> &str {
        &self.inner.mode
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.inner.started_at).num_seconds().max(0)
    }
}
