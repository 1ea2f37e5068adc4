//! Health check aggregation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Health status for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug)]
struct ProbeState {
    healthy: bool,
    message: Option<String>,
    last_checked: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

/// Health of one backend, updated by probes and by the loops that use it.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: RwLock<ProbeState>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(ProbeState {
                healthy: false,
                message: None,
                last_checked: None,
                consecutive_failures: 0,
            }),
        }
    }

    pub fn set_healthy(&self) {
        let mut state = self.state.write();
        state.healthy = true;
        state.message = None;
        state.last_checked = Some(Utc::now());
        state.consecutive_failures = 0;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        let mut state = self.state.write();
        state.healthy = false;
        state.message = Some(msg.into());
        state.last_checked = Some(Utc::now());
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
    }

    pub fn is_healthy(&self) -> bool {
        self.state.read().healthy
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.state.read().message.clone()
    }

    /// Failed probes since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.state.read().consecutive_failures
    }

    fn report(&self) -> ComponentHealthReport {
        let state = self.state.read();
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: state.healthy,
            message: state.message.clone(),
            last_checked: state.last_checked,
            consecutive_failures: state.consecutive_failures,
        }
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
    /// Never probed while `None`
    pub last_checked: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

/// Global health registry.
pub struct HealthRegistry {
    pub cache: ComponentHealth,
    pub inference: ComponentHealth,
    pub storage: ComponentHealth,
    pub queue: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            cache: ComponentHealth::new("cache"),
            inference: ComponentHealth::new("inference"),
            storage: ComponentHealth::new("storage"),
            queue: ComponentHealth::new("queue"),
        }
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        let components = vec![
            self.cache.report(),
            self.inference.report(),
            self.storage.report(),
            self.queue.report(),
        ];

        let all_healthy = components.iter().all(|c| c.healthy);
        let any_healthy = components.iter().any(|c| c.healthy);

        let status = if all_healthy {
            HealthStatus::Healthy
        } else if any_healthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, components }
    }

    /// Check if units can be taken off the queue.
    ///
    /// Inference is not required: an unreachable classifier degrades output
    /// but does not stop the pipeline.
    pub fn is_ready(&self) -> bool {
        self.queue.is_healthy() && self.storage.is_healthy() && self.cache.is_healthy()
    }

    /// Check if the service is alive.
    pub fn is_alive(&self) -> bool {
        true // Service is running
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
