//! Telemetry for the seniority augmenter.
//!
//! Metrics and health are process-local registries; they are logged
//! periodically and served over the health API rather than pushed anywhere.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
