//! Batch seniority inference against an external classifier.

pub mod client;
pub mod config;
pub mod health;
pub mod model;
pub mod protocol;
pub mod rate_limit;

pub use client::*;
pub use config::*;
pub use model::*;
pub use protocol::*;
pub use rate_limit::RateLimiter;
