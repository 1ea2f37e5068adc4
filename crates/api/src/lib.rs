//! HTTP surface of the seniority augmenter: health probes and metrics.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
