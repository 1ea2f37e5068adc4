//! Inference health checks.

use crate::client::InferenceClient;
use tracing::{debug, error};

/// Check classifier reachability.
pub async fn check_connection(client: &InferenceClient) -> bool {
    match client.ping().await {
        Ok(()) => {
            debug!("Inference service healthy");
            true
        }
        Err(e) => {
            error!("Inference health check failed: {}", e);
            false
        }
    }
}
