//! Queue health checks.

use crate::queue::MessageQueue;
use tracing::{debug, error};

/// Check queue backend connectivity.
pub async fn check_connection(queue: &dyn MessageQueue) -> bool {
    match queue.ping().await {
        Ok(()) => {
            debug!(queue = queue.name(), "Queue connection healthy");
            true
        }
        Err(e) => {
            error!(queue = queue.name(), "Queue health check failed: {}", e);
            false
        }
    }
}
