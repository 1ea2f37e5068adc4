//! Cache health checks.

use crate::client::CacheClient;
use tracing::{debug, error};

/// Check cache backend connectivity.
pub async fn check_connection(client: &CacheClient) -> bool {
    match client.ping().await {
        Ok(()) => {
            debug!(backend = client.backend(), "Cache connection healthy");
            true
        }
        Err(e) => {
            error!(backend = client.backend(), "Cache health check failed: {}", e);
            false
        }
    }
}
