//! Storage health checks.

use crate::store::BlobStore;
use tracing::{debug, error};

/// Check blob store availability.
pub async fn check_connection(store: &dyn BlobStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            debug!(backend = store.name(), "Storage healthy");
            true
        }
        Err(e) => {
            error!(backend = store.name(), "Storage health check failed: {}", e);
            false
        }
    }
}
