//! Blob store health checks.

use object_store::ObjectStore;
use telemetry::health;
use tracing::{debug, error};

/// Check that the object store is reachable by listing its root.
///
/// Updates the global `blob_store` health component.
pub async fn check_connection(store: &dyn ObjectStore) -> bool {
    match store.list_with_delimiter(None).await {
        Ok(listing) => {
            debug!(
                prefixes = listing.common_prefixes.len(),
                "Blob store connection healthy"
            );
            health().blob_store.set_healthy();
            true
        }
        Err(e) => {
            error!(error = %e, "Blob store health check failed");
            health().blob_store.set_unhealthy(e.to_string());
            false
        }
    }
}
