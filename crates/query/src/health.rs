//! Query service health checks.

use crate::service::QueryService;
use telemetry::health;
use tracing::{debug, error};

/// Check query service reachability and update the `query_service` component.
pub async fn check_connection(service: &dyn QueryService) -> bool {
    match service.ping().await {
        Ok(()) => {
            debug!("Query service connection healthy");
            health().query_service.set_healthy();
            true
        }
        Err(e) => {
            error!(error = %e, "Query service health check failed");
            health().query_service.set_unhealthy(e.to_string());
            false
        }
    }
}
