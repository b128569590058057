use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::kernel::traits::{BaseBlobStore, ReadConsistency};
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    blob_store: BlobStoreHealth,
}

#[derive(Serialize)]
pub struct BlobStoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Checks blob store reachability with a short-deadline probe read.
/// Returns 200 OK when healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.deps.blob_store.get("health/probe", ReadConsistency::Eventual),
    )
    .await
    {
        Ok(Ok(_)) => BlobStoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => BlobStoreHealth {
            status: "error".to_string(),
            error: Some(format!("Read failed: {}", e)),
        },
        Err(_) => BlobStoreHealth {
            status: "error".to_string(),
            error: Some("Read timeout (>5s)".to_string()),
        },
    };

    let is_healthy = store_health.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            blob_store: store_health,
        }),
    )
}
