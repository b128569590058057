//! Application setup and server configuration.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::kernel::{
    BaseBlobStore, BaseEventLog, BlobDataset, HttpAnalyzeStage, HttpEventLog, HttpFetchStage,
    HttpProbeFetch, MemoryBlobStore, NoopEventLog, PostgresBlobStore, SerpWebSearch, ServerDeps,
};
use crate::server::middleware::bearer_auth_middleware;
use crate::server::routes::{
    analyze_job_handler, auth_check_handler, fetch_url_handler, get_auto_check_handler,
    health_handler, initialize_job_handler, job_status_handler, set_auto_check_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    pub api_token: String,
}

/// Wire up production dependencies from config.
pub async fn build_deps(config: &Config) -> anyhow::Result<Arc<ServerDeps>> {
    let blob_store: Arc<dyn BaseBlobStore> = match &config.database_url {
        Some(url) => Arc::new(PostgresBlobStore::new(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory blob store (data is not durable)");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let event_log: Arc<dyn BaseEventLog> = match &config.log_sink_url {
        Some(url) => Arc::new(HttpEventLog::new(url.clone())),
        None => Arc::new(NoopEventLog),
    };

    let fetch_stage = HttpFetchStage::new(config.renderer_url.clone())
        .map_err(|e| anyhow::anyhow!("fetch stage client: {e}"))?;
    let analyze_stage = HttpAnalyzeStage::new(config.analyzer_url.clone())
        .map_err(|e| anyhow::anyhow!("analyze stage client: {e}"))?;

    Ok(Arc::new(ServerDeps::new(
        blob_store.clone(),
        Arc::new(SerpWebSearch::new(config.serp_api_key.clone())),
        Arc::new(HttpProbeFetch::new()?),
        Arc::new(fetch_stage),
        Arc::new(analyze_stage),
        Arc::new(BlobDataset::new(blob_store)),
        event_log,
    )))
}

/// Build the Axum application router
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/eol/initialize-job", post(initialize_job_handler))
        .route("/eol/fetch-url", post(fetch_url_handler))
        .route("/eol/analyze-job", post(analyze_job_handler))
        .route("/eol/job-status/:job_id", get(job_status_handler))
        .route(
            "/eol/auto-check",
            get(get_auto_check_handler).post(set_auto_check_handler),
        )
        .route("/auth-check", get(auth_check_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
