//! HTTP handlers for the EOL job API.
//!
//! The two stage endpoints (`fetch-url`, `analyze-job`) accept quickly and
//! run the stage in a spawned task; callers learn the real outcome by
//! re-reading the job record, never from these responses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::JobId;
use crate::domains::eol::actions::{initialize_job, run_analyze_stage, run_fetch_stage};
use crate::domains::eol::error::EolError;
use crate::domains::eol::guard::QuotaGuard;
use crate::domains::eol::models::{AutoCheckState, FetchMethod, Job, JobStatus};
use crate::domains::eol::store::JobStore;
use crate::server::app::AppState;

/// Wrapper mapping domain errors onto HTTP responses.
pub struct ApiError(pub EolError);

impl From<EolError> for ApiError {
    fn from(err: EolError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            EolError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            EolError::JobNotFound(id) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": format!("job not found: {id}") }),
            ),
            EolError::RateLimited { retry_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({
                    "error": self.0.to_string(),
                    "isDailyLimit": true,
                    "retrySeconds": retry_seconds,
                }),
            ),
            EolError::SearchFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": msg }),
            ),
            EolError::Transport(msg) => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": msg }),
            ),
            EolError::Storage(_) | EolError::JobFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.0.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// initialize-job
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeJobRequest {
    pub maker: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub url_count: usize,
    pub strategy: String,
}

pub async fn initialize_job_handler(
    State(state): State<AppState>,
    Json(request): Json<InitializeJobRequest>,
) -> Result<Json<InitializeJobResponse>, ApiError> {
    let outcome = initialize_job(&request.maker, &request.model, &state.deps).await?;
    Ok(Json(InitializeJobResponse {
        job_id: outcome.job.id,
        status: outcome.job.status,
        url_count: outcome.job.urls.len(),
        strategy: outcome.strategy,
    }))
}

// =============================================================================
// fetch-url / analyze-job (202-style accepts)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchUrlRequest {
    pub job_id: JobId,
    pub url_index: usize,
    /// Entry metadata as seen by the trigger. `url` guards against stale
    /// deliveries; the rest is descriptive.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub method: Option<FetchMethod>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub accepted: bool,
    pub job_id: JobId,
}

pub async fn fetch_url_handler(
    State(state): State<AppState>,
    Json(request): Json<FetchUrlRequest>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let deps = state.deps.clone();
    let job_id = request.job_id;
    tokio::spawn(async move {
        let expected_url = request.url.as_deref();
        if let Err(e) = run_fetch_stage(job_id, request.url_index, expected_url, &deps).await {
            tracing::error!(job_id = %job_id, url_index = request.url_index, "fetch stage error: {e}");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: true,
            job_id,
        }),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJobRequest {
    pub job_id: JobId,
}

pub async fn analyze_job_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeJobRequest>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let deps = state.deps.clone();
    let job_id = request.job_id;
    tokio::spawn(async move {
        if let Err(e) = run_analyze_stage(job_id, &deps).await {
            tracing::error!(job_id = %job_id, "analyze stage error: {e}");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: true,
            job_id,
        }),
    )
}

// =============================================================================
// job-status
// =============================================================================

pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<Json<Job>, ApiError> {
    let store = JobStore::new(state.deps.blob_store.clone());
    let job = store.get(job_id).await?;
    Ok(Json(job))
}

// =============================================================================
// auto-check state
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCheckUpdate {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub is_running: Option<bool>,
}

pub async fn get_auto_check_handler(
    State(state): State<AppState>,
) -> Result<Json<AutoCheckState>, ApiError> {
    let guard = QuotaGuard::new(&state.deps);
    // Surface stuck-run recovery to readers too.
    guard.health_check().await?;
    Ok(Json(guard.load().await?))
}

pub async fn set_auto_check_handler(
    State(state): State<AppState>,
    Json(update): Json<AutoCheckUpdate>,
) -> Result<Json<AutoCheckState>, ApiError> {
    let guard = QuotaGuard::new(&state.deps);
    let mut current = guard.load().await?;
    if let Some(enabled) = update.enabled {
        current.enabled = enabled;
    }
    if let Some(is_running) = update.is_running {
        current.is_running = is_running;
    }
    guard.save(&current).await?;
    Ok(Json(current))
}

// =============================================================================
// auth-check
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckResponse {
    pub authorized: bool,
}

/// Reaching this handler means the bearer middleware let the request in.
pub async fn auth_check_handler() -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse { authorized: true })
}
