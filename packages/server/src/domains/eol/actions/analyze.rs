//! Classification stage entry point.
//!
//! Invoked by the analyze-job trigger once every URL entry is terminal.
//! Tolerates at-least-once delivery: a job that is no longer awaiting
//! analysis is skipped.

use crate::common::JobId;
use crate::kernel::deps::ServerDeps;
use crate::kernel::traits::{BaseAnalyzeStage, BaseEventLog, LogEvent, SourceDoc, StageError};

use super::super::error::EolError;
use super::super::guard::QuotaGuard;
use super::super::models::{EolClassification, JobStatus, UrlStatus};
use super::super::store::JobStore;

/// Run the classification stage for a job.
pub async fn run_analyze_stage(job_id: JobId, deps: &ServerDeps) -> Result<(), EolError> {
    let store = JobStore::new(deps.blob_store.clone());
    let job = store.get(job_id).await?;

    if !job.awaiting_analysis() {
        tracing::info!(job_id = %job_id, status = ?job.status, "job not awaiting analysis, skipped");
        return Ok(());
    }

    store.set_status(job_id, JobStatus::Analyzing).await?;

    let sources: Vec<SourceDoc> = job
        .urls
        .iter()
        .filter(|e| e.status == UrlStatus::Complete)
        .filter_map(|e| {
            e.content.as_ref().map(|content| SourceDoc {
                url: e.url.clone(),
                content: content.clone(),
            })
        })
        .collect();

    if sources.is_empty() {
        // Every candidate page failed; there is nothing to hand the model.
        store
            .complete(
                job_id,
                EolClassification::insufficient_information(
                    "No candidate page could be fetched; not enough information to determine EOL status.",
                ),
            )
            .await?;
        return Ok(());
    }

    let guard = QuotaGuard::new(deps);
    match deps.analyze_stage.analyze(&job.maker, &job.model, &sources).await {
        Ok(output) => {
            store.complete(job_id, output.classification.clone()).await?;
            if let Some(tokens) = output.tokens_remaining {
                if let Err(e) = guard.note_tokens_remaining(tokens).await {
                    tracing::warn!("failed to record token signal: {e}");
                }
            }
            deps.event_log.record(
                LogEvent::info("eol.analyze", "job classified").with_context(serde_json::json!({
                    "jobId": job_id,
                    "status": output.classification.status,
                })),
            );
        }
        Err(StageError::RateLimited { retry_seconds }) => {
            store
                .fail(job_id, "classification rate limited", true, Some(retry_seconds))
                .await?;
            if let Err(e) = guard.note_rate_limit(retry_seconds).await {
                tracing::warn!("failed to record rate limit cooldown: {e}");
            }
            deps.event_log.record(
                LogEvent::warn("eol.analyze", "classification rate limited").with_context(
                    serde_json::json!({ "jobId": job_id, "retrySeconds": retry_seconds }),
                ),
            );
        }
        Err(StageError::Failed(message)) => {
            store.fail(job_id, &message, false, None).await?;
            deps.event_log.record(
                LogEvent::warn("eol.analyze", "classification failed")
                    .with_context(serde_json::json!({ "jobId": job_id, "error": message })),
            );
        }
    }

    Ok(())
}
