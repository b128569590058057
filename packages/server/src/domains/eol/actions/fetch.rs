//! Fetch stage entry point.
//!
//! Invoked by the fetch-url trigger. Tolerates at-least-once delivery: the
//! record is re-read and the stage no-ops unless the addressed entry is
//! still `pending`. Every entry write is a full overwrite keyed by index.

use crate::common::JobId;
use crate::kernel::deps::ServerDeps;
use crate::kernel::traits::{BaseEventLog, BaseFetchStage, LogEvent};

use super::super::error::EolError;
use super::super::models::{JobStatus, UrlStatus};
use super::super::store::JobStore;

/// Retrieve and process one URL entry of a job.
///
/// `expected_url` guards against stale deliveries: when the trigger's URL no
/// longer matches the entry at that index, the delivery is dropped.
pub async fn run_fetch_stage(
    job_id: JobId,
    url_index: usize,
    expected_url: Option<&str>,
    deps: &ServerDeps,
) -> Result<(), EolError> {
    let store = JobStore::new(deps.blob_store.clone());
    let job = store.get(job_id).await?;

    if job.is_terminal() {
        tracing::info!(job_id = %job_id, "fetch trigger for terminal job ignored");
        return Ok(());
    }

    let entry = job
        .urls
        .get(url_index)
        .ok_or_else(|| EolError::Validation(format!("job {job_id} has no url entry {url_index}")))?;

    if let Some(expected) = expected_url {
        if entry.url != expected {
            tracing::warn!(
                job_id = %job_id,
                url_index,
                expected,
                actual = %entry.url,
                "fetch trigger url mismatch, dropping delivery"
            );
            return Ok(());
        }
    }

    if entry.status != UrlStatus::Pending {
        // Duplicate or late delivery; the first one won.
        tracing::info!(job_id = %job_id, url_index, status = ?entry.status, "entry not pending, fetch skipped");
        return Ok(());
    }

    // Mark fetching before dispatching to the engine.
    let mut entry = entry.clone();
    entry.status = UrlStatus::Fetching;
    store.update_entry(job_id, entry.clone()).await?;
    if job.status == JobStatus::UrlsReady {
        store.set_status(job_id, JobStatus::Fetching).await?;
    }

    match deps.fetch_stage.fetch(&entry.url, &entry.method).await {
        Ok(output) => {
            entry.status = UrlStatus::Complete;
            entry.content = Some(output.content);
            if entry.title.is_none() {
                entry.title = output.title;
            }
            entry.error = None;
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, url_index, "fetch stage failed: {e}");
            entry.status = UrlStatus::Error;
            entry.error = Some(e.to_string());
        }
    }

    let job = store.update_entry(job_id, entry).await?;

    if !job.is_terminal() && job.all_entries_terminal() {
        store.set_status(job_id, JobStatus::ReadyForAnalysis).await?;
    }

    deps.event_log.record(
        LogEvent::info("eol.fetch", "fetch stage finished").with_context(serde_json::json!({
            "jobId": job_id,
            "urlIndex": url_index,
        })),
    );

    Ok(())
}
