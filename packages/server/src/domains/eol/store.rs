//! Job record store over the blob-store collaborator.
//!
//! One blob per job under `eol-jobs/`. All mutation helpers re-read the
//! record, apply a full overwrite of the affected field, and save; nothing
//! holds job state in memory across calls.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::common::JobId;
use crate::kernel::traits::{BaseBlobStore, ReadConsistency};

use super::error::EolError;
use super::models::{EolClassification, Job, JobStatus, UrlEntry, UrlStatus};

const JOB_PREFIX: &str = "eol-jobs/";

/// An entry left in `fetching` this long with no completion is normalized to
/// `error` on read, so a crashed fetch invocation cannot block analysis.
const STUCK_ENTRY_MINUTES: i64 = 5;

/// Terminal jobs older than this are swept opportunistically on creation.
const RETENTION_DAYS: i64 = 7;

fn job_key(id: JobId) -> String {
    format!("{JOB_PREFIX}{id}")
}

#[derive(Clone)]
pub struct JobStore {
    blobs: Arc<dyn BaseBlobStore>,
}

impl JobStore {
    pub fn new(blobs: Arc<dyn BaseBlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn create(&self, job: &Job) -> Result<(), EolError> {
        self.save(job).await
    }

    pub async fn save(&self, job: &Job) -> Result<(), EolError> {
        let value = serde_json::to_value(job)
            .map_err(|e| EolError::Storage(anyhow::anyhow!("job serialization failed: {e}")))?;
        self.blobs
            .set(&job_key(job.id), value)
            .await
            .map_err(EolError::Storage)
    }

    /// Fetch a job with a strong read and run the stuck-entry normalization
    /// pass. Normalized records are written back so every reader converges.
    pub async fn get(&self, id: JobId) -> Result<Job, EolError> {
        let mut job = self.try_get(id).await?.ok_or(EolError::JobNotFound(id))?;
        if normalize_stuck_entries(&mut job, Utc::now()) {
            tracing::warn!(job_id = %id, "normalized stuck url entries");
            self.save(&job).await?;
        }
        Ok(job)
    }

    pub async fn try_get(&self, id: JobId) -> Result<Option<Job>, EolError> {
        let value = self
            .blobs
            .get(&job_key(id), ReadConsistency::Strong)
            .await
            .map_err(EolError::Storage)?;
        match value {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| EolError::Storage(anyhow::anyhow!("job blob is malformed: {e}"))),
            None => Ok(None),
        }
    }

    /// Overwrite one URL entry wholesale, keyed by index. Concurrent
    /// deliveries of the same trigger thus converge on the last full write
    /// instead of interleaving partial patches.
    pub async fn update_entry(&self, id: JobId, entry: UrlEntry) -> Result<Job, EolError> {
        let mut job = self.get(id).await?;
        let index = entry.index;
        let slot = job
            .urls
            .get_mut(index)
            .ok_or_else(|| EolError::Validation(format!("job {id} has no url entry {index}")))?;
        *slot = entry;
        self.save(&job).await?;
        Ok(job)
    }

    pub async fn set_status(&self, id: JobId, status: JobStatus) -> Result<Job, EolError> {
        let mut job = self.get(id).await?;
        job.status = status;
        self.save(&job).await?;
        Ok(job)
    }

    pub async fn complete(
        &self,
        id: JobId,
        classification: EolClassification,
    ) -> Result<Job, EolError> {
        let mut job = self.get(id).await?;
        job.mark_complete(classification);
        self.save(&job).await?;
        Ok(job)
    }

    pub async fn fail(
        &self,
        id: JobId,
        message: impl Into<String>,
        is_daily_limit: bool,
        retry_seconds: Option<u64>,
    ) -> Result<Job, EolError> {
        let mut job = self.get(id).await?;
        job.mark_error(message, is_daily_limit, retry_seconds);
        self.save(&job).await?;
        Ok(job)
    }

    /// Delete terminal jobs older than the retention window. Returns the
    /// number of records removed. Failures to parse individual blobs are
    /// skipped, not fatal.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<usize, EolError> {
        let keys = self
            .blobs
            .list(JOB_PREFIX)
            .await
            .map_err(EolError::Storage)?;

        let cutoff = now - Duration::days(RETENTION_DAYS);
        let mut removed = 0;
        for key in keys {
            let Ok(Some(value)) = self.blobs.get(&key, ReadConsistency::Eventual).await else {
                continue;
            };
            let Ok(job) = serde_json::from_value::<Job>(value) else {
                continue;
            };
            if job.is_terminal() && job.created_at < cutoff {
                self.blobs.delete(&key).await.map_err(EolError::Storage)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "swept expired jobs");
        }
        Ok(removed)
    }
}

/// Flip entries stuck in `fetching` to `error` once the job is old enough
/// that the fetch invocation has certainly died. Returns true when the
/// record changed.
fn normalize_stuck_entries(job: &mut Job, now: DateTime<Utc>) -> bool {
    if job.is_terminal() {
        return false;
    }
    if now - job.created_at <= Duration::minutes(STUCK_ENTRY_MINUTES) {
        return false;
    }
    let mut changed = false;
    for entry in &mut job.urls {
        if entry.status == UrlStatus::Fetching {
            entry.status = UrlStatus::Error;
            entry.error = Some("fetch stalled; no completion recorded".to_string());
            changed = true;
        }
    }
    changed
}
