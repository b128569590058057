//! Polling driver: the control loop that advances a job.
//!
//! Each iteration reads the job record fresh and decides which trigger (if
//! any) to fire next. Trigger failures are logged and absorbed — the next
//! read of the record decides what really happened. Read failures
//! propagate immediately.
//!
//! The driver holds no persistent state: its two one-shot latches live only
//! for one poll session, which is safe because the stage handlers no-op on
//! records that already moved on.

use async_trait::async_trait;
use std::time::Duration;

use crate::common::JobId;

use super::error::EolError;
use super::models::{EolClassification, Job, JobStatus, UrlEntry, UrlStatus};
use super::triggers::{TriggerClient, TriggerOutcome};

/// Maximum poll iterations per session.
pub const POLL_BUDGET: usize = 60;

/// Fixed sleep between iterations.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What a poll session ended with. Budget exhaustion is a value, not an
/// error: the job is left exactly as the store last reported it and a later
/// session may resume it.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(EolClassification),
    /// The job failed on a rate limit; the caller should wait this long.
    CoolingDown { retry_seconds: u64 },
    /// Budget exhausted. Carries a synthetic UNKNOWN classification with
    /// explanatory text.
    TimedOut(EolClassification),
}

/// Seam between the driver and the job API. The HTTP implementation is used
/// by real callers; tests script one directly.
#[async_trait]
pub trait PollBackend: Send + Sync {
    /// Read the job snapshot. Transport failures must surface as errors.
    async fn read_job(&self, id: JobId) -> Result<Job, EolError>;

    async fn trigger_fetch(&self, job: &Job, entry: &UrlEntry) -> TriggerOutcome;

    async fn trigger_analyze(&self, id: JobId) -> TriggerOutcome;
}

pub struct PollDriver<'a> {
    backend: &'a dyn PollBackend,
}

impl<'a> PollDriver<'a> {
    pub fn new(backend: &'a dyn PollBackend) -> Self {
        Self { backend }
    }

    /// Drive one job until it terminates or the iteration budget runs out.
    pub async fn poll(&self, job_id: JobId) -> Result<PollOutcome, EolError> {
        let mut fetch_triggered = false;
        let mut analyze_triggered = false;

        for iteration in 0..POLL_BUDGET {
            let job = self.backend.read_job(job_id).await?;

            match job.status {
                JobStatus::Complete => {
                    let classification = job.result.ok_or_else(|| {
                        EolError::JobFailed("job is complete but carries no result".to_string())
                    })?;
                    return Ok(PollOutcome::Completed(classification));
                }
                JobStatus::Error if job.is_daily_limit => {
                    return Ok(PollOutcome::CoolingDown {
                        retry_seconds: job.retry_seconds.unwrap_or(60),
                    });
                }
                JobStatus::Error => {
                    return Err(EolError::JobFailed(
                        job.error.unwrap_or_else(|| "unknown job error".to_string()),
                    ));
                }
                _ => {}
            }

            if job.status == JobStatus::UrlsReady
                && !fetch_triggered
                && job.urls.first().map(|e| e.status) == Some(UrlStatus::Pending)
            {
                // Only entry 0 is ever dispatched; multi-URL concurrent
                // fetching is deliberately not supported.
                fetch_triggered = true;
                let outcome = self.backend.trigger_fetch(&job, &job.urls[0]).await;
                log_trigger("fetch", job_id, iteration, &outcome);
            } else if !analyze_triggered && job.awaiting_analysis() {
                analyze_triggered = true;
                let outcome = self.backend.trigger_analyze(job_id).await;
                log_trigger("analyze", job_id, iteration, &outcome);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }

        tracing::warn!(job_id = %job_id, "poll budget exhausted, returning synthetic timeout");
        Ok(PollOutcome::TimedOut(timeout_classification()))
    }
}

fn log_trigger(stage: &str, job_id: JobId, iteration: usize, outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Accepted => {
            tracing::debug!(job_id = %job_id, stage, iteration, "trigger accepted");
        }
        TriggerOutcome::AssumedInProgress => {
            tracing::info!(job_id = %job_id, stage, iteration, "trigger timed out, assumed in progress");
        }
        // Absorbed: the next record read is the arbiter of truth.
        TriggerOutcome::Failed { status, message } => {
            tracing::warn!(job_id = %job_id, stage, iteration, ?status, message, "trigger failed");
        }
    }
}

fn timeout_classification() -> EolClassification {
    EolClassification::insufficient_information(
        "Status check timed out before the job finished; the job may still be running and can be polled again later.",
    )
}

/// HTTP implementation of `PollBackend` against the job API.
pub struct HttpPollBackend {
    client: reqwest::Client,
    triggers: TriggerClient,
    base_url: String,
}

/// Status reads are cheap; a slow read is a transport problem, not a
/// long-running stage.
const READ_TIMEOUT_SECS: u64 = 10;

impl HttpPollBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            triggers: TriggerClient::new(base_url.clone()),
            base_url,
        }
    }
}

#[async_trait]
impl PollBackend for HttpPollBackend {
    async fn read_job(&self, id: JobId) -> Result<Job, EolError> {
        let url = format!("{}/api/eol/job-status/{}", self.base_url, id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EolError::Transport(format!("status read failed: {e}")))?;

        if resp.status().as_u16() == 404 {
            return Err(EolError::JobNotFound(id));
        }
        if !resp.status().is_success() {
            return Err(EolError::Transport(format!(
                "status read returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| EolError::Transport(format!("status response parse failed: {e}")))
    }

    async fn trigger_fetch(&self, job: &Job, entry: &UrlEntry) -> TriggerOutcome {
        self.triggers.trigger_fetch(job, entry).await
    }

    async fn trigger_analyze(&self, id: JobId) -> TriggerOutcome {
        self.triggers.trigger_analyze(id).await
    }
}
