//! Scheduled daily driver.
//!
//! Reads the current parts dataset, picks the rows due for a check, and
//! drives one job per part through the polling driver — within whatever the
//! quota guard allows. Results are written back with a dataset replace.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use crate::kernel::deps::ServerDeps;
use crate::kernel::traits::{BaseDataset, BaseEventLog, LogEvent};

use super::actions::initialize_job;
use super::error::EolError;
use super::guard::QuotaGuard;
use super::poll::{HttpPollBackend, PollBackend, PollDriver, PollOutcome};

/// Cron expression for the daily run: 21:00 UTC = 06:00 JST.
const DAILY_CRON: &str = "0 0 21 * * *";

#[derive(Debug, Default)]
pub struct DailyRunSummary {
    pub attempted: u32,
    pub completed: u32,
    pub failed: u32,
    /// Set when the guard refused to start or cut the batch short.
    pub stopped_by: Option<String>,
}

/// Run one scheduled check batch.
pub async fn run_daily_check(
    deps: &ServerDeps,
    backend: &dyn PollBackend,
) -> Result<DailyRunSummary, EolError> {
    let guard = QuotaGuard::new(deps);

    // A crashed previous invocation must not wedge the scheduler.
    guard.health_check().await?;

    if let Some(denial) = guard.can_proceed().await? {
        tracing::info!(%denial, "scheduled run skipped");
        return Ok(DailyRunSummary {
            stopped_by: Some(denial.to_string()),
            ..Default::default()
        });
    }

    guard.mark_run_started().await?;
    let result = drive_batch(deps, backend, &guard).await;
    guard.mark_run_finished().await?;

    let summary = result?;
    deps.event_log.record(
        LogEvent::info("eol.daily", "scheduled run finished").with_context(serde_json::json!({
            "attempted": summary.attempted,
            "completed": summary.completed,
            "failed": summary.failed,
            "stoppedBy": summary.stopped_by,
        })),
    );
    Ok(summary)
}

async fn drive_batch(
    deps: &ServerDeps,
    backend: &dyn PollBackend,
    guard: &QuotaGuard,
) -> Result<DailyRunSummary, EolError> {
    let mut summary = DailyRunSummary::default();
    let now = Utc::now();

    let mut parts = deps
        .dataset
        .read()
        .await
        .map_err(|e| EolError::Storage(anyhow::anyhow!("dataset read failed: {e}")))?;

    let driver = PollDriver::new(backend);

    for part in parts.iter_mut().filter(|p| p.needs_check(now)) {
        if let Some(denial) = guard.can_continue().await? {
            tracing::info!(%denial, "batch cut short by quota guard");
            summary.stopped_by = Some(denial.to_string());
            break;
        }

        guard.record_attempt().await?;
        summary.attempted += 1;

        let outcome = match initialize_job(&part.maker, &part.model, deps).await {
            Ok(initialized) => driver.poll(initialized.job.id).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(PollOutcome::Completed(classification)) => {
                part.apply_classification(&classification, Utc::now());
                summary.completed += 1;
            }
            Ok(PollOutcome::CoolingDown { retry_seconds }) => {
                tracing::warn!(retry_seconds, "rate limit hit, stopping batch");
                if let Err(e) = guard.note_rate_limit(retry_seconds).await {
                    tracing::warn!("failed to persist cooldown: {e}");
                }
                summary.failed += 1;
                summary.stopped_by = Some(format!("rate limited, retry in {retry_seconds}s"));
                break;
            }
            Ok(PollOutcome::TimedOut(_)) => {
                // Leave the part untouched; the job may still finish and the
                // next run will pick the part up again.
                tracing::warn!(maker = %part.maker, model = %part.model, "job did not finish in time");
                summary.failed += 1;
            }
            Err(e) => {
                tracing::warn!(maker = %part.maker, model = %part.model, "scheduled check failed: {e}");
                summary.failed += 1;
            }
        }
    }

    deps.dataset
        .replace(parts)
        .await
        .map_err(|e| EolError::Storage(anyhow::anyhow!("dataset replace failed: {e}")))?;

    Ok(summary)
}

/// Start the cron scheduler with the daily check job.
pub async fn start_scheduler(deps: Arc<ServerDeps>, self_base_url: String) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = CronJob::new_async(DAILY_CRON, move |_uuid, _lock| {
        let deps = deps.clone();
        let base_url = self_base_url.clone();
        Box::pin(async move {
            let backend = HttpPollBackend::new(base_url);
            match run_daily_check(&deps, &backend).await {
                Ok(summary) => tracing::info!(
                    attempted = summary.attempted,
                    completed = summary.completed,
                    failed = summary.failed,
                    "daily EOL check finished"
                ),
                Err(e) => tracing::error!("daily EOL check failed: {}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!("scheduled tasks started (daily EOL check at 06:00 JST)");
    Ok(scheduler)
}
