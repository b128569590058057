//! Fire-and-forget stage triggers.
//!
//! A trigger instructs a stage endpoint to process the next unit of work.
//! The HTTP call is dispatched with a long timeout but its failure to
//! respond in time is explicitly NOT a failure of the stage: the outcome is
//! three-valued, and the job record — not the trigger response — is the
//! arbiter of what actually happened.

use std::time::Duration;

use crate::common::JobId;

use super::models::{Job, UrlEntry};

/// Outcome of firing a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The stage endpoint accepted the work.
    Accepted,
    /// The endpoint definitively rejected the work after retries.
    Failed { status: Option<u16>, message: String },
    /// The call timed out client-side; the stage is assumed to still be
    /// running server-side.
    AssumedInProgress,
}

/// Extra attempts after the first on a non-2xx response.
const TRIGGER_RETRIES: u32 = 2;

/// Per-call timeout. Stage work can legitimately outlive this; see
/// `TriggerOutcome::AssumedInProgress`.
const TRIGGER_TIMEOUT_SECS: u64 = 60;

pub struct TriggerClient {
    client: reqwest::Client,
    base_url: String,
}

impl TriggerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TRIGGER_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Instruct the fetch stage to process one pending URL entry.
    pub async fn trigger_fetch(&self, job: &Job, entry: &UrlEntry) -> TriggerOutcome {
        let body = serde_json::json!({
            "jobId": job.id,
            "urlIndex": entry.index,
            "url": entry.url,
            "title": entry.title,
            "snippet": entry.snippet,
            "method": entry.method,
        });
        self.post_with_retry("/api/eol/fetch-url", body).await
    }

    /// Instruct the classification stage to run.
    pub async fn trigger_analyze(&self, job_id: JobId) -> TriggerOutcome {
        let body = serde_json::json!({ "jobId": job_id });
        self.post_with_retry("/api/eol/analyze-job", body).await
    }

    async fn post_with_retry(&self, path: &str, body: serde_json::Value) -> TriggerOutcome {
        let url = format!("{}{}", self.base_url, path);
        let mut last_failure = TriggerOutcome::Failed {
            status: None,
            message: "trigger never dispatched".to_string(),
        };

        for attempt in 1..=(1 + TRIGGER_RETRIES) {
            match self.client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => return TriggerOutcome::Accepted,
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let message = resp.text().await.unwrap_or_default();
                    tracing::warn!(path, attempt, status, "trigger rejected");
                    last_failure = TriggerOutcome::Failed {
                        status: Some(status),
                        message,
                    };
                }
                Err(e) if e.is_timeout() => {
                    // Deliberately not retried: the stage is likely still
                    // running server-side and a retry would double-fire it.
                    tracing::info!(path, "trigger timed out, assuming stage in progress");
                    return TriggerOutcome::AssumedInProgress;
                }
                Err(e) => {
                    tracing::warn!(path, attempt, "trigger transport failure: {e}");
                    last_failure = TriggerOutcome::Failed {
                        status: None,
                        message: e.to_string(),
                    };
                }
            }

            if attempt <= TRIGGER_RETRIES {
                // Linear backoff: 1s, 2s.
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
        }

        last_failure
    }
}
