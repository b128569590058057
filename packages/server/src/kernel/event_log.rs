//! Centralized log sink client.
//!
//! Delivery is fire-and-forget: the record call spawns a task and never
//! reports failure to the caller. Local `tracing` output is unaffected.

use std::sync::Arc;
use std::time::Duration;

use super::traits::{BaseEventLog, LogEvent};

const SINK_TIMEOUT_SECS: u64 = 5;

pub struct HttpEventLog {
    client: reqwest::Client,
    endpoint: Arc<String>,
}

impl HttpEventLog {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SINK_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: Arc::new(endpoint),
        }
    }
}

impl BaseEventLog for HttpEventLog {
    fn record(&self, event: LogEvent) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post(endpoint.as_str()).json(&event).send().await {
                tracing::debug!("event log delivery failed: {}", e);
            }
        });
    }
}

/// Event log used when no sink endpoint is configured.
#[derive(Default)]
pub struct NoopEventLog;

impl BaseEventLog for NoopEventLog {
    fn record(&self, _event: LogEvent) {}
}
