// Common test utilities
//
// Two PollBackend implementations back the driver tests:
// - ScriptedPollBackend replays a canned sequence of job snapshots and
//   records which triggers fired (state-machine tests).
// - DirectBackend runs the real stage actions inline against mock kernel
//   services (pipeline tests).

use async_trait::async_trait;
use std::sync::Mutex;

use server_core::common::JobId;
use server_core::domains::eol::actions::{run_analyze_stage, run_fetch_stage};
use server_core::domains::eol::error::EolError;
use server_core::domains::eol::models::{Job, UrlEntry};
use server_core::domains::eol::poll::PollBackend;
use server_core::domains::eol::store::JobStore;
use server_core::domains::eol::triggers::TriggerOutcome;
use server_core::kernel::ServerDeps;

// =============================================================================
// ScriptedPollBackend
// =============================================================================

pub struct ScriptedPollBackend {
    snapshots: Mutex<Vec<Job>>,
    fail_reads: Mutex<bool>,
    fetch_outcome: Mutex<TriggerOutcome>,
    analyze_outcome: Mutex<TriggerOutcome>,
    fetch_calls: Mutex<Vec<usize>>,
    analyze_calls: Mutex<usize>,
}

impl ScriptedPollBackend {
    /// Snapshots are returned in order, one per read; the last one repeats.
    pub fn new(snapshots: Vec<Job>) -> Self {
        assert!(!snapshots.is_empty(), "script needs at least one snapshot");
        Self {
            snapshots: Mutex::new(snapshots),
            fail_reads: Mutex::new(false),
            fetch_outcome: Mutex::new(TriggerOutcome::Accepted),
            analyze_outcome: Mutex::new(TriggerOutcome::Accepted),
            fetch_calls: Mutex::new(Vec::new()),
            analyze_calls: Mutex::new(0),
        }
    }

    pub fn failing_reads() -> Self {
        let backend = Self::new(vec![Job::new("x", "y")]);
        *backend.fail_reads.lock().unwrap() = true;
        backend
    }

    pub fn with_fetch_outcome(self, outcome: TriggerOutcome) -> Self {
        *self.fetch_outcome.lock().unwrap() = outcome;
        self
    }

    /// Entry indexes the driver asked to fetch, in order.
    pub fn fetch_calls(&self) -> Vec<usize> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn analyze_calls(&self) -> usize {
        *self.analyze_calls.lock().unwrap()
    }
}

#[async_trait]
impl PollBackend for ScriptedPollBackend {
    async fn read_job(&self, _id: JobId) -> Result<Job, EolError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(EolError::Transport("scripted read failure".to_string()));
        }
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.len() > 1 {
            Ok(snapshots.remove(0))
        } else {
            Ok(snapshots[0].clone())
        }
    }

    async fn trigger_fetch(&self, _job: &Job, entry: &UrlEntry) -> TriggerOutcome {
        self.fetch_calls.lock().unwrap().push(entry.index);
        self.fetch_outcome.lock().unwrap().clone()
    }

    async fn trigger_analyze(&self, _id: JobId) -> TriggerOutcome {
        *self.analyze_calls.lock().unwrap() += 1;
        self.analyze_outcome.lock().unwrap().clone()
    }
}

// =============================================================================
// DirectBackend
// =============================================================================

/// Runs the stage actions inline instead of over HTTP. The blob store stays
/// the arbiter of state exactly as in production.
pub struct DirectBackend {
    deps: ServerDeps,
}

impl DirectBackend {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl PollBackend for DirectBackend {
    async fn read_job(&self, id: JobId) -> Result<Job, EolError> {
        JobStore::new(self.deps.blob_store.clone()).get(id).await
    }

    async fn trigger_fetch(&self, job: &Job, entry: &UrlEntry) -> TriggerOutcome {
        match run_fetch_stage(job.id, entry.index, Some(&entry.url), &self.deps).await {
            Ok(()) => TriggerOutcome::Accepted,
            Err(e) => TriggerOutcome::Failed {
                status: None,
                message: e.to_string(),
            },
        }
    }

    async fn trigger_analyze(&self, id: JobId) -> TriggerOutcome {
        match run_analyze_stage(id, &self.deps).await {
            Ok(()) => TriggerOutcome::Accepted,
            Err(e) => TriggerOutcome::Failed {
                status: None,
                message: e.to_string(),
            },
        }
    }
}
