//! Polling driver state machine tests against a scripted backend.

mod common;

use common::ScriptedPollBackend;

use server_core::domains::eol::error::EolError;
use server_core::domains::eol::models::{
    EolClassification, EolStatus, FetchMethod, Job, JobStatus, UrlEntry, UrlStatus,
};
use server_core::domains::eol::poll::{PollDriver, PollOutcome};
use server_core::domains::eol::triggers::TriggerOutcome;

fn urls_ready_job(entries: usize) -> Job {
    let mut job = Job::new("Acme", "X1");
    job.status = JobStatus::UrlsReady;
    job.urls = (0..entries)
        .map(|i| UrlEntry::pending(i, format!("https://example.com/{i}"), FetchMethod::Render))
        .collect();
    job
}

#[tokio::test]
async fn completed_job_returns_its_result_immediately() {
    let mut job = Job::new("Acme", "X1");
    job.mark_complete(EolClassification {
        status: EolStatus::Discontinued,
        successor: Some("X2".to_string()),
        source_url: None,
        reason: "maker notice".to_string(),
        confidence: Some(0.95),
    });
    let backend = ScriptedPollBackend::new(vec![job.clone()]);

    let outcome = PollDriver::new(&backend).poll(job.id).await.unwrap();
    match outcome {
        PollOutcome::Completed(classification) => {
            assert_eq!(classification.status, EolStatus::Discontinued);
            assert_eq!(classification.successor.as_deref(), Some("X2"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(backend.fetch_calls().is_empty());
    assert_eq!(backend.analyze_calls(), 0);
}

#[tokio::test]
async fn daily_limit_error_surfaces_cooldown_to_caller() {
    let mut job = Job::new("Acme", "X1");
    job.mark_error("classification rate limited", true, Some(300));
    let backend = ScriptedPollBackend::new(vec![job.clone()]);

    let outcome = PollDriver::new(&backend).poll(job.id).await.unwrap();
    match outcome {
        PollOutcome::CoolingDown { retry_seconds } => assert_eq!(retry_seconds, 300),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn plain_error_job_raises_a_failure() {
    let mut job = Job::new("Acme", "X1");
    job.mark_error("render engine exploded", false, None);
    let backend = ScriptedPollBackend::new(vec![job.clone()]);

    let err = PollDriver::new(&backend).poll(job.id).await.unwrap_err();
    match err {
        EolError::JobFailed(message) => assert!(message.contains("exploded")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn stuck_job_yields_synthetic_timeout_not_an_error() {
    // The job never leaves urls_ready across all 60 simulated ticks.
    let job = urls_ready_job(1);
    let backend = ScriptedPollBackend::new(vec![job.clone()]);

    let outcome = PollDriver::new(&backend).poll(job.id).await.unwrap();
    match outcome {
        PollOutcome::TimedOut(classification) => {
            assert_eq!(classification.status, EolStatus::Unknown);
            assert!(!classification.reason.is_empty());
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // The session latch kept the driver from re-firing the fetch trigger.
    assert_eq!(backend.fetch_calls(), vec![0]);
    assert_eq!(backend.analyze_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn only_entry_zero_is_ever_dispatched() {
    // First snapshot: two pending entries. After the driver fires the fetch
    // for entry 0, the store reports entry 0 complete and entry 1 still
    // pending — and nothing ever picks entry 1 up.
    let first = urls_ready_job(2);
    let mut second = first.clone();
    second.urls[0].status = UrlStatus::Complete;
    second.urls[0].content = Some("body".to_string());
    let backend = ScriptedPollBackend::new(vec![first.clone(), second]);

    let outcome = PollDriver::new(&backend).poll(first.id).await.unwrap();
    assert!(matches!(outcome, PollOutcome::TimedOut(_)));

    // Single-URL-at-a-time: entry 1 is never dispatched.
    assert_eq!(backend.fetch_calls(), vec![0]);
    assert_eq!(backend.analyze_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn analyze_fires_once_when_every_entry_is_terminal() {
    let mut fetched = urls_ready_job(2);
    fetched.status = JobStatus::Fetching;
    fetched.urls[0].status = UrlStatus::Complete;
    fetched.urls[0].content = Some("a".to_string());
    fetched.urls[1].status = UrlStatus::Error;
    fetched.urls[1].error = Some("404".to_string());

    let mut done = fetched.clone();
    done.mark_complete(EolClassification::insufficient_information("test"));

    let backend = ScriptedPollBackend::new(vec![fetched.clone(), done]);

    let outcome = PollDriver::new(&backend).poll(fetched.id).await.unwrap();
    assert!(matches!(outcome, PollOutcome::Completed(_)));
    assert_eq!(backend.analyze_calls(), 1);
    assert!(backend.fetch_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn definite_trigger_failure_is_absorbed_not_raised() {
    let job = urls_ready_job(1);
    let backend = ScriptedPollBackend::new(vec![job.clone()]).with_fetch_outcome(
        TriggerOutcome::Failed {
            status: Some(500),
            message: "stage endpoint down".to_string(),
        },
    );

    // The driver keeps polling; the record never moves; budget exhausts.
    let outcome = PollDriver::new(&backend).poll(job.id).await.unwrap();
    assert!(matches!(outcome, PollOutcome::TimedOut(_)));
}

#[tokio::test]
async fn status_read_failure_propagates_immediately() {
    let backend = ScriptedPollBackend::failing_reads();
    let err = PollDriver::new(&backend)
        .poll(server_core::common::JobId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EolError::Transport(_)));
}
