//! Scheduled daily driver tests: end-to-end over the direct backend with
//! mock kernel services.

mod common;

use common::DirectBackend;

use chrono::{Duration, Utc};

use server_core::domains::eol::daily::run_daily_check;
use server_core::domains::eol::guard::QuotaGuard;
use server_core::domains::eol::models::auto_check::AutoCheckState;
use server_core::domains::eol::models::{EolStatus, PartRecord};
use server_core::kernel::test_dependencies::{
    MockAnalyzeStage, MockDataset, MockFetchStage, MockProbeFetch, MockWebSearch, TestDependencies,
};

fn checked_part(maker: &str, model: &str, status: EolStatus) -> PartRecord {
    let mut part = PartRecord::new(maker, model);
    part.eol_status = Some(status);
    part.checked_at = Some(Utc::now() - Duration::days(1));
    part
}

#[tokio::test]
async fn disabled_auto_check_skips_the_run() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);
    guard
        .save(&AutoCheckState {
            enabled: false,
            ..Default::default()
        })
        .await
        .unwrap();

    let backend = DirectBackend::new(t.deps.clone());
    let summary = run_daily_check(&t.deps, &backend).await.unwrap();

    assert_eq!(summary.attempted, 0);
    assert!(summary.stopped_by.is_some());
    assert_eq!(t.dataset.replace_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn due_parts_are_checked_and_written_back() {
    // One part is fresh, one was never checked. The unchecked one resolves
    // instantly: zero search results close the job as UNKNOWN.
    let dataset = MockDataset::new().with_parts(vec![
        checked_part("Omron", "FRESH-1", EolStatus::Active),
        PartRecord::new("Acme", "X1"),
    ]);
    let t = TestDependencies::build(
        MockWebSearch::new(),
        MockProbeFetch::new(),
        MockFetchStage::new(),
        MockAnalyzeStage::new(),
        dataset,
    );

    let backend = DirectBackend::new(t.deps.clone());
    let summary = run_daily_check(&t.deps, &backend).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.completed, 1);

    let parts = t.dataset.parts();
    let fresh = parts.iter().find(|p| p.model == "FRESH-1").unwrap();
    let checked = parts.iter().find(|p| p.model == "X1").unwrap();
    assert_eq!(fresh.eol_status, Some(EolStatus::Active));
    assert_eq!(checked.eol_status, Some(EolStatus::Unknown));
    assert!(checked.checked_at.is_some());

    // The run released its flag.
    let state = QuotaGuard::new(&t.deps).load().await.unwrap();
    assert!(!state.is_running);
    assert_eq!(state.attempts_today, 1);
}

#[tokio::test(start_paused = true)]
async fn full_pipeline_classifies_a_part_through_fetch_and_analyze() {
    let dataset = MockDataset::new().with_parts(vec![PartRecord::new("Acme", "PLC-900")]);
    let t = TestDependencies::build(
        MockWebSearch::new().with_hits(vec![("https://example.com/eol-notice", "EOL notice")]),
        MockProbeFetch::new(),
        MockFetchStage::new().with_content("PLC-900 is discontinued, use PLC-901"),
        MockAnalyzeStage::new().with_classification(EolStatus::Discontinued, Some("PLC-901")),
        dataset,
    );

    let backend = DirectBackend::new(t.deps.clone());
    let summary = run_daily_check(&t.deps, &backend).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(t.fetch_stage.call_count(), 1);
    assert_eq!(t.analyze_stage.call_count(), 1);

    let parts = t.dataset.parts();
    assert_eq!(parts[0].eol_status, Some(EolStatus::Discontinued));
    assert_eq!(parts[0].successor.as_deref(), Some("PLC-901"));
    assert_eq!(parts[0].source_url.as_deref(), Some("https://example.com/source"));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_stops_the_batch_and_persists_the_cooldown() {
    let dataset = MockDataset::new().with_parts(vec![
        PartRecord::new("Acme", "A-1"),
        PartRecord::new("Acme", "A-2"),
    ]);
    let t = TestDependencies::build(
        MockWebSearch::new().with_hits(vec![("https://example.com/a", "A")]),
        MockProbeFetch::new(),
        MockFetchStage::new(),
        MockAnalyzeStage::new().with_rate_limit(240),
        dataset,
    );

    let backend = DirectBackend::new(t.deps.clone());
    let summary = run_daily_check(&t.deps, &backend).await.unwrap();

    // The first part hit the limit; the second was never attempted.
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.completed, 0);
    assert!(summary.stopped_by.is_some());

    let guard = QuotaGuard::new(&t.deps);
    assert!(guard.cooldown_seconds().await.unwrap().is_some());
    assert!(!guard.load().await.unwrap().is_running);
}

#[tokio::test(start_paused = true)]
async fn stuck_previous_run_is_recovered_before_starting() {
    let dataset = MockDataset::new().with_parts(vec![PartRecord::new("Acme", "X1")]);
    let t = TestDependencies::build(
        MockWebSearch::new(),
        MockProbeFetch::new(),
        MockFetchStage::new(),
        MockAnalyzeStage::new(),
        dataset,
    );

    // A crashed invocation left the running flag behind.
    let guard = QuotaGuard::new(&t.deps);
    guard
        .save(&AutoCheckState {
            is_running: true,
            last_activity: Some(Utc::now() - Duration::minutes(30)),
            ..Default::default()
        })
        .await
        .unwrap();

    let backend = DirectBackend::new(t.deps.clone());
    let summary = run_daily_check(&t.deps, &backend).await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert!(!guard.load().await.unwrap().is_running);
}
