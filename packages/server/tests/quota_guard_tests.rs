//! Quota guard tests: daily ceiling, credit floor, cooldown, stuck-run
//! recovery.

use chrono::{Duration, Utc};

use server_core::domains::eol::guard::{
    Denial, QuotaGuard, DAILY_ATTEMPT_CEILING, SEARCH_CREDITS_FLOOR,
};
use server_core::domains::eol::models::auto_check::{quota_day, AutoCheckState};
use server_core::kernel::test_dependencies::{
    MockAnalyzeStage, MockDataset, MockFetchStage, MockProbeFetch, MockWebSearch, TestDependencies,
};

fn deps_with_credits(credits: i64) -> TestDependencies {
    TestDependencies::build(
        MockWebSearch::new().with_credits(credits),
        MockProbeFetch::new(),
        MockFetchStage::new(),
        MockAnalyzeStage::new(),
        MockDataset::new(),
    )
}

#[tokio::test]
async fn fresh_state_allows_a_run() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);
    assert_eq!(guard.can_proceed().await.unwrap(), None);
}

#[tokio::test]
async fn disabled_state_blocks_a_run() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    let state = AutoCheckState {
        enabled: false,
        ..Default::default()
    };
    guard.save(&state).await.unwrap();

    assert_eq!(guard.can_proceed().await.unwrap(), Some(Denial::Disabled));
}

#[tokio::test]
async fn run_in_progress_blocks_a_second_run() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    let state = AutoCheckState {
        is_running: true,
        last_activity: Some(Utc::now()),
        ..Default::default()
    };
    guard.save(&state).await.unwrap();

    assert_eq!(guard.can_proceed().await.unwrap(), Some(Denial::AlreadyRunning));
}

#[tokio::test]
async fn daily_ceiling_blocks_new_scheduled_work() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    let state = AutoCheckState {
        attempts_today: DAILY_ATTEMPT_CEILING,
        last_reset_date: Some(quota_day(Utc::now())),
        ..Default::default()
    };
    guard.save(&state).await.unwrap();

    assert_eq!(
        guard.can_proceed().await.unwrap(),
        Some(Denial::DailyCeilingReached)
    );
}

#[tokio::test]
async fn day_rollover_zeroes_the_counter_exactly_once() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    // Counter maxed out yesterday.
    let state = AutoCheckState {
        attempts_today: DAILY_ATTEMPT_CEILING,
        last_reset_date: Some(quota_day(Utc::now()) - Duration::days(1)),
        ..Default::default()
    };
    guard.save(&state).await.unwrap();

    // The rollover clears the ceiling.
    assert_eq!(guard.can_proceed().await.unwrap(), None);
    let rolled = guard.load().await.unwrap();
    assert_eq!(rolled.attempts_today, 0);
    assert_eq!(rolled.last_reset_date, Some(quota_day(Utc::now())));

    // Attempts within the same day are kept.
    guard.record_attempt().await.unwrap();
    guard.record_attempt().await.unwrap();
    assert_eq!(guard.can_proceed().await.unwrap(), None);
    assert_eq!(guard.load().await.unwrap().attempts_today, 2);
}

#[tokio::test]
async fn credit_floor_blocks_and_auto_disables() {
    let t = deps_with_credits(SEARCH_CREDITS_FLOOR);
    let guard = QuotaGuard::new(&t.deps);

    assert_eq!(
        guard.can_proceed().await.unwrap(),
        Some(Denial::SearchCreditsExhausted)
    );

    // Future runs are blocked up front, without another credit check.
    assert!(!guard.load().await.unwrap().enabled);
    assert_eq!(guard.can_proceed().await.unwrap(), Some(Denial::Disabled));
}

#[tokio::test]
async fn llm_cooldown_blocks_until_it_elapses() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    guard.note_rate_limit(600).await.unwrap();

    match guard.can_proceed().await.unwrap() {
        Some(Denial::CoolingDown { seconds }) => assert!(seconds > 0 && seconds <= 600),
        other => panic!("unexpected verdict {other:?}"),
    }
    assert!(guard.cooldown_seconds().await.unwrap().is_some());
}

#[tokio::test]
async fn stuck_run_is_reset_exactly_once() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    let state = AutoCheckState {
        is_running: true,
        last_activity: Some(Utc::now() - Duration::minutes(10)),
        ..Default::default()
    };
    guard.save(&state).await.unwrap();

    assert!(guard.health_check().await.unwrap());
    assert!(!guard.load().await.unwrap().is_running);

    // Idempotent on repeated checks.
    assert!(!guard.health_check().await.unwrap());
}

#[tokio::test]
async fn recently_active_run_is_not_reset() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    let state = AutoCheckState {
        is_running: true,
        last_activity: Some(Utc::now() - Duration::minutes(1)),
        ..Default::default()
    };
    guard.save(&state).await.unwrap();

    assert!(!guard.health_check().await.unwrap());
    assert!(guard.load().await.unwrap().is_running);
}

#[tokio::test]
async fn record_attempt_counts_and_stamps_activity() {
    let t = TestDependencies::new();
    let guard = QuotaGuard::new(&t.deps);

    guard.record_attempt().await.unwrap();
    let state = guard.load().await.unwrap();
    assert_eq!(state.attempts_today, 1);
    assert!(state.last_activity.is_some());
}
