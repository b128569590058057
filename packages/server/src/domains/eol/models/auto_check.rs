//! Persisted state for the scheduled auto-check driver.
//!
//! One record in the blob store, read-modified-saved by the quota guard.
//! All date math here is pure so it can be tested without a clock.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Offset of the quota day boundary. The manufacturer table is Japan-heavy
/// and the search vendor's billing day follows JST.
pub const QUOTA_TZ_OFFSET_HOURS: i32 = 9;

/// A scheduled run with no recorded activity for longer than this is
/// considered crashed and forcibly reset.
pub const STUCK_RUN_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCheckState {
    /// Master switch for scheduled runs. Auto-cleared when the search-credit
    /// floor is breached.
    pub enabled: bool,
    pub is_running: bool,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts_today: u32,
    #[serde(default)]
    pub last_reset_date: Option<NaiveDate>,
    /// Set when the classification gateway reported a rate limit.
    #[serde(default)]
    pub llm_cooldown_until: Option<DateTime<Utc>>,
    /// Remaining-token signal from the last classification response.
    #[serde(default)]
    pub tokens_remaining: Option<i64>,
}

impl Default for AutoCheckState {
    fn default() -> Self {
        Self {
            enabled: true,
            is_running: false,
            last_activity: None,
            attempts_today: 0,
            last_reset_date: None,
            llm_cooldown_until: None,
            tokens_remaining: None,
        }
    }
}

/// The calendar date of `now` in the fixed quota timezone.
pub fn quota_day(now: DateTime<Utc>) -> NaiveDate {
    let offset = FixedOffset::east_opt(QUOTA_TZ_OFFSET_HOURS * 3600)
        .expect("static offset is in range");
    now.with_timezone(&offset).date_naive()
}

impl AutoCheckState {
    /// Zero the attempt counter when the quota day has rolled over.
    /// Returns true when a reset happened; repeated calls within the same
    /// day are no-ops.
    pub fn roll_daily_window(&mut self, now: DateTime<Utc>) -> bool {
        let today = quota_day(now);
        if self.last_reset_date == Some(today) {
            return false;
        }
        self.attempts_today = 0;
        self.last_reset_date = Some(today);
        true
    }

    /// Stuck-run recovery: clear `is_running` when the last recorded
    /// activity is older than the staleness window. Idempotent.
    pub fn reset_if_stuck(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running {
            return false;
        }
        let stale = match self.last_activity {
            Some(at) => now - at > Duration::minutes(STUCK_RUN_MINUTES),
            // Running with no activity recorded at all: treat as stuck.
            None => true,
        };
        if stale {
            self.is_running = false;
        }
        stale
    }

    /// Seconds until the LLM cooldown elapses, if one is active.
    pub fn cooldown_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        let until = self.llm_cooldown_until?;
        let remaining = (until - now).num_seconds();
        if remaining > 0 {
            Some(remaining as u64)
        } else {
            None
        }
    }

    pub fn note_rate_limit(&mut self, retry_seconds: u64, now: DateTime<Utc>) {
        self.llm_cooldown_until = Some(now + Duration::seconds(retry_seconds as i64));
    }
}
