//! Quota/backpressure guard for scheduled work.
//!
//! Tracks the per-day attempt budget, the search-credit floor and the LLM
//! cooldown in one persisted `AutoCheckState` record. All decisions are made
//! on a freshly-loaded record; nothing is cached in process.

use chrono::Utc;
use std::fmt;
use std::sync::Arc;

use crate::kernel::deps::ServerDeps;
use crate::kernel::traits::{BaseBlobStore, BaseWebSearch, ReadConsistency};

use super::error::EolError;
use super::models::AutoCheckState;

const STATE_KEY: &str = "eol-state/auto-check";

/// New scheduled jobs per quota day.
pub const DAILY_ATTEMPT_CEILING: u32 = 30;

/// Scheduled runs stop (and auto-check disables itself) when the search
/// account drops to this many credits.
pub const SEARCH_CREDITS_FLOOR: i64 = 50;

/// Why the guard refused to start or continue work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Disabled,
    AlreadyRunning,
    DailyCeilingReached,
    SearchCreditsExhausted,
    CoolingDown { seconds: u64 },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Disabled => write!(f, "auto-check is disabled"),
            Denial::AlreadyRunning => write!(f, "a run is already in progress"),
            Denial::DailyCeilingReached => write!(f, "daily attempt ceiling reached"),
            Denial::SearchCreditsExhausted => write!(f, "search credits at or below floor"),
            Denial::CoolingDown { seconds } => {
                write!(f, "LLM rate limit cooldown, {seconds}s remaining")
            }
        }
    }
}

pub struct QuotaGuard {
    blobs: Arc<dyn BaseBlobStore>,
    web_search: Arc<dyn BaseWebSearch>,
}

impl QuotaGuard {
    pub fn new(deps: &ServerDeps) -> Self {
        Self {
            blobs: deps.blob_store.clone(),
            web_search: deps.web_search.clone(),
        }
    }

    pub async fn load(&self) -> Result<AutoCheckState, EolError> {
        let value = self
            .blobs
            .get(STATE_KEY, ReadConsistency::Strong)
            .await
            .map_err(EolError::Storage)?;
        match value {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| EolError::Storage(anyhow::anyhow!("auto-check state malformed: {e}"))),
            None => Ok(AutoCheckState::default()),
        }
    }

    pub async fn save(&self, state: &AutoCheckState) -> Result<(), EolError> {
        let value = serde_json::to_value(state)
            .map_err(|e| EolError::Storage(anyhow::anyhow!("auto-check state serialization: {e}")))?;
        self.blobs.set(STATE_KEY, value).await.map_err(EolError::Storage)
    }

    /// Stuck-run recovery. Returns true when a crashed run was reset.
    pub async fn health_check(&self) -> Result<bool, EolError> {
        let mut state = self.load().await?;
        let reset = state.reset_if_stuck(Utc::now());
        if reset {
            tracing::warn!("stuck scheduled run detected, forcing is_running = false");
            self.save(&state).await?;
        }
        Ok(reset)
    }

    /// Gate for starting a new scheduled run. Rolls the daily window first,
    /// then checks every ceiling in order. A breached credit floor disables
    /// future scheduled runs.
    pub async fn can_proceed(&self) -> Result<Option<Denial>, EolError> {
        let now = Utc::now();
        let mut state = self.load().await?;
        let rolled = state.roll_daily_window(now);

        let denial = if !state.enabled {
            Some(Denial::Disabled)
        } else if state.is_running {
            Some(Denial::AlreadyRunning)
        } else if state.attempts_today >= DAILY_ATTEMPT_CEILING {
            Some(Denial::DailyCeilingReached)
        } else if let Some(seconds) = state.cooldown_seconds(now) {
            Some(Denial::CoolingDown { seconds })
        } else {
            match self.web_search.remaining_credits().await {
                Ok(credits) if credits <= SEARCH_CREDITS_FLOOR => {
                    state.enabled = false;
                    self.save(&state).await?;
                    tracing::warn!(credits, "search credits at floor, auto-check disabled");
                    return Ok(Some(Denial::SearchCreditsExhausted));
                }
                Ok(_) => None,
                Err(e) => {
                    // An unreadable credit balance blocks scheduled work but
                    // does not disable it.
                    tracing::warn!("credit check failed: {e}");
                    Some(Denial::SearchCreditsExhausted)
                }
            }
        };

        if rolled {
            self.save(&state).await?;
        }
        Ok(denial)
    }

    /// Gate applied between jobs inside a running batch: ceiling and
    /// cooldown only (the run itself holds `is_running`).
    pub async fn can_continue(&self) -> Result<Option<Denial>, EolError> {
        let now = Utc::now();
        let mut state = self.load().await?;
        let rolled = state.roll_daily_window(now);

        let denial = if state.attempts_today >= DAILY_ATTEMPT_CEILING {
            Some(Denial::DailyCeilingReached)
        } else {
            state.cooldown_seconds(now).map(|seconds| Denial::CoolingDown { seconds })
        };

        if rolled {
            self.save(&state).await?;
        }
        Ok(denial)
    }

    /// Count one attempt and stamp activity.
    pub async fn record_attempt(&self) -> Result<(), EolError> {
        let mut state = self.load().await?;
        state.roll_daily_window(Utc::now());
        state.attempts_today += 1;
        state.last_activity = Some(Utc::now());
        self.save(&state).await
    }

    /// Live countdown of the LLM cooldown, if one is active.
    pub async fn cooldown_seconds(&self) -> Result<Option<u64>, EolError> {
        Ok(self.load().await?.cooldown_seconds(Utc::now()))
    }

    pub async fn note_rate_limit(&self, retry_seconds: u64) -> Result<(), EolError> {
        let mut state = self.load().await?;
        state.note_rate_limit(retry_seconds, Utc::now());
        self.save(&state).await
    }

    pub async fn note_tokens_remaining(&self, tokens: i64) -> Result<(), EolError> {
        let mut state = self.load().await?;
        state.tokens_remaining = Some(tokens);
        self.save(&state).await
    }

    pub async fn mark_run_started(&self) -> Result<(), EolError> {
        let mut state = self.load().await?;
        state.is_running = true;
        state.last_activity = Some(Utc::now());
        self.save(&state).await
    }

    pub async fn mark_run_finished(&self) -> Result<(), EolError> {
        let mut state = self.load().await?;
        state.is_running = false;
        state.last_activity = Some(Utc::now());
        self.save(&state).await
    }
}
