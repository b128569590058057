//! Dataset row shape consumed and produced by the daily driver.
//!
//! The parts table itself (CRUD UI, Excel import/export) is an external
//! collaborator; this is only the wire shape of its "current dataset".

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::job::{EolClassification, EolStatus};

/// Parts whose last check is older than this are due for a recheck.
pub const RECHECK_WINDOW_DAYS: i64 = 180;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    pub maker: String,
    pub model: String,
    #[serde(default)]
    pub eol_status: Option<EolStatus>,
    #[serde(default)]
    pub successor: Option<String>,
    #[serde(default)]
    pub checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl PartRecord {
    pub fn new(maker: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            maker: maker.into(),
            model: model.into(),
            eol_status: None,
            successor: None,
            checked_at: None,
            source_url: None,
        }
    }

    /// A part needs a check when it was never classified, the last result
    /// was inconclusive, or the last check is stale.
    pub fn needs_check(&self, now: DateTime<Utc>) -> bool {
        match (self.eol_status, self.checked_at) {
            (None, _) | (Some(EolStatus::Unknown), _) => true,
            (_, None) => true,
            (_, Some(at)) => now - at > Duration::days(RECHECK_WINDOW_DAYS),
        }
    }

    pub fn apply_classification(&mut self, classification: &EolClassification, now: DateTime<Utc>) {
        self.eol_status = Some(classification.status);
        self.successor = classification.successor.clone();
        self.source_url = classification.source_url.clone();
        self.checked_at = Some(now);
    }
}
