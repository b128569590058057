//! Job record: the unit of work for one (manufacturer, model) EOL check.
//!
//! A job is persisted as a single blob and mutated in place by the stage
//! handlers. The blob store is the sole source of truth; nothing caches job
//! state across poll iterations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::JobId;

/// Overall lifecycle state of a job. Exactly one value at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    UrlsReady,
    Fetching,
    Analyzing,
    ReadyForAnalysis,
    Complete,
    Error,
}

/// Per-URL fetch state. Monotonic: an entry never regresses from `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStatus {
    Pending,
    Fetching,
    Complete,
    Error,
}

impl UrlStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UrlStatus::Complete | UrlStatus::Error)
    }
}

/// How a URL entry should be fetched. Each variant carries exactly the
/// fields its execution mode needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FetchMethod {
    /// Generic headless renderer.
    Render,
    /// Renderer with anti-bot (Cloudflare) handling.
    RenderShielded,
    /// Interactive per-site search flow; the engine types the model number
    /// into the site's own search box.
    SiteSearch { model: String },
    /// Direct HTTP fetch of document-like content (PDF catalogs, EOL lists).
    Document,
    /// Render with an alternate-locale fallback page.
    RenderLocalized {
        primary_url: String,
        fallback_url: String,
    },
}

/// One candidate source page tracked within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlEntry {
    /// Position in the job's URL sequence; stable once assigned.
    pub index: usize,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    pub method: FetchMethod,
    pub status: UrlStatus,
    /// Extracted text once the fetch stage (or a strategy probe) completed.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UrlEntry {
    pub fn pending(index: usize, url: impl Into<String>, method: FetchMethod) -> Self {
        Self {
            index,
            url: url.into(),
            title: None,
            snippet: None,
            method,
            status: UrlStatus::Pending,
            content: None,
            error: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Entry seeded already-complete, with probe content attached. Used when
    /// a strategy probe short-circuits the fetch stage.
    pub fn completed(index: usize, url: impl Into<String>, method: FetchMethod, content: String) -> Self {
        Self {
            index,
            url: url.into(),
            title: None,
            snippet: None,
            method,
            status: UrlStatus::Complete,
            content: Some(content),
            error: None,
        }
    }
}

/// EOL determination for one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EolStatus {
    Active,
    Discontinued,
    Unknown,
}

/// Final classification payload, present once the job is complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EolClassification {
    pub status: EolStatus,
    #[serde(default)]
    pub successor: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl EolClassification {
    /// Classification used when discovery produced nothing to analyze.
    pub fn insufficient_information(reason: impl Into<String>) -> Self {
        Self {
            status: EolStatus::Unknown,
            successor: None,
            source_url: None,
            reason: reason.into(),
            confidence: None,
        }
    }
}

/// One EOL-determination workflow instance for a (manufacturer, model) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    pub maker: String,
    pub model: String,
    pub status: JobStatus,
    #[serde(default)]
    pub urls: Vec<UrlEntry>,
    #[serde(default)]
    pub result: Option<EolClassification>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub is_daily_limit: bool,
    #[serde(default)]
    pub retry_seconds: Option<u64>,
}

impl Job {
    pub fn new(maker: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            created_at: Utc::now(),
            maker: maker.into(),
            model: model.into(),
            status: JobStatus::Created,
            urls: Vec::new(),
            result: None,
            error: None,
            is_daily_limit: false,
            retry_seconds: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Complete | JobStatus::Error)
    }

    pub fn all_entries_terminal(&self) -> bool {
        self.urls.iter().all(|e| e.status.is_terminal())
    }

    /// True when the classification stage may run: every entry has reached a
    /// terminal per-URL state and no result has been produced yet.
    pub fn awaiting_analysis(&self) -> bool {
        !self.is_terminal()
            && self.result.is_none()
            && !self.urls.is_empty()
            && self.all_entries_terminal()
    }

    pub fn mark_complete(&mut self, classification: EolClassification) {
        self.result = Some(classification);
        self.status = JobStatus::Complete;
        self.error = None;
        self.is_daily_limit = false;
        self.retry_seconds = None;
    }

    pub fn mark_error(
        &mut self,
        message: impl Into<String>,
        is_daily_limit: bool,
        retry_seconds: Option<u64>,
    ) {
        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.is_daily_limit = is_daily_limit;
        self.retry_seconds = retry_seconds;
    }
}
