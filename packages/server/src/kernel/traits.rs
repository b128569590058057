// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (job orchestration, strategy resolution) lives in domain
// functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseBlobStore, BaseWebSearch)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domains::eol::models::{EolClassification, FetchMethod, PartRecord};

// =============================================================================
// Blob Store Trait (Infrastructure - persistent key-value storage)
// =============================================================================

/// Read mode for blob lookups. `Strong` forces a read-your-writes view and is
/// used wherever a stage handler decides on the freshly-written record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConsistency {
    Eventual,
    Strong,
}

#[async_trait]
pub trait BaseBlobStore: Send + Sync {
    /// Get a blob by key. Returns None when the key does not exist.
    async fn get(
        &self,
        key: &str,
        consistency: ReadConsistency,
    ) -> Result<Option<serde_json::Value>>;

    /// Store a blob, overwriting any existing value.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Delete a blob. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

// =============================================================================
// Web Search Trait (Infrastructure - generic discovery)
// =============================================================================

/// One hit from the generic search call.
#[derive(Debug, Clone)]
pub struct WebSearchHit {
    pub url: String,
    pub title: String,
    pub snippet: Option<String>,
}

#[async_trait]
pub trait BaseWebSearch: Send + Sync {
    /// Search the web, returning up to `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>>;

    /// Remaining search credits on the account. Consulted by the quota guard.
    async fn remaining_credits(&self) -> Result<i64>;
}

// =============================================================================
// Probe Fetch Trait (Infrastructure - cheap strategy validation GET)
// =============================================================================

#[async_trait]
pub trait BaseProbeFetch: Send + Sync {
    /// Cheap GET with a short timeout. Returns body text. Used by the
    /// strategy resolver before a job commits to a manufacturer URL.
    async fn probe(&self, url: &str) -> Result<String>;
}

// =============================================================================
// Stage Executor Traits (opaque fetch/classify engines)
// =============================================================================

/// Errors from a stage executor. Rate limits are distinguished because the
/// quota guard and polling driver treat them specially.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("rate limited, retry in {retry_seconds}s")]
    RateLimited { retry_seconds: u64 },

    #[error("{0}")]
    Failed(String),
}

/// Output of the fetch stage for a single URL.
#[derive(Debug, Clone)]
pub struct FetchOutput {
    pub content: String,
    pub title: Option<String>,
}

#[async_trait]
pub trait BaseFetchStage: Send + Sync {
    /// Retrieve and extract text from one URL using the given execution mode.
    async fn fetch(&self, url: &str, method: &FetchMethod) -> Result<FetchOutput, StageError>;
}

/// One fetched source document handed to the classification stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDoc {
    pub url: String,
    pub content: String,
}

/// Output of the classification stage.
#[derive(Debug, Clone)]
pub struct AnalyzeOutput {
    pub classification: EolClassification,
    /// Remaining-token signal from the LLM gateway, when reported.
    pub tokens_remaining: Option<i64>,
}

#[async_trait]
pub trait BaseAnalyzeStage: Send + Sync {
    /// Classify a part as active/discontinued from the fetched sources.
    async fn analyze(
        &self,
        maker: &str,
        model: &str,
        sources: &[SourceDoc],
    ) -> Result<AnalyzeOutput, StageError>;
}

// =============================================================================
// Dataset Trait (the parts table collaborator, read/replace only)
// =============================================================================

#[async_trait]
pub trait BaseDataset: Send + Sync {
    /// Read the current dataset.
    async fn read(&self) -> Result<Vec<PartRecord>>;

    /// Replace the current dataset wholesale.
    async fn replace(&self, parts: Vec<PartRecord>) -> Result<()>;
}

// =============================================================================
// Event Log Trait (centralized log sink, fire-and-forget)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub source: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEvent {
    pub fn info(source: &str, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: "info".to_string(),
            source: source.to_string(),
            message: message.into(),
            context: None,
        }
    }

    pub fn warn(source: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warn".to_string(),
            ..Self::info(source, message)
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Fire-and-forget event recording. Implementations must never block the
/// caller or surface delivery failures.
pub trait BaseEventLog: Send + Sync {
    fn record(&self, event: LogEvent);
}
