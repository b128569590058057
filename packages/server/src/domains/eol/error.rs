//! Typed errors for the EOL domain.
//!
//! Uses `thiserror` so callers can branch on the taxonomy: validation
//! problems never touch a job record, search failures surface verbatim,
//! rate limits carry their advisory cooldown.

use thiserror::Error;

use crate::common::JobId;

#[derive(Debug, Error)]
pub enum EolError {
    /// Bad manufacturer/model input, rejected before any job record exists.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The external search API itself failed (distinct from zero results).
    #[error("search request failed: {0}")]
    SearchFailed(String),

    /// A distinguished error subtype carrying an advisory cooldown.
    #[error("rate limited, retry in {retry_seconds}s")]
    RateLimited { retry_seconds: u64 },

    /// Blob store access failed.
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    /// Transport failure on a status read (trigger transport failures are
    /// handled as `TriggerOutcome`, never as this error).
    #[error("transport error: {0}")]
    Transport(String),

    /// The job reached `error` status; carries the recorded message.
    #[error("job failed: {0}")]
    JobFailed(String),
}

pub type Result<T> = std::result::Result<T, EolError>;
