use thiserror::Error;

/// Errors returned by the SerpApi client.
#[derive(Debug, Error)]
pub enum SerpError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// SerpApi returned a non-success status.
    #[error("SerpApi error {status}: {message}")]
    Api { status: u16, message: String },

    /// SerpApi returned a success status but the payload carried an error field.
    #[error("SerpApi rejected the search: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, SerpError>;
