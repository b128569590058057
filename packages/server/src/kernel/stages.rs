//! Thin HTTP clients for the opaque stage engines.
//!
//! The rendering/scraping engine and the LLM classification gateway are
//! external services; these clients only move blobs across the wire and map
//! rate-limit responses onto `StageError::RateLimited`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::domains::eol::models::{EolClassification, FetchMethod};

use super::traits::{AnalyzeOutput, BaseAnalyzeStage, BaseFetchStage, FetchOutput, SourceDoc, StageError};

/// Stage engines can take a while on heavy pages; the HTTP timeout is set
/// well above typical render times.
const STAGE_TIMEOUT_SECS: u64 = 120;

fn stage_client() -> Result<reqwest::Client, StageError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(STAGE_TIMEOUT_SECS))
        .build()
        .map_err(|e| StageError::Failed(format!("failed to create stage HTTP client: {e}")))
}

fn retry_after_seconds(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(60)
}

// =============================================================================
// Fetch stage (rendering/scraping engine)
// =============================================================================

pub struct HttpFetchStage {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderResponse {
    content: String,
    #[serde(default)]
    title: Option<String>,
}

impl HttpFetchStage {
    pub fn new(endpoint: String) -> Result<Self, StageError> {
        Ok(Self {
            client: stage_client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl BaseFetchStage for HttpFetchStage {
    async fn fetch(&self, url: &str, method: &FetchMethod) -> Result<FetchOutput, StageError> {
        let body = serde_json::json!({ "url": url, "method": method });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::Failed(format!("render request failed: {e}")))?;

        if resp.status().as_u16() == 429 {
            return Err(StageError::RateLimited {
                retry_seconds: retry_after_seconds(&resp),
            });
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StageError::Failed(format!("render engine {status}: {text}")));
        }

        let rendered: RenderResponse = resp
            .json()
            .await
            .map_err(|e| StageError::Failed(format!("render response parse failed: {e}")))?;

        Ok(FetchOutput {
            content: rendered.content,
            title: rendered.title,
        })
    }
}

// =============================================================================
// Analyze stage (LLM classification gateway)
// =============================================================================

pub struct HttpAnalyzeStage {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyResponse {
    classification: EolClassification,
    #[serde(default)]
    tokens_remaining: Option<i64>,
}

impl HttpAnalyzeStage {
    pub fn new(endpoint: String) -> Result<Self, StageError> {
        Ok(Self {
            client: stage_client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl BaseAnalyzeStage for HttpAnalyzeStage {
    async fn analyze(
        &self,
        maker: &str,
        model: &str,
        sources: &[SourceDoc],
    ) -> Result<AnalyzeOutput, StageError> {
        let body = serde_json::json!({
            "maker": maker,
            "model": model,
            "sources": sources,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::Failed(format!("classify request failed: {e}")))?;

        if resp.status().as_u16() == 429 {
            return Err(StageError::RateLimited {
                retry_seconds: retry_after_seconds(&resp),
            });
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StageError::Failed(format!("classify gateway {status}: {text}")));
        }

        let classified: ClassifyResponse = resp
            .json()
            .await
            .map_err(|e| StageError::Failed(format!("classify response parse failed: {e}")))?;

        Ok(AnalyzeOutput {
            classification: classified.classification,
            tokens_remaining: classified.tokens_remaining,
        })
    }
}
