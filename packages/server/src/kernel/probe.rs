//! Plain-HTTP probe fetcher used by strategy validation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::traits::BaseProbeFetch;

const PROBE_TIMEOUT_SECS: u64 = 10;

pub struct HttpProbeFetch {
    client: reqwest::Client,
}

impl HttpProbeFetch {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .context("Failed to create probe HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BaseProbeFetch for HttpProbeFetch {
    async fn probe(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("probe request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("probe returned {}", resp.status());
        }

        resp.text().await.context("probe body read failed")
    }
}
