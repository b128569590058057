//! SerpApi adapter for the `BaseWebSearch` trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serp_client::SerpClient;

use super::traits::{BaseWebSearch, WebSearchHit};

/// Generic web search backed by the SerpApi client.
pub struct SerpWebSearch {
    client: SerpClient,
}

impl SerpWebSearch {
    pub fn new(api_key: String) -> Self {
        Self {
            client: SerpClient::new(api_key),
        }
    }
}

#[async_trait]
impl BaseWebSearch for SerpWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>> {
        let results = self
            .client
            .search(query, max_results)
            .await
            .context("SerpApi search failed")?;

        Ok(results
            .into_iter()
            .map(|r| WebSearchHit {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect())
    }

    async fn remaining_credits(&self) -> Result<i64> {
        let account = self
            .client
            .account()
            .await
            .context("SerpApi account check failed")?;
        Ok(account.searches_left())
    }
}
