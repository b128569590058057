//! Pure SerpApi REST API client.
//!
//! A minimal client for the SerpApi search platform. Supports Google organic
//! search and the account endpoint used for remaining-credit checks.
//!
//! # Example
//!
//! ```rust,ignore
//! use serp_client::SerpClient;
//!
//! let client = SerpClient::new("your-api-key".into());
//!
//! let results = client.search("OMRON E2E-X5E1 discontinued", 5).await?;
//! for hit in &results {
//!     println!("{} — {}", hit.title, hit.link);
//! }
//!
//! let account = client.account().await?;
//! println!("searches left: {}", account.searches_left());
//! ```

pub mod error;
pub mod types;

pub use error::{Result, SerpError};
pub use types::{AccountInfo, OrganicResult, SearchResponse};

const BASE_URL: &str = "https://serpapi.com";

pub struct SerpClient {
    client: reqwest::Client,
    api_key: String,
}

impl SerpClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Run a Google organic search and return up to `max_results` hits.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<OrganicResult>> {
        let url = format!(
            "{}/search.json?engine=google&q={}&num={}&api_key={}",
            BASE_URL,
            urlencoding::encode(query),
            max_results,
            self.api_key,
        );

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SerpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let search: SearchResponse = resp.json().await?;
        if let Some(error) = search.error {
            return Err(SerpError::Rejected(error));
        }

        let mut results = search.organic_results;
        results.truncate(max_results);
        tracing::debug!(query, count = results.len(), "SerpApi search completed");
        Ok(results)
    }

    /// Fetch account status. Used to gate scheduled work on remaining credits.
    pub async fn account(&self) -> Result<AccountInfo> {
        let url = format!("{}/account.json?api_key={}", BASE_URL, self.api_key);

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SerpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}
