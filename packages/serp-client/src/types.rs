//! Wire types for the SerpApi search and account endpoints.

use serde::Deserialize;

/// Top-level search response. Only the fields this client consumes are mapped.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
    /// Present when SerpApi accepted the request but the search itself failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// One organic search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganicResult {
    pub position: Option<u32>,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Account status, used for remaining-credit checks.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub plan_searches_left: i64,
    #[serde(default)]
    pub extra_credits: i64,
    #[serde(default)]
    pub total_searches_left: i64,
    #[serde(default)]
    pub this_month_usage: i64,
}

impl AccountInfo {
    /// Credits available across plan and extras.
    pub fn searches_left(&self) -> i64 {
        // total_searches_left already folds in extra credits when present
        if self.total_searches_left > 0 {
            self.total_searches_left
        } else {
            self.plan_searches_left + self.extra_credits
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_response_without_optional_fields() {
        let json = r#"{
            "organic_results": [
                {"position": 1, "title": "OMRON E2E-X5E1", "link": "https://example.com/e2e"}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.organic_results.len(), 1);
        assert_eq!(parsed.organic_results[0].title, "OMRON E2E-X5E1");
        assert!(parsed.organic_results[0].snippet.is_none());
        assert!(parsed.error.is_none());
    }

    #[test]
    fn account_prefers_total_searches_left() {
        let info = AccountInfo {
            plan_searches_left: 100,
            extra_credits: 5,
            total_searches_left: 250,
            this_month_usage: 50,
        };
        assert_eq!(info.searches_left(), 250);
    }

    #[test]
    fn account_falls_back_to_plan_plus_extras() {
        let info = AccountInfo {
            plan_searches_left: 100,
            extra_credits: 5,
            total_searches_left: 0,
            this_month_usage: 0,
        };
        assert_eq!(info.searches_left(), 105);
    }
}
