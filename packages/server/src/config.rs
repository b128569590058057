use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string for the blob store. When unset the server
    /// falls back to the in-memory store (development only).
    pub database_url: Option<String>,
    pub port: u16,
    pub serp_api_key: String,
    /// Base URL this server is reachable at, used for self-triggering stage
    /// calls from the daily driver.
    pub self_base_url: String,
    /// Rendering/scraping engine endpoint (fetch stage executor).
    pub renderer_url: String,
    /// LLM classification gateway endpoint (analyze stage executor).
    pub analyzer_url: String,
    /// Centralized log sink endpoint. Optional; events are dropped when unset.
    pub log_sink_url: Option<String>,
    pub api_token: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            serp_api_key: env::var("SERP_API_KEY").context("SERP_API_KEY must be set")?,
            self_base_url: env::var("SELF_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            renderer_url: env::var("RENDERER_URL").context("RENDERER_URL must be set")?,
            analyzer_url: env::var("ANALYZER_URL").context("ANALYZER_URL must be set")?,
            log_sink_url: env::var("LOG_SINK_URL").ok(),
            api_token: env::var("API_TOKEN").context("API_TOKEN must be set")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
        })
    }
}
