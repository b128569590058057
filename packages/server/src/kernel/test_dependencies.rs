// TestDependencies - mock implementations for testing
//
// Provides mock services with call recording that can be injected into
// ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domains::eol::models::{EolClassification, EolStatus, FetchMethod, PartRecord};

use super::blob_store::MemoryBlobStore;
use super::deps::ServerDeps;
use super::traits::{
    AnalyzeOutput, BaseAnalyzeStage, BaseDataset, BaseEventLog, BaseFetchStage, BaseProbeFetch,
    BaseWebSearch, FetchOutput, LogEvent, SourceDoc, StageError, WebSearchHit,
};

// =============================================================================
// Mock Web Search
// =============================================================================

pub struct MockWebSearch {
    results: Mutex<Vec<WebSearchHit>>,
    credits: Mutex<i64>,
    fail_search: Mutex<bool>,
    queries: Mutex<Vec<String>>,
}

impl MockWebSearch {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            credits: Mutex::new(1000),
            fail_search: Mutex::new(false),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_hits(self, hits: Vec<(&str, &str)>) -> Self {
        *self.results.lock().unwrap() = hits
            .into_iter()
            .map(|(url, title)| WebSearchHit {
                url: url.to_string(),
                title: title.to_string(),
                snippet: None,
            })
            .collect();
        self
    }

    pub fn with_credits(self, credits: i64) -> Self {
        *self.credits.lock().unwrap() = credits;
        self
    }

    pub fn failing(self) -> Self {
        *self.fail_search.lock().unwrap() = true;
        self
    }

    pub fn set_credits(&self, credits: i64) {
        *self.credits.lock().unwrap() = credits;
    }

    /// All queries issued so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseWebSearch for MockWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if *self.fail_search.lock().unwrap() {
            anyhow::bail!("search API unavailable");
        }
        let mut results = self.results.lock().unwrap().clone();
        results.truncate(max_results);
        Ok(results)
    }

    async fn remaining_credits(&self) -> Result<i64> {
        Ok(*self.credits.lock().unwrap())
    }
}

// =============================================================================
// Mock Probe Fetch
// =============================================================================

pub struct MockProbeFetch {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockProbeFetch {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script a probe body for a URL. Unscripted URLs fail, which the
    /// strategy resolver treats as fallback-to-search.
    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_probed(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|u| u == url)
    }
}

#[async_trait]
impl BaseProbeFetch for MockProbeFetch {
    async fn probe(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no probe response scripted for {}", url))
    }
}

// =============================================================================
// Mock Fetch Stage
// =============================================================================

#[derive(Debug, Clone)]
pub struct FetchCall {
    pub url: String,
    pub method: FetchMethod,
}

pub struct MockFetchStage {
    responses: Mutex<Vec<Result<FetchOutput, StageError>>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetchStage {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_content(self, content: &str) -> Self {
        self.responses.lock().unwrap().push(Ok(FetchOutput {
            content: content.to_string(),
            title: Some("Test Page".to_string()),
        }));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(Err(StageError::Failed(message.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseFetchStage for MockFetchStage {
    async fn fetch(&self, url: &str, method: &FetchMethod) -> Result<FetchOutput, StageError> {
        self.calls.lock().unwrap().push(FetchCall {
            url: url.to_string(),
            method: method.clone(),
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(FetchOutput {
                content: "mock page content".to_string(),
                title: Some("Mock Page".to_string()),
            })
        } else {
            responses.remove(0)
        }
    }
}

// =============================================================================
// Mock Analyze Stage
// =============================================================================

pub struct MockAnalyzeStage {
    responses: Mutex<Vec<Result<AnalyzeOutput, StageError>>>,
    calls: Mutex<Vec<(String, String, usize)>>,
}

impl MockAnalyzeStage {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_classification(self, status: EolStatus, successor: Option<&str>) -> Self {
        self.responses.lock().unwrap().push(Ok(AnalyzeOutput {
            classification: EolClassification {
                status,
                successor: successor.map(|s| s.to_string()),
                source_url: Some("https://example.com/source".to_string()),
                reason: "mock classification".to_string(),
                confidence: Some(0.9),
            },
            tokens_remaining: Some(50_000),
        }));
        self
    }

    pub fn with_rate_limit(self, retry_seconds: u64) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(Err(StageError::RateLimited { retry_seconds }));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(Err(StageError::Failed(message.to_string())));
        self
    }

    /// (maker, model, source count) per call.
    pub fn calls(&self) -> Vec<(String, String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseAnalyzeStage for MockAnalyzeStage {
    async fn analyze(
        &self,
        maker: &str,
        model: &str,
        sources: &[SourceDoc],
    ) -> Result<AnalyzeOutput, StageError> {
        self.calls
            .lock()
            .unwrap()
            .push((maker.to_string(), model.to_string(), sources.len()));

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(AnalyzeOutput {
                classification: EolClassification {
                    status: EolStatus::Active,
                    successor: None,
                    source_url: None,
                    reason: "default mock classification".to_string(),
                    confidence: Some(0.5),
                },
                tokens_remaining: None,
            })
        } else {
            responses.remove(0)
        }
    }
}

// =============================================================================
// Mock Dataset
// =============================================================================

pub struct MockDataset {
    parts: Mutex<Vec<PartRecord>>,
    replace_count: Mutex<usize>,
}

impl MockDataset {
    pub fn new() -> Self {
        Self {
            parts: Mutex::new(Vec::new()),
            replace_count: Mutex::new(0),
        }
    }

    pub fn with_parts(self, parts: Vec<PartRecord>) -> Self {
        *self.parts.lock().unwrap() = parts;
        self
    }

    pub fn parts(&self) -> Vec<PartRecord> {
        self.parts.lock().unwrap().clone()
    }

    pub fn replace_count(&self) -> usize {
        *self.replace_count.lock().unwrap()
    }
}

#[async_trait]
impl BaseDataset for MockDataset {
    async fn read(&self) -> Result<Vec<PartRecord>> {
        Ok(self.parts.lock().unwrap().clone())
    }

    async fn replace(&self, parts: Vec<PartRecord>) -> Result<()> {
        *self.parts.lock().unwrap() = parts;
        *self.replace_count.lock().unwrap() += 1;
        Ok(())
    }
}

// =============================================================================
// Recording Event Log
// =============================================================================

#[derive(Default)]
pub struct TestEventLog {
    events: Mutex<Vec<LogEvent>>,
}

impl TestEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl BaseEventLog for TestEventLog {
    fn record(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// =============================================================================
// TestDependencies bundle
// =============================================================================

/// Bundle of mock services plus the ServerDeps built over them. Tests hold
/// the concrete mocks for scripting/assertions and pass `deps` to actions.
pub struct TestDependencies {
    pub blob_store: Arc<MemoryBlobStore>,
    pub web_search: Arc<MockWebSearch>,
    pub probe: Arc<MockProbeFetch>,
    pub fetch_stage: Arc<MockFetchStage>,
    pub analyze_stage: Arc<MockAnalyzeStage>,
    pub dataset: Arc<MockDataset>,
    pub event_log: Arc<TestEventLog>,
    pub deps: ServerDeps,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self::build(
            MockWebSearch::new(),
            MockProbeFetch::new(),
            MockFetchStage::new(),
            MockAnalyzeStage::new(),
            MockDataset::new(),
        )
    }

    pub fn build(
        web_search: MockWebSearch,
        probe: MockProbeFetch,
        fetch_stage: MockFetchStage,
        analyze_stage: MockAnalyzeStage,
        dataset: MockDataset,
    ) -> Self {
        let blob_store = Arc::new(MemoryBlobStore::new());
        let web_search = Arc::new(web_search);
        let probe = Arc::new(probe);
        let fetch_stage = Arc::new(fetch_stage);
        let analyze_stage = Arc::new(analyze_stage);
        let dataset = Arc::new(dataset);
        let event_log = Arc::new(TestEventLog::new());

        let deps = ServerDeps::new(
            blob_store.clone(),
            web_search.clone(),
            probe.clone(),
            fetch_stage.clone(),
            analyze_stage.clone(),
            dataset.clone(),
            event_log.clone(),
        );

        Self {
            blob_store,
            web_search,
            probe,
            fetch_stage,
            analyze_stage,
            dataset,
            event_log,
            deps,
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
