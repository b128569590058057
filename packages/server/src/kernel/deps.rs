//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container handed to every
//! domain action. All external services sit behind trait abstractions so
//! tests can swap in mocks.

use std::sync::Arc;

use super::traits::{
    BaseAnalyzeStage, BaseBlobStore, BaseDataset, BaseEventLog, BaseFetchStage, BaseProbeFetch,
    BaseWebSearch,
};

/// Dependencies accessible to domain actions.
#[derive(Clone)]
pub struct ServerDeps {
    pub blob_store: Arc<dyn BaseBlobStore>,
    pub web_search: Arc<dyn BaseWebSearch>,
    pub probe: Arc<dyn BaseProbeFetch>,
    pub fetch_stage: Arc<dyn BaseFetchStage>,
    pub analyze_stage: Arc<dyn BaseAnalyzeStage>,
    pub dataset: Arc<dyn BaseDataset>,
    pub event_log: Arc<dyn BaseEventLog>,
}

impl ServerDeps {
    pub fn new(
        blob_store: Arc<dyn BaseBlobStore>,
        web_search: Arc<dyn BaseWebSearch>,
        probe: Arc<dyn BaseProbeFetch>,
        fetch_stage: Arc<dyn BaseFetchStage>,
        analyze_stage: Arc<dyn BaseAnalyzeStage>,
        dataset: Arc<dyn BaseDataset>,
        event_log: Arc<dyn BaseEventLog>,
    ) -> Self {
        Self {
            blob_store,
            web_search,
            probe,
            fetch_stage,
            analyze_stage,
            dataset,
            event_log,
        }
    }
}
