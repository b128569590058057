//! Kernel module - server infrastructure and dependencies.

pub mod blob_store;
pub mod dataset;
pub mod deps;
pub mod event_log;
pub mod probe;
pub mod serp_search;
pub mod stages;
pub mod test_dependencies;
pub mod traits;

pub use blob_store::{MemoryBlobStore, PostgresBlobStore};
pub use dataset::BlobDataset;
pub use deps::ServerDeps;
pub use event_log::{HttpEventLog, NoopEventLog};
pub use probe::HttpProbeFetch;
pub use serp_search::SerpWebSearch;
pub use stages::{HttpAnalyzeStage, HttpFetchStage};
pub use test_dependencies::TestDependencies;
pub use traits::*;
