//! Stage actions invoked by the HTTP handlers.

pub mod analyze;
pub mod fetch;
pub mod initialize;

pub use analyze::run_analyze_stage;
pub use fetch::run_fetch_stage;
pub use initialize::{initialize_job, InitializeOutcome, MAX_SEARCH_URLS};
