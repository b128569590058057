// Part EOL Tracker - API Core
//
// This crate provides the backend API for tracking end-of-life status of
// industrial parts. Each processing stage (discover, fetch, analyze) runs as
// an independent HTTP invocation; progress is persisted in a blob store and
// driven forward by client polling and self-triggering HTTP calls.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
