//! # Case Law Search Pipeline
//!
//! ## Overview
//! This library implements a small web backend that accepts a legal search
//! query, forwards it to an upstream case law search API, optionally fetches
//! full opinion text, asks an LLM to summarize each case, caches both raw
//! search results and generated summaries in Redis, and returns a formatted
//! JSON payload.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `cache`: key-value cache adapter (Redis, no-op and in-memory backends)
//! - `courtlistener`: upstream search client and result normalization
//! - `opinions`: full opinion text fetching with identifier fallbacks
//! - `summarizer`: LLM summarization with content-addressed caching
//! - `pipeline`: per-request orchestration of the above
//! - `rate_limit`: per-client request cap
//! - `api`: REST endpoints
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Data Flow
//! HTTP surface → orchestrator → {search client, opinion fetcher,
//! summarizer} → cache adapter. No component holds state between requests
//! beyond the cache.
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use caselaw_pipeline::{
//!     cache::MemoryCache, config::Config, courtlistener::{CaseSearchClient, SearchQuery},
//!     opinions::OpinionFetcher, pipeline::SearchPipeline, summarizer::Summarizer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let cache = Arc::new(MemoryCache::new());
//!     let pipeline = SearchPipeline::new(
//!         CaseSearchClient::new(config.search.clone(), cache.clone())?,
//!         OpinionFetcher::new(config.search.clone())?,
//!         Summarizer::new(config.summarizer.clone(), cache)?,
//!     );
//!     let outcome = pipeline.run(&SearchQuery::new("miranda rights")).await?;
//!     println!("{}", outcome.message);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod api;
pub mod cache;
pub mod config;
pub mod courtlistener;
pub mod errors;
pub mod opinions;
pub mod pipeline;
pub mod rate_limit;
pub mod summarizer;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use courtlistener::{NormalizedCase, SearchQuery, SortMode};
pub use errors::{PipelineError, Result};
pub use pipeline::{SearchOutcome, SearchPipeline};

use std::sync::Arc;

/// Application state shared across request handlers.
///
/// All services are constructed explicitly at startup and injected here;
/// there are no module-level clients or connections.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub pipeline: Arc<pipeline::SearchPipeline>,
    pub cache: Arc<dyn cache::KeyValueCache>,
    pub rate_limiter: Arc<rate_limit::RateLimiter>,
}
