//! # Case Search Client Module
//!
//! ## Purpose
//! Client for the upstream case law search API (CourtListener-compatible).
//! Issues a single-page search, caches the raw response body, and normalizes
//! the heterogeneous result records into the pipeline's canonical shape.
//!
//! ## Input/Output Specification
//! - **Input**: `SearchQuery` (free text plus optional court filter and sort mode)
//! - **Output**: Ordered `Vec<RawCase>` for one completed page; no pagination loop
//! - **Errors**: `UpstreamUnavailable` (network/non-2xx), `UpstreamFormat`
//!   (unparseable body or missing `results` field)
//!
//! ## Cache Policy
//! The raw response body is cached under `case_law:{query}` with a short TTL;
//! a hit bypasses the network entirely and the stored body is re-run through
//! the same normalization step. Cache writes are best-effort.
//!
//! ## Normalization Rules
//! Upstream field shapes are not guaranteed. The canonical record is produced
//! by [`normalize_case`], with one explicit case per observed shape:
//! - `court` object → its `name` string; plain string or absent → "Unknown Court"
//! - `citation` non-empty list with a string head → that element; any other
//!   shape → "No Citation Available"
//! - every other missing field → its named sentinel; output fields are never
//!   null or empty

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::KeyValueCache;
use crate::config::SearchApiConfig;
use crate::errors::{PipelineError, Result};
use crate::utils;

/// Sentinel substituted for an absent case name
pub const UNKNOWN_CASE: &str = "Unknown Case";
/// Sentinel substituted when the court name cannot be extracted
pub const UNKNOWN_COURT: &str = "Unknown Court";
/// Sentinel substituted for an absent citation
pub const NO_CITATION: &str = "No Citation Available";
/// Sentinel substituted for an absent decision date; sorts last in either direction
pub const NO_DATE: &str = "No Date Available";
/// Sentinel substituted for an absent upstream summary
pub const NO_SUMMARY: &str = "No summary available";
/// Sentinel substituted for an absent case URL
pub const NO_URL: &str = "#";

/// Sort modes for the result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Upstream relevance order, unchanged
    #[default]
    Relevance,
    /// Decision date, newest first
    DateDesc,
    /// Decision date, oldest first
    DateAsc,
}

/// Immutable search input
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Free-text query
    pub query: String,
    /// Optional case-insensitive exact-match court filter
    pub court: Option<String>,
    /// Result ordering
    pub sort: SortMode,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            court: None,
            sort: SortMode::Relevance,
        }
    }
}

/// Unnormalized search result record.
///
/// Field presence and shape are not guaranteed upstream: `court` may be a
/// string or an object, `citation` a string, list, or absent. Polymorphic
/// fields stay as raw [`Value`]s until [`normalize_case`] runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCase {
    #[serde(default, rename = "caseName")]
    pub case_name: Option<String>,
    #[serde(default)]
    pub citation: Option<Value>,
    #[serde(default)]
    pub court: Option<Value>,
    #[serde(default, rename = "dateFiled")]
    pub date_filed: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub absolute_url: Option<String>,
    /// Direct opinion identifier, first choice for full-text fetches
    #[serde(default)]
    pub opinion_id: Option<u64>,
    /// Embedded opinion records, second choice
    #[serde(default)]
    pub opinions: Option<Value>,
    /// Cluster identifier, last resort
    #[serde(default)]
    pub cluster_id: Option<u64>,
}

/// The pipeline's canonical case record; every field is a non-empty string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCase {
    pub case_name: String,
    pub citation: String,
    pub court: String,
    pub date_decided: String,
    pub summary: String,
    pub full_case_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    results: Vec<RawCase>,
}

/// Client for the upstream search endpoint
pub struct CaseSearchClient {
    config: SearchApiConfig,
    client: Client,
    cache: Arc<dyn KeyValueCache>,
}

/// Build an HTTP client for the upstream API, attaching the configured
/// Authorization token when present.
///
/// Shared by the search client and the opinion fetcher so both endpoints
/// authenticate identically.
pub(crate) fn build_api_client(config: &SearchApiConfig) -> Result<Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = &config.api_token {
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", token)
                .parse()
                .map_err(|e| PipelineError::Config {
                    message: format!("Invalid API token format: {}", e),
                })?,
        );
    }

    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .user_agent("caselaw-pipeline/0.1")
        .build()
        .map_err(|e| PipelineError::Internal {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

impl CaseSearchClient {
    /// Create a new search client
    pub fn new(config: SearchApiConfig, cache: Arc<dyn KeyValueCache>) -> Result<Self> {
        let client = build_api_client(&config)?;

        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// Run one search and return a single completed page of raw results.
    ///
    /// Checks the cache first; a hit skips the upstream call and re-parses
    /// the stored body.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RawCase>> {
        let cache_key = format!("case_law:{}", query.query);

        if let Some(body) = self.cache.get(&cache_key).await.unwrap_or_else(|e| {
            warn!(query = %query.query, "Cache lookup failed: {}", e);
            None
        }) {
            match parse_results(&body) {
                Ok(cases) => {
                    debug!(query = %query.query, "Search cache hit ({} cases)", cases.len());
                    return Ok(cases);
                }
                Err(e) => {
                    // A stale or corrupt entry is treated as a miss
                    warn!(query = %query.query, "Discarding unparseable cache entry: {}", e);
                }
            }
        }

        let url = format!("{}/search/", self.config.api_url);
        let limit = self.config.result_limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("q", query.query.as_str()), ("page_size", limit.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable {
                endpoint: "search".to_string(),
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::UpstreamUnavailable {
                endpoint: "search".to_string(),
                details: format!("HTTP {} from {}", status, url),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable {
                endpoint: "search".to_string(),
                details: e.to_string(),
            })?;

        let cases = parse_results(&body)?;

        // Best-effort write: a cache failure must not fail the search
        if let Err(e) = self
            .cache
            .set(&cache_key, &body, self.config.cache_ttl_seconds)
            .await
        {
            warn!(query = %query.query, "Failed to cache search results: {}", e);
        }

        debug!(query = %query.query, "Search returned {} cases", cases.len());
        Ok(cases)
    }
}

/// Parse a raw search response body into result records.
///
/// A body that is not JSON or lacks the `results` field is an upstream
/// format error.
pub fn parse_results(body: &str) -> Result<Vec<RawCase>> {
    let parsed: SearchResponseBody =
        serde_json::from_str(body).map_err(|e| PipelineError::UpstreamFormat {
            endpoint: "search".to_string(),
            details: e.to_string(),
        })?;
    Ok(parsed.results)
}

/// Normalize one raw record into the canonical shape.
///
/// Total: every observed upstream shape maps to a non-empty string, falling
/// back to the named sentinels.
pub fn normalize_case(raw: &RawCase) -> NormalizedCase {
    let court = match &raw.court {
        // The only shape carrying a usable name is an object with a `name` field
        Some(Value::Object(obj)) => obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_COURT)
            .to_string(),
        // A bare string is a court identifier, not a display name
        Some(_) | None => UNKNOWN_COURT.to_string(),
    };

    let citation = match &raw.citation {
        Some(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .filter(|cite| !cite.trim().is_empty())
            .unwrap_or(NO_CITATION)
            .to_string(),
        Some(_) | None => NO_CITATION.to_string(),
    };

    NormalizedCase {
        case_name: non_blank_or(&raw.case_name, UNKNOWN_CASE),
        citation,
        court,
        date_decided: non_blank_or(&raw.date_filed, NO_DATE),
        summary: non_blank_or(&raw.summary, NO_SUMMARY),
        full_case_url: non_blank_or(&raw.absolute_url, NO_URL),
    }
}

fn non_blank_or(field: &Option<String>, default: &str) -> String {
    match field {
        Some(value) if !utils::is_blank(value) => value.clone(),
        _ => default.to_string(),
    }
}
