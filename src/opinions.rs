//! # Opinion Fetcher Module
//!
//! ## Purpose
//! Fetches full opinion text for cases whose search result carried no
//! summary, so the summarizer still has source material to work from.
//!
//! ## Input/Output Specification
//! - **Input**: A `RawCase` with no usable summary
//! - **Output**: Bounded plain text, or `None` when no identifier resolves or
//!   the fetch fails
//! - **Identifier fallback chain** (first match wins): `opinion_id` → first
//!   `id` inside the embedded `opinions` list → `cluster_id`
//!
//! ## Failure Policy
//! This is a per-case enrichment step: any network or parse failure degrades
//! to `None` and is logged, never propagated to the caller.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SearchApiConfig;
use crate::courtlistener::{build_api_client, RawCase};
use crate::errors::Result;
use crate::utils;

/// Fetches bounded opinion text from the upstream opinion-detail endpoint
pub struct OpinionFetcher {
    config: SearchApiConfig,
    client: Client,
}

impl OpinionFetcher {
    /// Create a new opinion fetcher sharing the search API configuration.
    ///
    /// Uses the same authenticated client as the search client, so the
    /// opinion-detail endpoint sees the configured token too.
    pub fn new(config: SearchApiConfig) -> Result<Self> {
        let client = build_api_client(&config)?;

        Ok(Self { config, client })
    }

    /// Fetch opinion text for a case, truncated to the configured bound.
    ///
    /// Returns `None` without touching the network when no identifier
    /// resolves. The 2000-character default bound keeps summarizer input
    /// cost bounded while preserving enough context for a useful summary.
    pub async fn fetch_full_text(&self, case: &RawCase) -> Option<String> {
        let opinion_id = resolve_opinion_id(case)?;

        let url = format!("{}/opinions/{}/", self.config.api_url, opinion_id);
        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(opinion_id, "Opinion fetch failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(opinion_id, "Opinion fetch returned HTTP {}", response.status());
            return None;
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(opinion_id, "Opinion response was not JSON: {}", e);
                return None;
            }
        };

        let text = body
            .get("plain_text")
            .and_then(Value::as_str)
            .filter(|text| !utils::is_blank(text))?;

        debug!(opinion_id, "Fetched {} chars of opinion text", text.len());
        Some(utils::truncate_chars(text, self.config.max_opinion_chars))
    }
}

/// Resolve the identifier to fetch, walking the documented fallback chain
pub fn resolve_opinion_id(case: &RawCase) -> Option<u64> {
    if let Some(id) = case.opinion_id {
        return Some(id);
    }
    if let Some(id) = case
        .opinions
        .as_ref()
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(|opinion| opinion.get("id"))
        .and_then(Value::as_u64)
    {
        return Some(id);
    }
    case.cluster_id
}
