//! # Pipeline Orchestrator Module
//!
//! ## Purpose
//! Composes the search client, opinion fetcher and summarizer into the
//! per-request pipeline: validate → search → per-case summarize →
//! filter/sort → assemble.
//!
//! ## Input/Output Specification
//! - **Input**: `SearchQuery` (text, optional court filter, sort mode)
//! - **Output**: `SearchOutcome` with a human-readable message and the
//!   summarized, normalized result list
//! - **Errors**: `InvalidRequest` for blank queries; search-client failures
//!   abort the request. Summarizer and opinion-fetch failures never do; they
//!   degrade to per-case sentinels.
//!
//! ## Ordering Policy
//! Dates are compared as strings, not parsed; the missing-date sentinel
//! always sorts last in either direction. The underlying sort is stable.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};
use uuid::Uuid;

use crate::courtlistener::{
    normalize_case, CaseSearchClient, NormalizedCase, RawCase, SearchQuery, SortMode, NO_DATE,
};
use crate::errors::{PipelineError, Result};
use crate::opinions::OpinionFetcher;
use crate::summarizer::{Summarizer, ANALYSIS_NOT_AVAILABLE};
use crate::utils;

/// A normalized case plus its generated summary
#[derive(Debug, Clone, Serialize)]
pub struct SummarizedCase {
    #[serde(flatten)]
    pub case: NormalizedCase,
    pub ai_summary: String,
}

/// Assembled response for one request
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub message: String,
    pub query: String,
    pub results: Vec<SummarizedCase>,
}

/// Per-request orchestrator over the search, opinion and summarization clients
pub struct SearchPipeline {
    search: CaseSearchClient,
    opinions: OpinionFetcher,
    summarizer: Summarizer,
}

impl SearchPipeline {
    pub fn new(
        search: CaseSearchClient,
        opinions: OpinionFetcher,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            search,
            opinions,
            summarizer,
        }
    }

    /// Run the pipeline for one request.
    ///
    /// Holds no state between requests beyond the shared cache.
    pub async fn run(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        if utils::is_blank(&query.query) {
            return Err(PipelineError::InvalidRequest {
                reason: "Query must not be blank".to_string(),
            });
        }

        let request_id = Uuid::new_v4();
        let timer = utils::Timer::new("pipeline");
        info!(%request_id, query = %query.query, "Pipeline started");

        let raw_cases = self.search.search(query).await?;

        let mut results = Vec::with_capacity(raw_cases.len());
        for raw in &raw_cases {
            results.push(self.summarize_case(raw).await);
        }

        if let Some(court) = &query.court {
            filter_by_court(&mut results, court);
        }

        sort_results(&mut results, query.sort);

        let message = format!(
            "{} case(s) found for query: {}",
            results.len(),
            query.query
        );
        info!(
            %request_id,
            results = results.len(),
            elapsed_ms = timer.stop(),
            "Pipeline completed"
        );

        Ok(SearchOutcome {
            message,
            query: query.query.clone(),
            results,
        })
    }

    /// Normalize one case and attach its summary.
    ///
    /// Source text is the upstream summary when present, otherwise fetched
    /// opinion text; with neither, the summarizer is skipped entirely and the
    /// sentinel substituted. Failures here are isolated to this case.
    async fn summarize_case(&self, raw: &RawCase) -> SummarizedCase {
        let case = normalize_case(raw);

        let source_text = match raw.summary.as_deref().filter(|s| !utils::is_blank(s)) {
            Some(summary) => Some(summary.to_string()),
            None => self.opinions.fetch_full_text(raw).await,
        };

        let ai_summary = match source_text {
            Some(text) => self.summarizer.summarize(&text).await,
            None => {
                debug!(case_name = %case.case_name, "No source text for summary");
                ANALYSIS_NOT_AVAILABLE.to_string()
            }
        };

        SummarizedCase { case, ai_summary }
    }
}

/// Retain only cases whose normalized court name equals the filter,
/// case-insensitively and exactly.
///
/// Comparison is on Unicode lowercase forms, so non-ASCII court names
/// ("Cour Suprême") match their lowercase spellings too.
pub fn filter_by_court(results: &mut Vec<SummarizedCase>, court: &str) {
    let wanted = court.to_lowercase();
    results.retain(|result| result.case.court.to_lowercase() == wanted);
}

/// Order results by decision date according to the sort mode.
///
/// `Relevance` preserves the upstream order. Dates are compared
/// lexicographically as ISO-like strings; the missing-date sentinel sorts
/// last in either direction.
pub fn sort_results(results: &mut [SummarizedCase], sort: SortMode) {
    match sort {
        SortMode::Relevance => {}
        SortMode::DateAsc => {
            results.sort_by(|a, b| compare_dates(&a.case.date_decided, &b.case.date_decided, false))
        }
        SortMode::DateDesc => {
            results.sort_by(|a, b| compare_dates(&a.case.date_decided, &b.case.date_decided, true))
        }
    }
}

fn compare_dates(a: &str, b: &str, descending: bool) -> Ordering {
    match (a == NO_DATE, b == NO_DATE) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            if descending {
                b.cmp(a)
            } else {
                a.cmp(b)
            }
        }
    }
}
