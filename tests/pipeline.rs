//! End-to-end pipeline tests against mocked upstream APIs.
//!
//! The search API, opinion endpoint and chat-completions API are all served
//! by wiremock; the cache is the in-process backend. Upstream call counts
//! are asserted through mock expectations, verified when each server drops.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use caselaw_pipeline::cache::MemoryCache;
use caselaw_pipeline::config::{SearchApiConfig, SummarizerConfig};
use caselaw_pipeline::courtlistener::{CaseSearchClient, SearchQuery, SortMode, NO_CITATION, UNKNOWN_COURT};
use caselaw_pipeline::errors::PipelineError;
use caselaw_pipeline::opinions::OpinionFetcher;
use caselaw_pipeline::pipeline::SearchPipeline;
use caselaw_pipeline::summarizer::{Summarizer, ANALYSIS_NOT_AVAILABLE};

fn build_pipeline(
    upstream_url: &str,
    api_key: Option<&str>,
    cache: Arc<MemoryCache>,
) -> SearchPipeline {
    let search_config = SearchApiConfig {
        api_url: upstream_url.to_string(),
        timeout_seconds: 5,
        ..SearchApiConfig::default()
    };
    let summarizer_config = SummarizerConfig {
        api_url: upstream_url.to_string(),
        api_key: api_key.map(str::to_string),
        timeout_seconds: 5,
        ..SummarizerConfig::default()
    };

    SearchPipeline::new(
        CaseSearchClient::new(search_config.clone(), cache.clone()).unwrap(),
        OpinionFetcher::new(search_config).unwrap(),
        Summarizer::new(summarizer_config, cache).unwrap(),
    )
}

async fn mount_search(server: &MockServer, results: serde_json::Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": results.as_array().map(|a| a.len()).unwrap_or(0),
            "results": results,
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_completions(server: &MockServer, content: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"caseName": "Miranda v. Arizona", "summary": "Confession case."}]),
        1,
    )
    .await;
    // The summary is content-cached after the first run as well
    mount_completions(&server, "A short explanation.", 1).await;

    let pipeline = build_pipeline(&server.uri(), Some("test-key"), Arc::new(MemoryCache::new()));
    let query = SearchQuery::new("Miranda");

    let first = pipeline.run(&query).await.unwrap();
    let second = pipeline.run(&query).await.unwrap();

    assert_eq!(first.results.len(), 1);
    assert_eq!(first.results[0].ai_summary, "A short explanation.");
    assert_eq!(second.results[0].ai_summary, "A short explanation.");
    assert_eq!(first.message, "1 case(s) found for query: Miranda");
}

#[tokio::test]
async fn identical_case_text_is_summarized_once() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([
            {"caseName": "State v. Smith", "summary": "Shared opinion text."},
            {"caseName": "Smith v. State", "summary": "Shared opinion text."},
        ]),
        1,
    )
    .await;
    mount_completions(&server, "One summary.", 1).await;

    let pipeline = build_pipeline(&server.uri(), Some("test-key"), Arc::new(MemoryCache::new()));
    let outcome = pipeline.run(&SearchQuery::new("smith")).await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].ai_summary, "One summary.");
    assert_eq!(outcome.results[1].ai_summary, "One summary.");
}

#[tokio::test]
async fn missing_llm_key_degrades_to_sentinel() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"caseName": "Miranda v. Arizona", "summary": "Confession case."}]),
        1,
    )
    .await;
    // No completions call is ever made without a key
    mount_completions(&server, "unreachable", 0).await;

    let pipeline = build_pipeline(&server.uri(), None, Arc::new(MemoryCache::new()));
    let outcome = pipeline.run(&SearchQuery::new("Miranda")).await.unwrap();

    assert_eq!(outcome.results[0].ai_summary, ANALYSIS_NOT_AVAILABLE);
}

#[tokio::test]
async fn blank_query_fails_without_upstream_call() {
    let server = MockServer::start().await;
    mount_search(&server, json!([]), 0).await;

    let pipeline = build_pipeline(&server.uri(), None, Arc::new(MemoryCache::new()));
    let err = pipeline.run(&SearchQuery::new("   ")).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidRequest { .. }));
}

#[tokio::test]
async fn upstream_failure_aborts_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), None, Arc::new(MemoryCache::new()));
    let err = pipeline.run(&SearchQuery::new("Miranda")).await.unwrap_err();

    assert!(matches!(err, PipelineError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn opinion_text_feeds_summary_when_search_has_none() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"caseName": "Terry v. Ohio", "opinion_id": 42}]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/opinions/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "plain_text": "Full opinion of the court in Terry v. Ohio.",
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_completions(&server, "Stop-and-frisk explained.", 1).await;

    let pipeline = build_pipeline(&server.uri(), Some("test-key"), Arc::new(MemoryCache::new()));
    let outcome = pipeline.run(&SearchQuery::new("Terry")).await.unwrap();

    assert_eq!(outcome.results[0].ai_summary, "Stop-and-frisk explained.");
}

#[tokio::test]
async fn opinion_fetch_carries_the_configured_api_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(header("Authorization", "Token secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"caseName": "Terry v. Ohio", "opinion_id": 42}],
        })))
        .expect(1)
        .mount(&server)
        .await;
    // An unauthenticated opinion request would not match and the summary
    // source would be lost
    Mock::given(method("GET"))
        .and(path("/opinions/42/"))
        .and(header("Authorization", "Token secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "plain_text": "Full opinion of the court in Terry v. Ohio.",
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_completions(&server, "Authenticated summary.", 1).await;

    let search_config = SearchApiConfig {
        api_url: server.uri(),
        api_token: Some("secret-token".to_string()),
        timeout_seconds: 5,
        ..SearchApiConfig::default()
    };
    let summarizer_config = SummarizerConfig {
        api_url: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout_seconds: 5,
        ..SummarizerConfig::default()
    };
    let cache = Arc::new(MemoryCache::new());
    let pipeline = SearchPipeline::new(
        CaseSearchClient::new(search_config.clone(), cache.clone()).unwrap(),
        OpinionFetcher::new(search_config).unwrap(),
        Summarizer::new(summarizer_config, cache).unwrap(),
    );

    let outcome = pipeline.run(&SearchQuery::new("Terry")).await.unwrap();
    assert_eq!(outcome.results[0].ai_summary, "Authenticated summary.");
}

#[tokio::test]
async fn case_without_any_source_text_skips_the_summarizer() {
    let server = MockServer::start().await;
    mount_search(&server, json!([{"caseName": "In re Gault"}]), 1).await;
    mount_completions(&server, "unreachable", 0).await;

    let pipeline = build_pipeline(&server.uri(), Some("test-key"), Arc::new(MemoryCache::new()));
    let outcome = pipeline.run(&SearchQuery::new("Gault")).await.unwrap();

    assert_eq!(outcome.results[0].ai_summary, ANALYSIS_NOT_AVAILABLE);
}

#[tokio::test]
async fn court_filter_is_case_insensitive_exact_match() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([
            {"caseName": "A", "court": {"name": "Supreme Court"}, "summary": "a"},
            {"caseName": "B", "court": {"name": "Supreme Court of Ohio"}, "summary": "b"},
            {"caseName": "C", "court": {"name": "supreme court"}, "summary": "c"},
        ]),
        1,
    )
    .await;

    let pipeline = build_pipeline(&server.uri(), None, Arc::new(MemoryCache::new()));
    let query = SearchQuery {
        court: Some("Supreme Court".to_string()),
        ..SearchQuery::new("anything")
    };
    let outcome = pipeline.run(&query).await.unwrap();

    let names: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.case.case_name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "C"]);
}

#[tokio::test]
async fn date_desc_sort_through_the_pipeline() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([
            {"caseName": "Old", "dateFiled": "2020-01-01"},
            {"caseName": "Undated"},
            {"caseName": "New", "dateFiled": "2022-05-01"},
            {"caseName": "Mid", "dateFiled": "2021-03-01"},
        ]),
        1,
    )
    .await;

    let pipeline = build_pipeline(&server.uri(), None, Arc::new(MemoryCache::new()));
    let query = SearchQuery {
        sort: SortMode::DateDesc,
        ..SearchQuery::new("anything")
    };
    let outcome = pipeline.run(&query).await.unwrap();

    let dates: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.case.date_decided.as_str())
        .collect();
    assert_eq!(
        dates,
        vec!["2022-05-01", "2021-03-01", "2020-01-01", "No Date Available"]
    );
}

#[tokio::test]
async fn miranda_scenario_normalizes_string_court_and_missing_citation() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"caseName": "Miranda v. Arizona", "court": "Unknown Court"}]),
        1,
    )
    .await;

    let pipeline = build_pipeline(&server.uri(), None, Arc::new(MemoryCache::new()));
    let outcome = pipeline.run(&SearchQuery::new("Miranda")).await.unwrap();

    let case = &outcome.results[0].case;
    assert_eq!(case.court, UNKNOWN_COURT);
    assert_eq!(case.citation, NO_CITATION);
}

#[tokio::test]
async fn empty_completion_is_retried() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!([{"caseName": "Miranda v. Arizona", "summary": "Confession case."}]),
        1,
    )
    .await;
    // The model answers with empty content every time; three total attempts
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": ""}}],
        })))
        .expect(3)
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), Some("test-key"), Arc::new(MemoryCache::new()));
    let outcome = pipeline.run(&SearchQuery::new("Miranda")).await.unwrap();

    assert_eq!(
        outcome.results[0].ai_summary,
        "AI analysis unavailable due to an API error."
    );
}
