//! # Summarizer Module
//!
//! ## Purpose
//! Generates plain-language case summaries through an LLM chat-completions
//! API, with content-addressed caching so identical case text is only ever
//! summarized once regardless of which query surfaced it.
//!
//! ## Input/Output Specification
//! - **Input**: Non-blank case text (caller contract; the pipeline substitutes
//!   a sentinel for empty sources without calling this)
//! - **Output**: A summary string, always — failures return a fixed sentinel
//!   rather than an error
//! - **Caching**: Keyed by `ai_summary:{sha256(text)}` with a long TTL;
//!   summaries are stable for the same text
//!
//! ## Retry Policy
//! An empty completion is retried in a bounded loop with linear backoff,
//! 3 total attempts by default. An API error is not retried: the sentinel is
//! returned immediately and the rest of the request proceeds.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::KeyValueCache;
use crate::config::SummarizerConfig;
use crate::errors::{PipelineError, Result};
use crate::utils;

/// Returned when no source text or API key is available; also used by the
/// pipeline for cases with nothing to summarize
pub const ANALYSIS_NOT_AVAILABLE: &str = "AI analysis not available.";
/// Returned when the API call failed or retries were exhausted
pub const ANALYSIS_UNAVAILABLE: &str = "AI analysis unavailable due to an API error.";

const SYSTEM_PROMPT: &str = "You are a legal assistant that summarizes case law";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// LLM-backed case summarizer with a content-addressed cache
pub struct Summarizer {
    config: SummarizerConfig,
    client: Client,
    cache: Arc<dyn KeyValueCache>,
}

impl Summarizer {
    /// Create a new summarizer
    pub fn new(config: SummarizerConfig, cache: Arc<dyn KeyValueCache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("caselaw-pipeline/0.1")
            .build()
            .map_err(|e| PipelineError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            client,
            cache,
        })
    }

    /// Cache key for a piece of source text.
    ///
    /// Keying on content rather than on the query deduplicates LLM spend:
    /// the same case recurring across different searches hits the same entry.
    pub fn cache_key(text: &str) -> String {
        format!("ai_summary:{}", utils::text_hash(text))
    }

    /// Summarize case text. Never fails: every error path yields a sentinel.
    pub async fn summarize(&self, text: &str) -> String {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return ANALYSIS_NOT_AVAILABLE.to_string();
        };

        let text = utils::truncate_chars(text, self.config.max_input_chars);
        let cache_key = Self::cache_key(&text);

        match self.cache.get(&cache_key).await {
            Ok(Some(summary)) => {
                debug!("Summary cache hit");
                return summary;
            }
            Ok(None) => {}
            Err(e) => warn!("Summary cache lookup failed: {}", e),
        }

        // Bounded retry loop for empty completions; API errors are terminal
        for attempt in 1..=self.config.retry_attempts {
            let summary = match self.request_summary(api_key, &text).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(attempt, "Summarization request failed: {}", e);
                    return ANALYSIS_UNAVAILABLE.to_string();
                }
            };

            if let Some(summary) = summary.filter(|s| !utils::is_blank(s)) {
                if let Err(e) = self
                    .cache
                    .set(&cache_key, &summary, self.config.cache_ttl_seconds)
                    .await
                {
                    warn!("Failed to cache summary: {}", e);
                }
                return summary;
            }

            if attempt < self.config.retry_attempts {
                let backoff = Duration::from_millis(250 * u64::from(attempt));
                debug!(attempt, "Empty completion, retrying after {:?}", backoff);
                tokio::time::sleep(backoff).await;
            }
        }

        warn!(
            attempts = self.config.retry_attempts,
            "Model returned no content after all attempts"
        );
        ANALYSIS_UNAVAILABLE.to_string()
    }

    /// Issue one chat-completions request and extract the message content
    async fn request_summary(&self, api_key: &str, text: &str) -> Result<Option<String>> {
        let url = format!("{}/v1/chat/completions", self.config.api_url);
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": format!(
                        "Summarize this legal case in simple terms and explain its significance:\n\n{}",
                        text
                    ),
                },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable {
                endpoint: "chat/completions".to_string(),
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::UpstreamUnavailable {
                endpoint: "chat/completions".to_string(),
                details: format!("HTTP {}", status),
            });
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::UpstreamFormat {
                    endpoint: "chat/completions".to_string(),
                    details: e.to_string(),
                })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string()))
    }
}
