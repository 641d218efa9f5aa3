//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the case law pipeline, providing structured
//! error types for every component and conversion utilities for external
//! library errors.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from the search client, cache, summarizer and API surface
//! - **Output**: Structured error types with context, mapped to HTTP statuses by the API layer
//! - **Error Categories**: Request, Upstream, Cache, Configuration, Internal
//!
//! ## Key Features
//! - Single error enum shared across all components
//! - Upstream failures carry endpoint and status context for diagnosis
//! - Category accessor for structured logging
//! - Recoverability hint for callers that may retry

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for the case law search pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Client supplied no query or a blank query
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Network failure or non-2xx status from an upstream API
    #[error("Upstream '{endpoint}' unavailable: {details}")]
    UpstreamUnavailable { endpoint: String, details: String },

    /// Upstream response could not be parsed into the expected shape
    #[error("Unexpected response from '{endpoint}': {details}")]
    UpstreamFormat { endpoint: String, details: String },

    /// Client exceeded the per-minute request cap
    #[error("Rate limit exceeded: {limit} requests per minute")]
    RateLimited { limit: u32 },

    /// Cache store operation failed
    #[error("Cache error: {details}")]
    Cache { details: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::UpstreamUnavailable { .. }
                | PipelineError::RateLimited { .. }
                | PipelineError::Cache { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest { .. } | PipelineError::RateLimited { .. } => "request",
            PipelineError::UpstreamUnavailable { .. } | PipelineError::UpstreamFormat { .. } => {
                "upstream"
            }
            PipelineError::Cache { .. } => "cache",
            PipelineError::Config { .. } => "configuration",
            PipelineError::Internal { .. } => "internal",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<redis::RedisError> for PipelineError {
    fn from(err: redis::RedisError) -> Self {
        PipelineError::Cache {
            details: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
