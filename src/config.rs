//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the case law pipeline, loaded from a TOML
//! file with environment variable overrides and validated at startup.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Non-zero port, cache URL presence, positive caps and retry counts
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)
//!
//! ## Environment Variables
//! - `CASELAW_HOST` / `CASELAW_PORT`: server bind address
//! - `COURTLISTENER_API_TOKEN`: optional token for the search API
//! - `OPENAI_API_KEY`: LLM key; absent means summaries degrade to a sentinel
//! - `REDIS_URL`: cache connection string; blanking it is a fatal error

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Upstream case search API settings
    pub search: SearchApiConfig,
    /// LLM summarization settings
    pub summarizer: SummarizerConfig,
    /// Cache store settings
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS for browser frontends
    pub enable_cors: bool,
    /// Search requests accepted per client address per minute
    pub rate_limit_per_minute: u32,
}

/// Upstream case search API configuration (CourtListener-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchApiConfig {
    /// API base URL, without a trailing slash
    pub api_url: String,
    /// Optional API token sent as an Authorization header
    pub api_token: Option<String>,
    /// Fixed result-size cap for a single search (no pagination loop)
    pub result_limit: usize,
    /// Per-call network timeout in seconds
    pub timeout_seconds: u64,
    /// TTL for cached raw search results; short because upstream data is volatile
    pub cache_ttl_seconds: u64,
    /// Character bound on fetched opinion text passed to the summarizer
    pub max_opinion_chars: usize,
}

/// LLM summarization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Chat completions API base URL, without a trailing slash
    pub api_url: String,
    /// API key; when absent, summarization degrades to a fixed sentinel
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Output length bound in tokens
    pub max_tokens: u32,
    /// Input length bound in characters
    pub max_input_chars: usize,
    /// Total attempts when the model returns an empty response
    pub retry_attempts: u32,
    /// Per-call network timeout in seconds
    pub timeout_seconds: u64,
    /// TTL for cached summaries; long because summaries are stable per text
    pub cache_ttl_seconds: u64,
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis connection string
    pub url: String,
    /// When false, the service runs with a no-op cache instead of Redis
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            rate_limit_per_minute: 10,
        }
    }
}

impl Default for SearchApiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.courtlistener.com/api/rest/v4".to_string(),
            api_token: None,
            result_limit: 10,
            timeout_seconds: 10,
            cache_ttl_seconds: 600,
            max_opinion_chars: 2000,
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            max_input_chars: 4000,
            retry_attempts: 3,
            timeout_seconds: 10,
            cache_ttl_seconds: 86_400,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
                message: format!("Failed to read config file {:?}: {}", path, e),
            })?;
            toml::from_str(&content).map_err(|e| PipelineError::Config {
                message: format!("Failed to parse config file {:?}: {}", path, e),
            })?
        } else {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("CASELAW_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CASELAW_PORT") {
            self.server.port = port.parse().map_err(|_| PipelineError::Config {
                message: "Invalid port number in CASELAW_PORT".to_string(),
            })?;
        }
        if let Ok(token) = std::env::var("COURTLISTENER_API_TOKEN") {
            self.search.api_token = Some(token);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.summarizer.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.cache.url = url;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(PipelineError::Config {
                message: "server.port cannot be zero".to_string(),
            });
        }
        if self.server.rate_limit_per_minute == 0 {
            return Err(PipelineError::Config {
                message: "server.rate_limit_per_minute must be greater than zero".to_string(),
            });
        }
        if self.search.api_url.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "search.api_url cannot be empty".to_string(),
            });
        }
        if self.search.result_limit == 0 {
            return Err(PipelineError::Config {
                message: "search.result_limit must be greater than zero".to_string(),
            });
        }
        if self.summarizer.retry_attempts == 0 {
            return Err(PipelineError::Config {
                message: "summarizer.retry_attempts must be greater than zero".to_string(),
            });
        }
        // A missing cache connection string is fatal; a missing LLM key is not.
        if self.cache.enabled && self.cache.url.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "cache.url cannot be empty while the cache is enabled".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.cache_ttl_seconds, 600);
        assert_eq!(config.summarizer.cache_ttl_seconds, 86_400);
        assert_eq!(config.server.rate_limit_per_minute, 10);
    }

    #[test]
    fn test_blank_cache_url_is_fatal() {
        let mut config = Config::default();
        config.cache.url = String::new();
        assert!(config.validate().is_err());

        // but not when the cache is explicitly disabled
        config.cache.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_llm_key_is_not_fatal() {
        let mut config = Config::default();
        config.summarizer.api_key = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\n\n[search]\nresult_limit = 5\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.search.result_limit, 5);
        assert_eq!(config.summarizer.model, "gpt-4-turbo");
    }
}
