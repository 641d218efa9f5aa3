//! # Utilities Module
//!
//! ## Purpose
//! Common helpers used throughout the pipeline: text truncation for bounded
//! LLM input, content hashing for cache keys, and request timing.

use sha2::{Digest, Sha256};
use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

/// Truncate text to at most `max_chars` characters.
///
/// Operates on character boundaries, so multi-byte text is never split
/// mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Hex-encoded SHA-256 of `text`, used for content-addressed cache keys.
///
/// Stable across processes and restarts, unlike the std hasher.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when the string is empty or whitespace-only
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
