//! # Rate Limiting Module
//!
//! ## Purpose
//! Caps the number of search requests accepted per client address per minute,
//! rejecting excess requests before the pipeline executes.
//!
//! ## Input/Output Specification
//! - **Input**: A client address string per request
//! - **Output**: `Ok(())` when within the cap, `RateLimited` otherwise
//! - **Window**: Fixed one-minute window per client, reset on first request
//!   after expiry

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::errors::{PipelineError, Result};

const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-client request limiter.
///
/// Windows live in a concurrent map keyed by client address; stale windows
/// are pruned opportunistically when the map grows large.
pub struct RateLimiter {
    max_per_minute: u32,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_minute` requests per client
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            windows: DashMap::new(),
        }
    }

    /// Record one request from `client`, rejecting it when over the cap
    pub fn check(&self, client: &str) -> Result<()> {
        self.prune_stale();

        let mut window = self.windows.entry(client.to_string()).or_insert(Window {
            started: Instant::now(),
            count: 0,
        });

        if window.started.elapsed() >= WINDOW {
            window.started = Instant::now();
            window.count = 0;
        }

        if window.count >= self.max_per_minute {
            return Err(PipelineError::RateLimited {
                limit: self.max_per_minute,
            });
        }

        window.count += 1;
        Ok(())
    }

    fn prune_stale(&self) {
        // Bounds memory under many distinct client addresses
        if self.windows.len() > 10_000 {
            self.windows
                .retain(|_, window| window.started.elapsed() < WINDOW);
        }
    }
}
