// crates/backend-lib/src/middleware/rate_limit.rs

//! Fixed-window rate limiting for attendee submissions.
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::error::AppError;

/// Rate limit entry for a client key
#[derive(Debug)]
struct RateLimitEntry {
    requests: u32,
    window_start: Instant,
}

/// Fixed-window limiter keyed by an arbitrary client key (submitter
/// email for question submission).
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            entries: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Record one request for `key`; errors once the window's budget is
    /// spent.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                requests: 0,
                window_start: Instant::now(),
            });

        if entry.window_start.elapsed() > self.window {
            entry.requests = 0;
            entry.window_start = Instant::now();
        }

        if entry.requests >= self.max_requests {
            return Err(AppError::RateLimitExceeded);
        }

        entry.requests += 1;
        Ok(())
    }
}
