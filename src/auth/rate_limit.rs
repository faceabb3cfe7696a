// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Per-principal sliding-window rate limiting.
//!
//! One limiter instance is shared by all in-flight requests for the lifetime
//! of the process. The prune-count-append sequence for a key runs under a
//! single lock acquisition, so concurrent checks for the same principal never
//! interleave.
//!
//! The number of distinct keys is unbounded at the interface, so stale keys
//! are swept at most once per window interval during `check`; a key with no
//! admissions inside the current window costs no memory after the next sweep.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::Utc;

/// Admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Seconds until the oldest window entry expires; `0` when admitted.
    pub retry_after_seconds: u64,
}

struct LimiterState {
    windows: HashMap<String, VecDeque<u64>>,
    last_sweep: u64,
}

/// Sliding-window admission control keyed by principal identifier.
pub struct SlidingWindowLimiter {
    window_seconds: u64,
    limit: usize,
    state: Mutex<LimiterState>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `limit` requests per key per
    /// `window_seconds` rolling interval.
    pub fn new(window_seconds: u64, limit: usize) -> Self {
        Self {
            window_seconds: window_seconds.max(1),
            limit,
            state: Mutex::new(LimiterState {
                windows: HashMap::new(),
                last_sweep: 0,
            }),
        }
    }

    /// Check and record an admission for `key` at the current time.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Utc::now().timestamp().max(0) as u64)
    }

    /// Check and record an admission for `key` at `now` (Unix seconds).
    pub(crate) fn check_at(&self, key: &str, now: u64) -> RateDecision {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic mid-check; failing open here
            // would disable limiting for the rest of the process lifetime.
            Err(poisoned) => poisoned.into_inner(),
        };

        let cutoff = now.saturating_sub(self.window_seconds);

        if now.saturating_sub(state.last_sweep) >= self.window_seconds {
            state
                .windows
                .retain(|_, stamps| stamps.back().is_some_and(|newest| *newest >= cutoff));
            state.last_sweep = now;
        }

        let stamps = state.windows.entry(key.to_string()).or_default();
        while stamps.front().is_some_and(|oldest| *oldest < cutoff) {
            stamps.pop_front();
        }

        if stamps.len() >= self.limit {
            let oldest = stamps.front().copied().unwrap_or(now);
            let retry = self
                .window_seconds
                .saturating_sub(now.saturating_sub(oldest))
                .max(1);
            return RateDecision {
                allowed: false,
                retry_after_seconds: retry,
            };
        }

        stamps.push_back(now);
        RateDecision {
            allowed: true,
            retry_after_seconds: 0,
        }
    }

    /// Number of keys currently tracked.
    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.windows.len())
            .unwrap_or(0)
    }
}
