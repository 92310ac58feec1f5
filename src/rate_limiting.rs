// ABOUTME: Per-client admission control using a fixed-window request counter
// ABOUTME: Exposes a RateLimiter trait so the in-memory table can be swapped for a shared store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting
//!
//! Each client key owns one [`RateLimitRecord`]: a request count and the
//! instant its window ends. The first request of a window creates (or resets)
//! the record with a count of one; later requests increment it until the limit
//! is reached, after which requests are denied without touching the record.
//!
//! This is a fixed window. A client that spends its whole quota at the end of
//! one window and again at the start of the next gets up to twice the nominal
//! rate across the boundary. That is accepted and covered by a test below.
//!
//! Records are process-local. They are lost on restart and not shared between
//! instances; [`RateLimiter`] is the seam for a shared counter.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::RateLimitSettings;

/// Counter state for one client key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests admitted in the current window
    pub count: u32,
    /// When the current window ends
    pub reset_time: Instant,
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Wall clock time the current window ends
    pub reset_at: DateTime<Utc>,
    /// Seconds until the window ends, rounded up
    pub reset_after_secs: u64,
}

/// Admission control seam
pub trait RateLimiter: Send + Sync {
    /// Check and count one request for `key`
    fn allow(&self, key: &str) -> RateLimitDecision;

    /// Number of client keys currently tracked
    fn active_entries(&self) -> usize;

    /// Drop records whose window has elapsed, returning how many were removed
    fn sweep_expired(&self) -> usize;

    /// Configured thresholds
    fn settings(&self) -> RateLimitSettings;
}

/// In-memory fixed-window limiter
///
/// The map shard lock held by the entry guard makes check-then-increment
/// atomic per key on a multi-threaded runtime. Nothing awaits while it is held.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    records: DashMap<String, RateLimitRecord>,
    settings: RateLimitSettings,
}

impl FixedWindowRateLimiter {
    /// Create a limiter using `settings` for [`RateLimiter::allow`]
    #[must_use]
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            records: DashMap::new(),
            settings,
        }
    }

    /// Admit or deny one request from `key` against an explicit limit and window
    pub fn check_rate_limit(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check_rate_limit_at(key, limit, window, Instant::now())
    }

    /// [`Self::check_rate_limit`] evaluated at a given instant
    pub fn check_rate_limit_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> bool {
        self.admit(key, limit, window, now).0
    }

    /// Current record for `key`, if any
    #[must_use]
    pub fn record(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|r| *r)
    }

    /// Sweep relative to a given instant
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.reset_time > now);
        before.saturating_sub(self.records.len())
    }

    fn admit(&self, key: &str, limit: u32, window: Duration, now: Instant) -> (bool, RateLimitRecord) {
        let fresh = RateLimitRecord {
            count: 1,
            reset_time: now + window,
        };

        match self.records.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                (true, fresh)
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if now >= record.reset_time {
                    *record = fresh;
                    (true, fresh)
                } else if record.count < limit {
                    record.count += 1;
                    (true, *record)
                } else {
                    (false, *record)
                }
            }
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn allow(&self, key: &str) -> RateLimitDecision {
        let limit = self.settings.requests;
        let now = Instant::now();
        let (allowed, record) = self.admit(key, limit, self.settings.window(), now);

        let until_reset = record.reset_time.saturating_duration_since(now);
        let reset_at = Utc::now()
            + chrono::Duration::from_std(until_reset).unwrap_or_else(|_| chrono::Duration::zero());

        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset_at,
            reset_after_secs: until_reset.as_millis().div_ceil(1000) as u64,
        }
    }

    fn active_entries(&self) -> usize {
        self.records.len()
    }

    fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    fn settings(&self) -> RateLimitSettings {
        self.settings
    }
}
