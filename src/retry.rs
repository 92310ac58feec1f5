// ABOUTME: Exponential backoff policy and async retry executor for upstream calls
// ABOUTME: Retries only while the caller-supplied predicate marks the failure as transient
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Retry bounds and backoff shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Growth factor per attempt
    pub backoff_multiplier: f64,
    /// Random spread applied to each delay, as a fraction of it
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given 0-based attempt failed
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = self.capped_delay_ms(attempt);

        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        if jitter > 0.0 && capped > 0 {
            let scale: f64 = rand::thread_rng().gen_range(-jitter..=jitter);
            let adjusted = (capped as f64).mul_add(scale, capped as f64).max(0.0);
            return Duration::from_millis(adjusted.round() as u64);
        }

        Duration::from_millis(capped)
    }

    /// `min(base * multiplier^attempt, max)` without jitter
    #[must_use]
    pub fn capped_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        if raw.is_finite() && raw < self.max_delay_ms as f64 {
            raw as u64
        } else {
            self.max_delay_ms
        }
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects the error, or attempts run out
///
/// `operation` receives the 0-based attempt index. The last error is returned
/// unchanged when retrying stops.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn execute_with_retry<T, E, Op, Fut, ShouldRetry>(
    policy: &RetryPolicy,
    mut operation: Op,
    should_retry: ShouldRetry,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    ShouldRetry: Fn(&E) -> bool,
{
    let max = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let next_attempt = attempt + 1;
                if next_attempt >= max || !should_retry(&error) {
                    return Err(error);
                }

                let delay = policy.delay_for_attempt(attempt);
                debug!(
                    attempt,
                    next_attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying upstream call after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt = next_attempt;
            }
        }
    }
}
