// ABOUTME: Rate limiting helpers for HTTP requests
// ABOUTME: Derives the client key from proxy headers and renders standard rate limit headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting Headers
//!
//! Utilities for identifying the caller and adding the standard rate limiting
//! headers to a 429 response.

use http::{HeaderMap, HeaderValue};

use crate::rate_limiting::RateLimitDecision;
use course_chat_core::constants::{headers as names, limits};

/// HTTP header names for rate limiting
pub mod headers {
    /// Maximum requests allowed in the current window
    pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    /// Remaining requests in the current window
    pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
    /// Unix timestamp when the window resets
    pub const X_RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
    /// Seconds to wait before retrying
    pub const RETRY_AFTER: &str = "Retry-After";
}

/// Client identity used as the rate limit key
///
/// First entry of `X-Forwarded-For`, then `X-Real-IP`, then `"unknown"`.
/// All clients without either header share the `"unknown"` bucket.
#[must_use]
pub fn client_key(request_headers: &HeaderMap) -> String {
    let forwarded = request_headers
        .get(names::X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        request_headers
            .get(names::X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(limits::UNKNOWN_CLIENT)
        .to_owned()
}

/// Create a `HeaderMap` with rate limit headers
#[must_use]
pub fn create_rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut map = HeaderMap::new();

    let mut put = |name: &'static str, value: String| {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            map.insert(name, header_value);
        }
    };

    put(headers::X_RATE_LIMIT_LIMIT, decision.limit.to_string());
    put(headers::X_RATE_LIMIT_REMAINING, decision.remaining.to_string());
    put(
        headers::X_RATE_LIMIT_RESET,
        decision.reset_at.timestamp().to_string(),
    );
    put(headers::RETRY_AFTER, decision.reset_after_secs.to_string());

    map
}
