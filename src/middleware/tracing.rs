// ABOUTME: Request tracing middleware for correlation and structured logging
// ABOUTME: Assigns request IDs, records the client key, and wraps each request in a span
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use tracing::{field, Instrument, Span};
use uuid::Uuid;

use super::rate_limiting::client_key;
use course_chat_core::constants::headers;

/// Longest caller-supplied request id that is echoed back
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request context that flows through the entire request lifecycle
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id echoed in the `x-request-id` header
    pub request_id: String,
    /// Rate limit key derived from proxy headers
    pub client_key: String,
    /// When the request entered the router
    pub started: Instant,
}

impl RequestContext {
    /// Create new request context with generated request ID
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: generate_request_id(),
            client_key: course_chat_core::constants::limits::UNKNOWN_CLIENT.to_owned(),
            started: Instant::now(),
        }
    }

    /// Build the context from incoming headers
    #[must_use]
    pub fn from_headers(request_headers: &HeaderMap) -> Self {
        let request_id = request_headers
            .get(headers::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|id| is_valid_request_id(id))
            .map_or_else(generate_request_id, str::to_owned);

        Self {
            request_id,
            client_key: client_key(request_headers),
            started: Instant::now(),
        }
    }

    /// Time since the request arrived
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in whole milliseconds
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

/// Caller ids are accepted when short and limited to `[A-Za-z0-9_.-]`
#[must_use]
pub fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

/// Create a tracing span for HTTP requests
pub fn create_request_span(method: &str, path: &str) -> Span {
    tracing::info_span!(
        "http_request",
        method = %method,
        path = %path,
        request_id = field::Empty,
        client_key = field::Empty,
        status_code = field::Empty,
        duration_ms = field::Empty,
    )
}

/// Attach a [`RequestContext`] to every request and echo its id on the response
///
/// Mounted with `axum::middleware::from_fn`. Handlers read the context with
/// `Extension<RequestContext>`.
pub async fn with_request_tracing(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(request.headers());
    let span = create_request_span(request.method().as_str(), request.uri().path());
    span.record("request_id", context.request_id.as_str());
    span.record("client_key", context.client_key.as_str());

    let request_id = context.request_id.clone();
    let started = context.started;
    request.extensions_mut().insert(context);

    let mut response = next.run(request).instrument(span.clone()).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .entry(HeaderName::from_static(headers::X_REQUEST_ID))
            .or_insert(value);
    }

    span.record("status_code", response.status().as_u16());
    span.record("duration_ms", started.elapsed().as_millis() as u64);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_validation() {
        assert!(is_valid_request_id("req_abc-123.x"));
        assert!(!is_valid_request_id(""));
        assert!(!is_valid_request_id("has space"));
        assert!(!is_valid_request_id("line\nbreak"));
        assert!(!is_valid_request_id(&"a".repeat(MAX_REQUEST_ID_LEN + 1)));
    }

    #[test]
    fn test_incoming_id_is_honoured() {
        let mut map = HeaderMap::new();
        map.insert("x-request-id", HeaderValue::from_static("client-42"));
        map.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));
        let context = RequestContext::from_headers(&map);
        assert_eq!(context.request_id, "client-42");
        assert_eq!(context.client_key, "198.51.100.4");
    }

    #[test]
    fn test_malformed_id_is_replaced() {
        let mut map = HeaderMap::new();
        map.insert("x-request-id", HeaderValue::from_static("bad id!"));
        let context = RequestContext::from_headers(&map);
        assert!(context.request_id.starts_with("req_"));
        assert_eq!(context.request_id.len(), 4 + 32);
        assert_eq!(context.client_key, "unknown");
    }
}
