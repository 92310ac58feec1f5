// ABOUTME: Axum response conversion for classified errors
// ABOUTME: Renders the fixed JSON error body with status, correlation id, and extra headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

use super::{ClassifiedError, ErrorResponse};
use crate::constants::headers;

/// A classified error on its way out of a handler
///
/// Carries the render-time choices the error itself doesn't know about:
/// whether diagnostics are exposed, retry advice, and extra headers.
#[derive(Debug)]
pub struct ErrorReply {
    error: ClassifiedError,
    diagnostics: bool,
    retry_after: Option<u64>,
    headers: HeaderMap,
}

impl ErrorReply {
    /// Wrap a classified error
    #[must_use]
    pub fn new(error: ClassifiedError, diagnostics: bool) -> Self {
        Self {
            error,
            diagnostics,
            retry_after: None,
            headers: HeaderMap::new(),
        }
    }

    /// Include `retryAfter` in the body
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Merge extra response headers
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// The wrapped error
    #[must_use]
    pub const fn error(&self) -> &ClassifiedError {
        &self.error
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = ErrorResponse::from_classified(&self.error, self.diagnostics);
        if let Some(seconds) = self.retry_after {
            body = body.with_retry_after(seconds);
        }

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().extend(self.headers);
        if let Ok(value) = HeaderValue::from_str(&self.error.context.request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(headers::X_REQUEST_ID), value);
        }
        response
    }
}
