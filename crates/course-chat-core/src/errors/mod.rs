// ABOUTME: Closed error taxonomy for the chat pipeline with fixed per-kind attributes
// ABOUTME: Defines ErrorType, Severity, ErrorContext, ClassifiedError, and the JSON error body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every failure of the chat pipeline ends as exactly one [`ClassifiedError`].
//! Its [`ErrorType`] comes from a closed set, and everything else a caller
//! needs (severity, retryability, remediation hint, user-safe message, HTTP
//! status) is looked up from that type through fixed tables. Nothing is
//! derived from the upstream error text except the choice of type.

mod classifier;
#[cfg(feature = "http-response")]
mod http;

pub use classifier::{classify, parse_error, ClassificationRule, RawError, Signal, RULES};
#[cfg(feature = "http-response")]
pub use http::ErrorReply;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error kinds surfaced by the chat pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    // Credentials
    /// No API key was configured
    ApiKeyMissing,
    /// Provider rejected the API key
    ApiKeyInvalid,
    /// API key is past its expiry
    ApiKeyExpired,
    /// API key was revoked
    ApiKeyRevoked,

    // Rate limiting
    /// Per-client window exhausted
    RateLimitExceeded,
    /// Provider hourly quota exhausted
    HourlyLimitExceeded,
    /// Too many requests in a short burst
    BurstLimitExceeded,

    // Request
    /// Upstream call exceeded the timeout
    RequestTimeout,
    /// Body or prompt exceeds the size limit
    RequestTooLarge,
    /// Provider could not interpret the request
    MalformedRequest,
    /// Request was aborted before completion
    RequestCancelled,

    // Model
    /// Configured model does not exist upstream
    ModelNotFound,
    /// Model is at capacity
    ModelOverloaded,
    /// Model has been retired
    ModelDeprecated,
    /// Model is temporarily offline
    ModelUnavailable,

    // Content
    /// Moderation blocked the content
    ContentFiltered,
    /// Prompt exceeds the model context window
    ContentTooLong,
    /// Content rejected as invalid
    InvalidContent,

    // Network
    /// Generic transport failure
    NetworkError,
    /// Provider host could not be resolved
    DnsError,
    /// Provider refused the connection
    ConnectionRefused,
    /// TLS handshake or certificate failure
    TlsError,

    // Service
    /// Provider returned 503 or equivalent
    ServiceUnavailable,
    /// Provider is under maintenance
    MaintenanceMode,
    /// Provider is shedding load
    ServiceOverloaded,

    // Configuration
    /// Server configuration is unusable
    ConfigurationError,

    // Streaming
    /// Response stream broke after it started
    StreamInterrupted,
    /// Response stream stalled
    StreamTimeout,
    /// Stream frame could not be decoded
    InvalidStreamData,

    // Catch-all
    /// Provider response could not be parsed
    ParseError,
    /// Incoming request failed validation
    ValidationError,
    /// Nothing else matched
    UnknownError,
}

/// How badly a failure affects the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Caller mistake, nothing to page on
    Low,
    /// Degraded but recoverable
    Medium,
    /// Requests are failing
    High,
    /// Service cannot work until fixed
    Critical,
}

impl Severity {
    /// Lowercase name used in logs and diagnostic bodies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed attributes attached to each error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDescriptor {
    /// Impact level
    pub severity: Severity,
    /// Whether repeating the same request may succeed
    pub retryable: bool,
    /// Remediation hint for the caller
    pub suggested_action: &'static str,
    /// Message safe to show to end users
    pub user_message: &'static str,
}

const fn descriptor(
    severity: Severity,
    retryable: bool,
    suggested_action: &'static str,
    user_message: &'static str,
) -> ErrorDescriptor {
    ErrorDescriptor {
        severity,
        retryable,
        suggested_action,
        user_message,
    }
}

impl ErrorType {
    /// Every member of the taxonomy
    pub const ALL: [Self; 32] = [
        Self::ApiKeyMissing,
        Self::ApiKeyInvalid,
        Self::ApiKeyExpired,
        Self::ApiKeyRevoked,
        Self::RateLimitExceeded,
        Self::HourlyLimitExceeded,
        Self::BurstLimitExceeded,
        Self::RequestTimeout,
        Self::RequestTooLarge,
        Self::MalformedRequest,
        Self::RequestCancelled,
        Self::ModelNotFound,
        Self::ModelOverloaded,
        Self::ModelDeprecated,
        Self::ModelUnavailable,
        Self::ContentFiltered,
        Self::ContentTooLong,
        Self::InvalidContent,
        Self::NetworkError,
        Self::DnsError,
        Self::ConnectionRefused,
        Self::TlsError,
        Self::ServiceUnavailable,
        Self::MaintenanceMode,
        Self::ServiceOverloaded,
        Self::ConfigurationError,
        Self::StreamInterrupted,
        Self::StreamTimeout,
        Self::InvalidStreamData,
        Self::ParseError,
        Self::ValidationError,
        Self::UnknownError,
    ];

    /// Wire name, e.g. `RATE_LIMIT_EXCEEDED`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiKeyMissing => "API_KEY_MISSING",
            Self::ApiKeyInvalid => "API_KEY_INVALID",
            Self::ApiKeyExpired => "API_KEY_EXPIRED",
            Self::ApiKeyRevoked => "API_KEY_REVOKED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::HourlyLimitExceeded => "HOURLY_LIMIT_EXCEEDED",
            Self::BurstLimitExceeded => "BURST_LIMIT_EXCEEDED",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::RequestTooLarge => "REQUEST_TOO_LARGE",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::RequestCancelled => "REQUEST_CANCELLED",
            Self::ModelNotFound => "MODEL_NOT_FOUND",
            Self::ModelOverloaded => "MODEL_OVERLOADED",
            Self::ModelDeprecated => "MODEL_DEPRECATED",
            Self::ModelUnavailable => "MODEL_UNAVAILABLE",
            Self::ContentFiltered => "CONTENT_FILTERED",
            Self::ContentTooLong => "CONTENT_TOO_LONG",
            Self::InvalidContent => "INVALID_CONTENT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::DnsError => "DNS_ERROR",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::TlsError => "TLS_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::MaintenanceMode => "MAINTENANCE_MODE",
            Self::ServiceOverloaded => "SERVICE_OVERLOADED",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::StreamInterrupted => "STREAM_INTERRUPTED",
            Self::StreamTimeout => "STREAM_TIMEOUT",
            Self::InvalidStreamData => "INVALID_STREAM_DATA",
            Self::ParseError => "PARSE_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// HTTP status returned to the caller for this error type
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            // 429 Too Many Requests
            Self::RateLimitExceeded | Self::HourlyLimitExceeded | Self::BurstLimitExceeded => 429,

            // 401 Unauthorized
            Self::ApiKeyMissing | Self::ApiKeyInvalid | Self::ApiKeyExpired | Self::ApiKeyRevoked => {
                401
            }

            // 400 Bad Request
            Self::ValidationError
            | Self::MalformedRequest
            | Self::ContentFiltered
            | Self::ContentTooLong
            | Self::InvalidContent
            | Self::ModelDeprecated => 400,

            // 404 Not Found
            Self::ModelNotFound => 404,

            // 413 Payload Too Large
            Self::RequestTooLarge => 413,

            // 408 Request Timeout
            Self::RequestTimeout | Self::StreamTimeout => 408,

            // 503 Service Unavailable
            Self::NetworkError
            | Self::DnsError
            | Self::ConnectionRefused
            | Self::TlsError
            | Self::ServiceUnavailable
            | Self::MaintenanceMode
            | Self::ServiceOverloaded
            | Self::ModelOverloaded
            | Self::ModelUnavailable => 503,

            // 500 Internal Server Error
            Self::RequestCancelled
            | Self::ConfigurationError
            | Self::StreamInterrupted
            | Self::InvalidStreamData
            | Self::ParseError
            | Self::UnknownError => 500,
        }
    }

    /// Severity, retryability, remediation, and user message for this type
    #[must_use]
    pub const fn descriptor(self) -> ErrorDescriptor {
        use Severity::{Critical, High, Low, Medium};

        match self {
            Self::ApiKeyMissing => descriptor(
                Critical,
                false,
                "Set the GROQ_API_KEY environment variable and restart the service",
                "The chat assistant is not configured yet. Please try again later.",
            ),
            Self::ApiKeyInvalid => descriptor(
                Critical,
                false,
                "Verify the configured API key in the provider console",
                "The chat assistant is temporarily unavailable. Please try again later.",
            ),
            Self::ApiKeyExpired => descriptor(
                High,
                false,
                "Generate a new API key and update the service configuration",
                "The chat assistant is temporarily unavailable. Please try again later.",
            ),
            Self::ApiKeyRevoked => descriptor(
                Critical,
                false,
                "Issue a replacement API key and update the service configuration",
                "The chat assistant is temporarily unavailable. Please try again later.",
            ),
            Self::RateLimitExceeded => descriptor(
                Medium,
                true,
                "Wait a minute before sending another message",
                "You're sending messages too quickly. Please wait a moment and try again.",
            ),
            Self::HourlyLimitExceeded => descriptor(
                Medium,
                true,
                "Wait for the hourly quota to reset",
                "The assistant has reached its hourly limit. Please try again later.",
            ),
            Self::BurstLimitExceeded => descriptor(
                Low,
                true,
                "Pause briefly between messages",
                "Too many messages at once. Please slow down and try again.",
            ),
            Self::RequestTimeout => descriptor(
                Medium,
                true,
                "Retry the request; shorten the message if it keeps timing out",
                "The assistant took too long to respond. Please try again.",
            ),
            Self::RequestTooLarge => descriptor(
                Low,
                false,
                "Shorten the message or clear the conversation history",
                "Your message is too large. Please shorten it and try again.",
            ),
            Self::MalformedRequest => descriptor(
                Low,
                false,
                "Check the request body format",
                "Something was wrong with that request. Please try again.",
            ),
            Self::RequestCancelled => descriptor(
                Low,
                false,
                "Resend the message if the response is still needed",
                "The request was cancelled.",
            ),
            Self::ModelNotFound => descriptor(
                High,
                false,
                "Configure a model from the supported model list",
                "The chat assistant is temporarily unavailable. Please try again later.",
            ),
            Self::ModelOverloaded => descriptor(
                Medium,
                true,
                "Retry after a short delay",
                "The assistant is very busy right now. Please try again in a moment.",
            ),
            Self::ModelDeprecated => descriptor(
                High,
                false,
                "Switch the configured model to a supported replacement",
                "The chat assistant is temporarily unavailable. Please try again later.",
            ),
            Self::ModelUnavailable => descriptor(
                High,
                true,
                "Retry later or configure a different model",
                "The chat assistant is temporarily unavailable. Please try again later.",
            ),
            Self::ContentFiltered => descriptor(
                Low,
                false,
                "Rephrase the message",
                "Your message couldn't be processed. Please rephrase it and try again.",
            ),
            Self::ContentTooLong => descriptor(
                Low,
                false,
                "Shorten the message",
                "Your message is too long. Please shorten it and try again.",
            ),
            Self::InvalidContent => descriptor(
                Low,
                false,
                "Remove markup or unsupported characters from the message",
                "Your message contains content we can't process. Please revise it.",
            ),
            Self::NetworkError => descriptor(
                High,
                true,
                "Check outbound connectivity to the provider",
                "We're having trouble reaching the assistant. Please try again shortly.",
            ),
            Self::DnsError => descriptor(
                High,
                true,
                "Check DNS resolution for the provider host",
                "We're having trouble reaching the assistant. Please try again shortly.",
            ),
            Self::ConnectionRefused => descriptor(
                High,
                true,
                "Check that the provider endpoint is reachable",
                "We're having trouble reaching the assistant. Please try again shortly.",
            ),
            Self::TlsError => descriptor(
                High,
                false,
                "Check TLS configuration and certificates for the provider host",
                "We're having trouble reaching the assistant. Please try again later.",
            ),
            Self::ServiceUnavailable => descriptor(
                High,
                true,
                "Retry after a short delay",
                "The assistant is temporarily unavailable. Please try again shortly.",
            ),
            Self::MaintenanceMode => descriptor(
                Medium,
                true,
                "Retry after the provider maintenance window",
                "The assistant is undergoing maintenance. Please try again later.",
            ),
            Self::ServiceOverloaded => descriptor(
                Medium,
                true,
                "Retry after a short delay",
                "The assistant is very busy right now. Please try again in a moment.",
            ),
            Self::ConfigurationError => descriptor(
                Critical,
                false,
                "Review the service configuration and restart",
                "The chat assistant is not configured correctly. Please try again later.",
            ),
            Self::StreamInterrupted => descriptor(
                Medium,
                true,
                "Resend the message",
                "The response was interrupted. Please try again.",
            ),
            Self::StreamTimeout => descriptor(
                Medium,
                true,
                "Resend the message",
                "The response stalled. Please try again.",
            ),
            Self::InvalidStreamData => descriptor(
                Medium,
                false,
                "Report the issue if it persists",
                "We received an unexpected response. Please try again.",
            ),
            Self::ParseError => descriptor(
                Medium,
                false,
                "Report the issue if it persists",
                "We received an unexpected response. Please try again.",
            ),
            Self::ValidationError => descriptor(
                Low,
                false,
                "Correct the request and resend it",
                "Your message couldn't be sent. Please check it and try again.",
            ),
            Self::UnknownError => descriptor(
                Medium,
                false,
                "Retry later and report the issue if it persists",
                "Something went wrong. Please try again later.",
            ),
        }
    }

    /// Whether the error belongs to the rate limiting family
    #[must_use]
    pub const fn is_rate_limit(self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::HourlyLimitExceeded | Self::BurstLimitExceeded
        )
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-sensitive request metadata attached to a classified error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    /// Correlation id echoed to the caller
    pub request_id: String,
    /// When the error was classified
    pub timestamp: DateTime<Utc>,
    /// Endpoint that produced the error, e.g. `POST /chat`
    pub endpoint: String,
    /// Time spent on the request before the failure, in milliseconds
    pub response_time_ms: u64,
    /// Upstream or local HTTP status, when one was observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Free-form extra data for logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
}

impl ErrorContext {
    /// Create a context stamped with the current time
    #[must_use]
    pub fn new(request_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            endpoint: endpoint.into(),
            response_time_ms: 0,
            status_code: None,
            additional_data: None,
        }
    }

    /// Record elapsed request time
    #[must_use]
    pub const fn with_response_time(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }

    /// Record an observed HTTP status
    #[must_use]
    pub const fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach extra log data
    #[must_use]
    pub fn with_additional_data(mut self, data: serde_json::Value) -> Self {
        self.additional_data = Some(data);
        self
    }
}

/// A failure mapped onto the closed taxonomy
///
/// Built once per failed operation, logged, turned into an [`ErrorResponse`],
/// then dropped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error_type}: {message}")]
pub struct ClassifiedError {
    /// Error kind
    pub error_type: ErrorType,
    /// Impact level
    pub severity: Severity,
    /// Internal diagnostic message
    pub message: String,
    /// Message safe to show to end users
    pub user_friendly_message: String,
    /// Whether repeating the request may succeed
    pub is_retryable: bool,
    /// Remediation hint
    pub suggested_action: String,
    /// Request metadata
    pub context: ErrorContext,
    /// Raw upstream error text, shown only in diagnostic mode
    pub original_error: Option<String>,
}

impl ClassifiedError {
    /// Build an error whose attributes come from the type's fixed descriptor
    #[must_use]
    pub fn new(error_type: ErrorType, message: impl Into<String>, context: ErrorContext) -> Self {
        let d = error_type.descriptor();
        Self {
            error_type,
            severity: d.severity,
            message: message.into(),
            user_friendly_message: d.user_message.to_owned(),
            is_retryable: d.retryable,
            suggested_action: d.suggested_action.to_owned(),
            context,
            original_error: None,
        }
    }

    /// A request validation failure
    ///
    /// Validation reasons are produced locally and never contain upstream
    /// text, so the reason doubles as the user-facing message.
    #[must_use]
    pub fn validation(reason: impl Into<String>, context: ErrorContext) -> Self {
        let reason = reason.into();
        let mut error = Self::new(ErrorType::ValidationError, reason.clone(), context);
        error.user_friendly_message = reason;
        error
    }

    /// Local admission control rejected the caller
    #[must_use]
    pub fn rate_limited(limit: u32, window_ms: u64, context: ErrorContext) -> Self {
        Self::new(
            ErrorType::RateLimitExceeded,
            format!("Client exceeded {limit} requests per {window_ms}ms window"),
            context.with_status_code(429),
        )
    }

    /// Keep the raw upstream text for diagnostic output
    #[must_use]
    pub fn with_original_error(mut self, original: impl Into<String>) -> Self {
        self.original_error = Some(original.into());
        self
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.error_type.http_status()
    }
}

/// JSON body returned for every failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// User-safe message
    pub error: String,
    /// Error kind
    pub error_type: ErrorType,
    /// Whether the caller may retry
    pub is_retryable: bool,
    /// Remediation hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Correlation id
    pub request_id: String,
    /// Milliseconds spent before the failure
    pub response_time: u64,
    /// Seconds to wait before retrying, for rate limit errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Internal message, diagnostic mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_error: Option<String>,
    /// Raw upstream text, diagnostic mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,
    /// Severity, diagnostic mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl ErrorResponse {
    /// Build the response body, exposing internals only when `diagnostics` is set
    #[must_use]
    pub fn from_classified(error: &ClassifiedError, diagnostics: bool) -> Self {
        Self {
            error: error.user_friendly_message.clone(),
            error_type: error.error_type,
            is_retryable: error.is_retryable,
            suggested_action: Some(error.suggested_action.clone()),
            timestamp: error.context.timestamp.to_rfc3339(),
            request_id: error.context.request_id.clone(),
            response_time: error.context.response_time_ms,
            retry_after: None,
            technical_error: diagnostics.then(|| error.message.clone()),
            original_error: if diagnostics {
                error.original_error.clone()
            } else {
                None
            },
            severity: diagnostics.then_some(error.severity),
        }
    }

    /// Attach retry advice in seconds
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}
