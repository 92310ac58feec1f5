// ABOUTME: Ordered rule chain mapping raw upstream failures onto the error taxonomy
// ABOUTME: Each rule is a (predicate, resolver) pair evaluated top to bottom, first match wins
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Error Classifier
//!
//! [`parse_error`] is total: every input yields a [`ClassifiedError`]. Already
//! classified errors pass through untouched; anything else is reduced to a
//! [`Signal`] (status plus lowercased message) and run through [`RULES`].
//! Rules are plain function pointers so each predicate can be tested on its
//! own and the chain reordered without touching unrelated rules.

use super::{ClassifiedError, ErrorContext, ErrorType};

/// A failure as raised by an inner pipeline stage, before classification
#[derive(Debug, Clone, PartialEq)]
pub enum RawError {
    /// Already classified; returned unchanged
    Classified(Box<ClassifiedError>),
    /// Anything else: an optional HTTP status and a message
    Upstream {
        /// HTTP status reported by the provider, if any
        status: Option<u16>,
        /// Raw error text
        message: String,
    },
}

impl RawError {
    /// Raw error with a status code
    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Raw error carrying only a message
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }
}

impl From<ClassifiedError> for RawError {
    fn from(error: ClassifiedError) -> Self {
        Self::Classified(Box::new(error))
    }
}

/// Normalized view of a raw error that rules match against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// HTTP status, if any
    pub status: Option<u16>,
    /// Lowercased message
    pub message: String,
}

impl Signal {
    /// Build a signal from a status and raw message
    #[must_use]
    pub fn new(status: Option<u16>, message: &str) -> Self {
        Self {
            status,
            message: message.to_lowercase(),
        }
    }

    fn has_status(&self, code: u16) -> bool {
        self.status == Some(code)
    }

    fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }

    fn mentions_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.message.contains(n))
    }
}

/// One step of the classification chain
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// Rule name, used in logs and tests
    pub name: &'static str,
    /// Whether this rule claims the signal
    pub matches: fn(&Signal) -> bool,
    /// Error type for a claimed signal
    pub resolve: fn(&Signal) -> ErrorType,
}

impl ClassificationRule {
    /// Apply the rule, returning a type only if the predicate matches
    #[must_use]
    pub fn apply(&self, signal: &Signal) -> Option<ErrorType> {
        (self.matches)(signal).then(|| (self.resolve)(signal))
    }
}

/// Classification rules in priority order
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "rate_limit",
        matches: is_rate_limit,
        resolve: resolve_rate_limit,
    },
    ClassificationRule {
        name: "authentication",
        matches: is_authentication,
        resolve: resolve_authentication,
    },
    ClassificationRule {
        name: "not_found",
        matches: is_not_found,
        resolve: resolve_not_found,
    },
    ClassificationRule {
        name: "timeout",
        matches: is_timeout,
        resolve: |_| ErrorType::RequestTimeout,
    },
    ClassificationRule {
        name: "network",
        matches: is_network_failure,
        resolve: |_| ErrorType::NetworkError,
    },
    ClassificationRule {
        name: "service_unavailable",
        matches: is_service_unavailable,
        resolve: |_| ErrorType::ServiceUnavailable,
    },
    ClassificationRule {
        name: "payload_too_large",
        matches: is_payload_too_large,
        resolve: |_| ErrorType::RequestTooLarge,
    },
    ClassificationRule {
        name: "content_filtered",
        matches: is_content_rejection,
        resolve: |_| ErrorType::ContentFiltered,
    },
];

fn is_rate_limit(s: &Signal) -> bool {
    s.has_status(429) || s.mentions_any(&["rate limit", "rate_limit", "too many requests", "burst"])
}

fn resolve_rate_limit(s: &Signal) -> ErrorType {
    if !s.has_status(429) && s.mentions("burst") {
        ErrorType::BurstLimitExceeded
    } else {
        ErrorType::RateLimitExceeded
    }
}

fn is_authentication(s: &Signal) -> bool {
    s.has_status(401)
        || s.mentions_any(&[
            "authentication",
            "unauthorized",
            "invalid api key",
            "invalid_api_key",
        ])
}

fn resolve_authentication(s: &Signal) -> ErrorType {
    if s.mentions("missing") {
        ErrorType::ApiKeyMissing
    } else if s.mentions("expired") {
        ErrorType::ApiKeyExpired
    } else if s.mentions("revoked") {
        ErrorType::ApiKeyRevoked
    } else {
        ErrorType::ApiKeyInvalid
    }
}

fn is_not_found(s: &Signal) -> bool {
    s.has_status(404) || s.mentions_any(&["not found", "does not exist"])
}

fn resolve_not_found(s: &Signal) -> ErrorType {
    if s.mentions("model") {
        ErrorType::ModelNotFound
    } else {
        ErrorType::ServiceUnavailable
    }
}

fn is_timeout(s: &Signal) -> bool {
    s.mentions_any(&["timeout", "timed out", "etimedout"])
}

fn is_network_failure(s: &Signal) -> bool {
    s.mentions_any(&[
        "econnrefused",
        "enotfound",
        "econnreset",
        "connection refused",
        "connection reset",
        "dns error",
        "failed to lookup address",
        "getaddrinfo",
        "tcp connect error",
        "error trying to connect",
        "network error",
        "network is unreachable",
    ])
}

fn is_service_unavailable(s: &Signal) -> bool {
    s.has_status(503) || s.mentions_any(&["service unavailable", "temporarily unavailable"])
}

fn is_payload_too_large(s: &Signal) -> bool {
    s.has_status(413) || s.mentions_any(&["too large", "payload too large"])
}

fn is_content_rejection(s: &Signal) -> bool {
    s.has_status(400) && s.mentions_any(&["content", "filter", "policy", "moderation", "safety"])
}

/// Map a signal onto the taxonomy; `UNKNOWN_ERROR` when no rule claims it
#[must_use]
pub fn classify(signal: &Signal) -> ErrorType {
    RULES
        .iter()
        .find_map(|rule| rule.apply(signal))
        .unwrap_or(ErrorType::UnknownError)
}

/// Classify a raw error into the taxonomy
///
/// Classified inputs are returned unchanged. For upstream errors the observed
/// status is recorded in the context and the raw text is kept only as
/// `original_error`, never as the user-facing message.
#[must_use]
pub fn parse_error(raw: RawError, context: ErrorContext) -> ClassifiedError {
    match raw {
        RawError::Classified(error) => *error,
        RawError::Upstream { status, message } => {
            let signal = Signal::new(status, &message);
            let error_type = classify(&signal);
            let context = match status {
                Some(code) if context.status_code.is_none() => context.with_status_code(code),
                _ => context,
            };
            ClassifiedError::new(error_type, message.clone(), context).with_original_error(message)
        }
    }
}
