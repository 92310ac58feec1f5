// ABOUTME: Error handling entry points for the chat relay
// ABOUTME: Re-exports the error taxonomy, classifies upstream failures, and logs by severity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! The taxonomy and classifier live in `course-chat-core`. This module adds
//! the two pieces that need the application: turning an [`UpstreamError`]
//! into a [`ClassifiedError`], and logging a classified error exactly once at
//! a level chosen from its severity.

pub use course_chat_core::errors::{
    classify, parse_error, ClassificationRule, ClassifiedError, ErrorContext, ErrorReply,
    ErrorResponse, ErrorType, RawError, Severity, Signal, RULES,
};

use tracing::{debug, error, warn};

use crate::llm::UpstreamError;

/// Classify a provider failure
///
/// Failures that only arise after a stream has started are typed directly;
/// everything else goes through the rule chain.
#[must_use]
pub fn classify_upstream(error: &UpstreamError, context: ErrorContext) -> ClassifiedError {
    match error {
        UpstreamError::Stream(_) => {
            ClassifiedError::new(ErrorType::StreamInterrupted, error.to_string(), context)
                .with_original_error(error.to_string())
        }
        UpstreamError::Parse(_) => {
            ClassifiedError::new(ErrorType::ParseError, error.to_string(), context)
                .with_original_error(error.to_string())
        }
        _ => parse_error(error.to_raw(), context),
    }
}

/// Whether a failed upstream call is worth repeating
#[must_use]
pub fn is_retryable_upstream(error: &UpstreamError) -> bool {
    classify_upstream(error, ErrorContext::new("", "")).is_retryable
}

/// Log a classified error with its request metadata
///
/// Low severity goes to debug, medium to warn, high and critical to error.
pub fn log_classified(error: &ClassifiedError) {
    let ctx = &error.context;
    macro_rules! emit {
        ($level:ident) => {
            $level!(
                request_id = %ctx.request_id,
                endpoint = %ctx.endpoint,
                error_type = %error.error_type,
                severity = %error.severity,
                status_code = ?ctx.status_code,
                response_time_ms = ctx.response_time_ms,
                retryable = error.is_retryable,
                "{}",
                error.message
            )
        };
    }

    match error.severity {
        Severity::Low => emit!(debug),
        Severity::Medium => emit!(warn),
        Severity::High | Severity::Critical => emit!(error),
    }
}
