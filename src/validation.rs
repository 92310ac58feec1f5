// ABOUTME: Structural validation and sanitization of incoming chat payloads
// ABOUTME: Returns failures as data; never panics on arbitrary JSON input
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Request Validation
//!
//! [`validate`] runs a fixed sequence of checks, stopping at the first
//! failure:
//!
//! 1. the payload is a JSON object
//! 2. `message` is present and a string
//! 3. `message` is not blank
//! 4. `message` is at most 2000 characters, counted before sanitization
//! 5. `conversationHistory`, if present, is an array; malformed entries are dropped
//! 6. `context`, if present, is `{ "type": <known tag> }`
//! 7. `message` is sanitized
//! 8. the sanitized message is not empty
//!
//! The sanitizer is a blocklist: it removes `<script>` blocks and then every
//! remaining angle bracket. Output is never rendered as HTML downstream.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::error;

use crate::models::{
    ChatContext, HistoryMessage, HistoryRole, NormalizedChatRequest, RequestOverrides,
};
use course_chat_core::constants::limits::{MAX_HISTORY_MESSAGES, MAX_MESSAGE_CHARS};

/// `<script ...> ... </script>`, case-insensitive, spanning lines, shortest match
const SCRIPT_BLOCK_PATTERN: &str = r"(?is)<script\b[^>]*>.*?</script\s*>";

static SCRIPT_BLOCK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(SCRIPT_BLOCK_PATTERN)
        .inspect_err(|e| error!(error = %e, "Script block pattern failed to compile"))
        .ok()
});

/// Why a payload was rejected
///
/// Display text is shown to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// Payload is not a JSON object
    #[error("Request body must be a JSON object")]
    NotAnObject,

    /// `message` absent or not a string
    #[error("Message is required and must be a string")]
    MissingMessage,

    /// `message` is blank
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// `message` longer than `max` characters
    #[error("Message is too long (maximum {max} characters)")]
    MessageTooLong {
        /// Character limit
        max: usize,
    },

    /// `conversationHistory` is not an array
    #[error("Conversation history must be an array")]
    HistoryNotArray,

    /// Unknown or malformed `context`
    #[error("Invalid conversation context")]
    InvalidContext,

    /// Nothing left after sanitizing
    #[error("Message contains invalid content")]
    InvalidContent,
}

/// Validate and normalize a raw chat payload
///
/// # Errors
///
/// Returns the first [`ValidationFailure`] encountered.
pub fn validate(payload: &Value) -> Result<NormalizedChatRequest, ValidationFailure> {
    let body = payload.as_object().ok_or(ValidationFailure::NotAnObject)?;

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .ok_or(ValidationFailure::MissingMessage)?;

    if message.trim().is_empty() {
        return Err(ValidationFailure::EmptyMessage);
    }

    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationFailure::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
        });
    }

    let conversation_history = match body.get("conversationHistory") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => filter_history(entries),
        Some(_) => return Err(ValidationFailure::HistoryNotArray),
    };

    let context = parse_context(body)?;

    let sanitized = sanitize(message);
    if sanitized.is_empty() {
        return Err(ValidationFailure::InvalidContent);
    }

    let overrides = match body.get("config") {
        None | Some(Value::Null) => RequestOverrides::default(),
        Some(config) => RequestOverrides::from_value(config),
    };

    Ok(NormalizedChatRequest {
        message: sanitized,
        conversation_history,
        context,
        overrides,
    })
}

/// Strip script blocks, then every angle bracket, then surrounding whitespace
///
/// Without a compiled script pattern every input sanitizes to an empty string,
/// so callers reject it instead of forwarding unfiltered markup.
#[must_use]
pub fn sanitize(input: &str) -> String {
    let Some(script_block) = SCRIPT_BLOCK.as_ref() else {
        error!("Script block pattern unavailable; rejecting message content");
        return String::new();
    };
    let without_scripts = script_block.replace_all(input, "");

    without_scripts
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Keep structurally valid entries, newest `MAX_HISTORY_MESSAGES` only
fn filter_history(entries: &[Value]) -> Vec<HistoryMessage> {
    let valid: Vec<HistoryMessage> = entries.iter().filter_map(history_entry).collect();
    let skip = valid.len().saturating_sub(MAX_HISTORY_MESSAGES);
    valid.into_iter().skip(skip).collect()
}

fn history_entry(value: &Value) -> Option<HistoryMessage> {
    let entry = value.as_object()?;
    let role = HistoryRole::parse(entry.get("role")?.as_str()?)?;
    let content = entry.get("content")?.as_str()?;
    Some(HistoryMessage {
        role,
        content: content.to_owned(),
    })
}

fn parse_context(body: &Map<String, Value>) -> Result<ChatContext, ValidationFailure> {
    match body.get("context") {
        None | Some(Value::Null) => Ok(ChatContext::default()),
        Some(Value::Object(context)) => context
            .get("type")
            .and_then(Value::as_str)
            .and_then(ChatContext::from_tag)
            .ok_or(ValidationFailure::InvalidContext),
        Some(_) => Err(ValidationFailure::InvalidContext),
    }
}
