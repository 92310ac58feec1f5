// ABOUTME: LLM provider abstraction for the chat relay with streaming support
// ABOUTME: Defines message and request types, the provider trait, and raw upstream errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # LLM Provider Interface
//!
//! The chat route talks to the model through [`LlmProvider`]. Providers never
//! classify their own failures: they return an [`UpstreamError`] describing
//! what happened, and the route maps it onto the closed error taxonomy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use course_chat::llm::{ChatMessage, ChatRequest, LlmProvider};
//!
//! async fn example(provider: &dyn LlmProvider) {
//!     let request = ChatRequest::new(
//!         vec![
//!             ChatMessage::system("You are a helpful course advisor."),
//!             ChatMessage::user("What topics are covered?"),
//!         ],
//!         "llama-3.3-70b-versatile",
//!     );
//!     let _stream = provider.complete_stream(&request).await;
//! }
//! ```

mod groq;
pub mod prompts;
pub mod sse_parser;

pub use groq::GroqProvider;

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_stream::Stream;

use crate::models::HistoryRole;
use course_chat_core::errors::RawError;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl From<HistoryRole> for MessageRole {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::System => Self::System,
            HistoryRole::User => Self::User,
            HistoryRole::Assistant => Self::Assistant,
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Model identifier
    pub model: String,
    /// Temperature for response randomness (0.0 - 2.0)
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a non-streaming chat completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated message content
    pub content: String,
    /// Model used for generation
    pub model: String,
    /// Finish reason (stop, length, etc.)
    pub finish_reason: Option<String>,
}

/// A chunk of a streaming response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta for this chunk
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason if final
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    /// A content delta
    #[must_use]
    pub fn delta(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            is_final: false,
            finish_reason: None,
        }
    }

    /// The terminating chunk
    #[must_use]
    pub fn finished(finish_reason: impl Into<String>) -> Self {
        Self {
            delta: String::new(),
            is_final: true,
            finish_reason: Some(finish_reason.into()),
        }
    }
}

/// Stream type for chat completion responses
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, UpstreamError>> + Send>>;

// ============================================================================
// Upstream Errors
// ============================================================================

/// Unclassified failure raised while talking to the provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Provider answered with a non-success status
    #[error("provider returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Provider error message or truncated body
        message: String,
    },

    /// Stream setup or completion exceeded the configured timeout
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout
        timeout_ms: u64,
    },

    /// Transport failure before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// Provider reported an error inside an otherwise successful stream
    #[error("provider error: {0}")]
    Provider(String),

    /// The response stream broke after it started
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// The response body could not be decoded
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// Build a network error from a transport error and its full source chain
    #[must_use]
    pub fn network(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::Network(error_chain(error))
    }

    /// Raw form handed to the classifier
    #[must_use]
    pub fn to_raw(&self) -> RawError {
        match self {
            Self::Status { status, message } => RawError::with_status(*status, message.clone()),
            other => RawError::message(other.to_string()),
        }
    }
}

/// Render an error and every `source()` below it, joined by `: `
#[must_use]
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        let inner_text = inner.to_string();
        if !text.contains(&inner_text) {
            text.push_str(": ");
            text.push_str(&inner_text);
        }
        source = inner.source();
    }
    text
}

// ============================================================================
// Provider Trait
// ============================================================================

/// LLM provider trait for chat completion
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier (e.g., "groq")
    fn name(&self) -> &'static str;

    /// Human-readable display name for the provider
    fn display_name(&self) -> &'static str;

    /// Base URL of the provider API
    fn base_url(&self) -> &str;

    /// Perform a chat completion (non-streaming)
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, UpstreamError>;

    /// Start a streaming chat completion
    ///
    /// Resolves once the provider has accepted the request; chunks then
    /// arrive in provider order.
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, UpstreamError>;

    /// Probe connectivity, returning the model ids the provider reports
    async fn health_check(&self) -> Result<Vec<String>, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);
    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("error sending request")
        }
    }
    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("tcp connect error: Connection refused")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }
    impl std::error::Error for Inner {}

    #[test]
    fn test_network_error_keeps_source_chain() {
        let err = UpstreamError::network(&Outer(Inner));
        assert_eq!(
            err.to_string(),
            "network error: error sending request: tcp connect error: Connection refused"
        );
    }

    #[test]
    fn test_status_error_keeps_status_for_classifier() {
        let err = UpstreamError::Status {
            status: 429,
            message: "slow down".to_owned(),
        };
        assert_eq!(err.to_raw(), RawError::with_status(429, "slow down"));
    }

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let raw = UpstreamError::Timeout { timeout_ms: 30_000 }.to_raw();
        assert_eq!(raw, RawError::message("request timeout after 30000ms"));
    }
}
