// ABOUTME: Groq LLM provider implementation with streaming support
// ABOUTME: Uses the OpenAI-compatible API; reports failures as raw upstream errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Groq Provider
//!
//! Implementation of [`LlmProvider`] for Groq's OpenAI-compatible API.
//!
//! Only the phase up to response headers is bounded by the configured timeout
//! when streaming; once tokens flow, the stream runs until the provider closes
//! it or the caller drops it. Dropping the returned stream drops the underlying
//! connection.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::sse_parser::create_sse_stream;
use super::{
    error_chain, ChatMessage, ChatRequest, ChatResponse, ChatStream, LlmProvider, StreamChunk,
    UpstreamError,
};
use crate::config::{ConfigError, GroqConfig};

/// Longest provider body excerpt kept in an error message
const ERROR_BODY_EXCERPT_CHARS: usize = 200;

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GroqMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for GroqMessage<'a> {
    fn from(msg: &'a ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    content: Option<String>,
}

/// One streamed event; Groq may send an `error` object mid-stream
#[derive(Debug, Deserialize)]
struct GroqStreamChunk {
    #[serde(default)]
    choices: Vec<GroqStreamChoice>,
    #[serde(default)]
    error: Option<GroqErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GroqStreamChoice {
    #[serde(default)]
    delta: GroqDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GroqDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqErrorResponse {
    error: GroqErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GroqErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl GroqErrorDetail {
    fn describe(&self) -> String {
        let mut text = self.message.clone();
        for tag in [&self.error_type, &self.code].into_iter().flatten() {
            text.push_str(" (");
            text.push_str(tag);
            text.push(')');
        }
        text
    }
}

#[derive(Debug, Deserialize)]
struct GroqModelList {
    data: Vec<GroqModel>,
}

#[derive(Debug, Deserialize)]
struct GroqModel {
    id: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Groq LLM provider
pub struct GroqProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GroqProvider {
    /// Create a provider from validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: &GroqConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(error_chain(&e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
            timeout: config.timeout(),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Run `fut` under the configured timeout
    async fn bounded<T, F>(&self, fut: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>> + Send,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(UpstreamError::Timeout {
                    timeout_ms: self.timeout_ms(),
                })
            })
    }

    fn transport_error(&self, error: &reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout {
                timeout_ms: self.timeout_ms(),
            }
        } else {
            UpstreamError::network(error)
        }
    }

    async fn send_chat(&self, request: &ChatRequest, stream: bool) -> Result<Response, UpstreamError> {
        let body = GroqRequest {
            model: &request.model,
            messages: request.messages.iter().map(GroqMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        Self::ensure_success(response).await
    }

    async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::parse_error_response(status, &body))
    }

    /// Turn a non-success response into a raw status error
    fn parse_error_response(status: StatusCode, body: &str) -> UpstreamError {
        let message = serde_json::from_str::<GroqErrorResponse>(body).map_or_else(
            |_| body.chars().take(ERROR_BODY_EXCERPT_CHARS).collect(),
            |parsed| parsed.error.describe(),
        );
        warn!(status = status.as_u16(), "Groq API returned an error status");
        UpstreamError::Status {
            status: status.as_u16(),
            message,
        }
    }

    fn parse_stream_data(data: &str) -> Option<Result<StreamChunk, UpstreamError>> {
        let chunk = match serde_json::from_str::<GroqStreamChunk>(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Failed to parse Groq stream chunk: {}", e);
                return None;
            }
        };

        if let Some(error) = chunk.error {
            return Some(Err(UpstreamError::Provider(error.describe())));
        }

        let choice = chunk.choices.into_iter().next()?;
        Some(Ok(StreamChunk {
            delta: choice.delta.content.unwrap_or_default(),
            is_final: choice.finish_reason.is_some(),
            finish_reason: choice.finish_reason,
        }))
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn display_name(&self) -> &'static str {
        "Groq (Llama/Mixtral)"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, UpstreamError> {
        debug!("Sending chat completion request to Groq");

        let groq_response: GroqResponse = self
            .bounded(async {
                let response = self.send_chat(request, false).await?;
                let body = response.text().await.map_err(|e| self.transport_error(&e))?;
                serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))
            })
            .await?;

        let choice = groq_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Parse("response contained no choices".to_owned()))?;

        let content = choice.message.content.unwrap_or_default();
        debug!(
            "Received response from Groq: {} chars, finish_reason: {:?}",
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse {
            content,
            model: groq_response.model,
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, UpstreamError> {
        debug!("Sending streaming chat completion request to Groq");

        let response = self.bounded(self.send_chat(request, true)).await?;
        Ok(create_sse_stream(
            response.bytes_stream(),
            Self::parse_stream_data,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<Vec<String>, UpstreamError> {
        debug!("Performing Groq API health check");

        let models: GroqModelList = self
            .bounded(async {
                let response = self
                    .client
                    .get(self.api_url("models"))
                    .bearer_auth(&self.api_key)
                    .send()
                    .await
                    .map_err(|e| self.transport_error(&e))?;
                let response = Self::ensure_success(response).await?;
                let body = response.text().await.map_err(|e| self.transport_error(&e))?;
                serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))
            })
            .await?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}
