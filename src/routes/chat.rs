// ABOUTME: Chat route handlers running the guarded, validated streaming relay
// ABOUTME: Rate limits, validates, calls the provider with retry, and relays tokens as SSE events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat Routes
//!
//! `POST /chat` runs the pipeline in a fixed order: rate limit, body parse,
//! validation, parameter resolution, provider call (with retry on the
//! stream setup only), and the event-stream relay. Any failure before the
//! first byte is classified once and returned as a JSON error body; a failure
//! after streaming has begun is classified once and sent as a final `error`
//! event.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures_util::{stream, Stream, StreamExt};
use http::header::{self, HeaderValue};
use http::StatusCode;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::{
    classify_upstream, is_retryable_upstream, log_classified, ClassifiedError, ErrorContext,
    ErrorReply, ErrorType,
};
use crate::llm::prompts::build_messages;
use crate::llm::{ChatRequest, ChatStream, LlmProvider, StreamChunk, UpstreamError};
use crate::middleware::{create_rate_limit_headers, options_headers, RequestContext};
use crate::models::GenerationParams;
use crate::retry::execute_with_retry;
use crate::server::ServerResources;
use crate::validation::validate;

/// Endpoint label carried in error context and logs
const ENDPOINT: &str = "POST /chat";

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Handle `POST /chat`
    pub async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        Extension(ctx): Extension<RequestContext>,
        request: Request,
    ) -> Response {
        match Self::run_pipeline(&resources, &ctx, request).await {
            Ok(response) => response,
            Err(reply) => {
                log_classified(reply.error());
                reply.into_response()
            }
        }
    }

    /// Handle `OPTIONS /chat` outside a CORS preflight
    pub async fn options(State(resources): State<Arc<ServerResources>>) -> Response {
        (
            StatusCode::OK,
            options_headers(&resources.config.cors_origins),
        )
            .into_response()
    }

    async fn run_pipeline(
        resources: &ServerResources,
        ctx: &RequestContext,
        request: Request,
    ) -> Result<Response, ErrorReply> {
        let diagnostics = resources.config.diagnostics;

        // Admission first so rejected callers cost nothing else
        let decision = resources.rate_limiter.allow(&ctx.client_key);
        if !decision.allowed {
            let settings = resources.rate_limiter.settings();
            let error = ClassifiedError::rate_limited(
                settings.requests,
                settings.window_ms,
                error_context(ctx),
            );
            return Err(ErrorReply::new(error, diagnostics)
                .with_retry_after(settings.window_secs())
                .with_headers(create_rate_limit_headers(&decision)));
        }

        let payload = read_payload(request, ctx)
            .await
            .map_err(|error| ErrorReply::new(error, diagnostics))?;

        let normalized = validate(&payload).map_err(|failure| {
            ErrorReply::new(
                ClassifiedError::validation(
                    failure.to_string(),
                    error_context(ctx).with_status_code(400),
                ),
                diagnostics,
            )
        })?;

        let (params, ignored) = GenerationParams::resolve(&resources.config.groq, &normalized.overrides);
        if !ignored.is_empty() {
            warn!(
                request_id = %ctx.request_id,
                ignored = ?ignored,
                "Ignoring invalid per-request config overrides"
            );
        }

        let chat_request = ChatRequest::new(build_messages(&normalized), params.model)
            .with_temperature(params.temperature)
            .with_max_tokens(params.max_tokens);

        let upstream = open_stream(resources, &chat_request)
            .await
            .map_err(|e| ErrorReply::new(classify_upstream(&e, error_context(ctx)), diagnostics))?;

        info!(
            request_id = %ctx.request_id,
            context = %normalized.context,
            history = normalized.conversation_history.len(),
            model = %chat_request.model,
            setup_ms = ctx.elapsed_ms(),
            "Relaying chat response stream"
        );

        Ok(relay_response(upstream, ctx.clone(), diagnostics))
    }
}

fn error_context(ctx: &RequestContext) -> ErrorContext {
    ErrorContext::new(&ctx.request_id, ENDPOINT).with_response_time(ctx.elapsed_ms())
}

/// Read the body and parse it as JSON without interpreting its shape
async fn read_payload(request: Request, ctx: &RequestContext) -> Result<Value, ClassifiedError> {
    let body = Bytes::from_request(request, &()).await.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ClassifiedError::new(
                ErrorType::RequestTooLarge,
                rejection.body_text(),
                error_context(ctx).with_status_code(413),
            )
        } else {
            ClassifiedError::validation(
                "Request body could not be read",
                error_context(ctx).with_status_code(400),
            )
            .with_original_error(rejection.body_text())
        }
    })?;

    serde_json::from_slice(&body).map_err(|e| {
        ClassifiedError::validation(
            "Request body must be valid JSON",
            error_context(ctx).with_status_code(400),
        )
        .with_original_error(e.to_string())
    })
}

/// Start the upstream response, retrying only while nothing has been sent
async fn open_stream(
    resources: &ServerResources,
    request: &ChatRequest,
) -> Result<ChatStream, UpstreamError> {
    let groq = &resources.config.groq;
    let provider: &dyn LlmProvider = resources.provider.as_ref();

    if groq.enable_streaming {
        execute_with_retry(
            &groq.retry,
            |_attempt| provider.complete_stream(request),
            is_retryable_upstream,
        )
        .await
    } else {
        let response = execute_with_retry(
            &groq.retry,
            |_attempt| provider.complete(request),
            is_retryable_upstream,
        )
        .await?;

        let finish_reason = response.finish_reason.unwrap_or_else(|| "stop".to_owned());
        let chunks: Vec<Result<StreamChunk, UpstreamError>> = vec![
            Ok(StreamChunk::delta(response.content)),
            Ok(StreamChunk::finished(finish_reason)),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

fn event(payload: &Value) -> Event {
    Event::default().data(payload.to_string())
}

/// Forward upstream deltas as `chunk` events, then `done` or `error`
fn relay_events(
    mut upstream: ChatStream,
    ctx: RequestContext,
    diagnostics: bool,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut finish_reason: Option<String> = None;
        let mut chunks: usize = 0;

        while let Some(item) = upstream.next().await {
            match item {
                Ok(chunk) => {
                    if !chunk.delta.is_empty() {
                        chunks += 1;
                        yield Ok(event(&json!({ "type": "chunk", "content": chunk.delta })));
                    }
                    if chunk.is_final && finish_reason.is_none() {
                        finish_reason = chunk.finish_reason;
                    }
                }
                Err(e) => {
                    let classified = classify_upstream(&e, error_context(&ctx));
                    log_classified(&classified);

                    let mut payload = json!({
                        "type": "error",
                        "errorType": classified.error_type,
                        "error": classified.user_friendly_message,
                        "isRetryable": classified.is_retryable,
                        "requestId": ctx.request_id,
                    });
                    if diagnostics {
                        payload["technicalError"] = json!(classified.message);
                    }
                    yield Ok(event(&payload));
                    return;
                }
            }
        }

        info!(
            request_id = %ctx.request_id,
            chunks,
            finish_reason = ?finish_reason,
            duration_ms = ctx.elapsed_ms(),
            "Chat stream completed"
        );
        yield Ok(event(&json!({ "type": "done", "finishReason": finish_reason })));
    }
}

fn relay_response(upstream: ChatStream, ctx: RequestContext, diagnostics: bool) -> Response {
    let mut response = Sse::new(relay_events(upstream, ctx, diagnostics))
        .keep_alive(KeepAlive::default())
        .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
