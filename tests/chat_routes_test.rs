// ABOUTME: Integration tests for the POST and OPTIONS chat routes
// ABOUTME: Drives the full router with a scripted provider to check the pipeline end to end
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;
mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use course_chat::llm::{MessageRole, UpstreamError};
use course_chat::rate_limiting::FixedWindowRateLimiter;
use course_chat::server::{build_router, ServerResources};
use helpers::axum_test::AxumTestRequest;
use helpers::fake_provider::FakeProvider;
use serde_json::{json, Value};

fn app_with(provider: Arc<FakeProvider>, overrides: &[(&str, &str)]) -> Router {
    common::init_test_logging();
    let config = common::test_server_config(overrides);
    let limiter = Arc::new(FixedWindowRateLimiter::new(config.groq.rate_limit));
    build_router(Arc::new(ServerResources::with_components(
        config, provider, limiter,
    )))
}

fn app(provider: Arc<FakeProvider>) -> Router {
    app_with(provider, &[])
}

fn connection_refused() -> UpstreamError {
    UpstreamError::Network(
        "error sending request: tcp connect error: Connection refused (os error 111)".to_owned(),
    )
}

#[tokio::test]
async fn test_message_streams_events_with_default_context() {
    let provider = Arc::new(FakeProvider::replying(&["Web", " development", " and more."]));

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "What topics are covered?" }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::OK);

    assert!(response
        .header("content-type")
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(response.header("cache-control"), Some("no-cache"));
    assert!(response.header("x-request-id").unwrap().starts_with("req_"));

    let events = response.sse_events();
    let chunks: Vec<&str> = events
        .iter()
        .filter(|e| e["type"] == "chunk")
        .map(|e| e["content"].as_str().unwrap())
        .collect();
    assert_eq!(chunks, vec!["Web", " development", " and more."]);
    assert_eq!(events.last().unwrap()["type"], "done");
    assert_eq!(events.last().unwrap()["finishReason"], "stop");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::System);
    assert!(messages[0].content.contains("## Current focus"));
    assert_eq!(messages[1].content, "What topics are covered?");
    assert_eq!(requests[0].model, "llama-3.3-70b-versatile");
}

#[tokio::test]
async fn test_empty_message_is_validation_error() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "" }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "VALIDATION_ERROR");
    assert_eq!(body["error"], "Message cannot be empty");
    assert_eq!(body["isRetryable"], false);
    assert!(body["requestId"].is_string());
    assert!(body.get("technicalError").is_none());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_overlong_message_is_rejected_before_sanitizing() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));
    let message = format!("{}{}", "a".repeat(1995), "<b></b>");

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": message }))
        .send(app(provider))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Message is too long (maximum 2000 characters)");
}

#[tokio::test]
async fn test_script_only_message_is_invalid_content() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "<SCRIPT type=\"text/javascript\">alert(1)</script>" }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "VALIDATION_ERROR");
    assert_eq!(body["error"], "Message contains invalid content");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));

    let response = AxumTestRequest::post("/chat")
        .header("content-type", "application/json")
        .raw_body("{\"message\": ")
        .send(app(provider))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_body_over_size_limit_is_payload_too_large() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));
    let message = "a".repeat(70 * 1024);

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": message }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "REQUEST_TOO_LARGE");
    assert_eq!(body["isRetryable"], false);
    assert!(response.header("x-request-id").is_some());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_unknown_context_is_rejected() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "hi", "context": { "type": "astrology" } }))
        .send(app(provider))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid conversation context");
}

#[tokio::test]
async fn test_eleventh_request_in_window_is_rate_limited() {
    let provider = Arc::new(FakeProvider::replying(&["ok"]));
    let router = app(Arc::clone(&provider));

    for _ in 0..10 {
        AxumTestRequest::post("/chat")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .json(&json!({ "message": "hello" }))
            .send(router.clone())
            .await
            .assert_status(StatusCode::OK);
    }

    let response = AxumTestRequest::post("/chat")
        .header("x-forwarded-for", "203.0.113.9")
        .json(&json!({ "message": "hello" }))
        .send(router.clone())
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(response.header("x-ratelimit-limit"), Some("10"));
    assert_eq!(response.header("x-ratelimit-remaining"), Some("0"));
    let retry_after: u64 = response.header("retry-after").unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));

    let body: Value = response.json();
    assert_eq!(body["errorType"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["retryAfter"], 60);
    assert_eq!(body["isRetryable"], true);
    assert_eq!(provider.calls(), 10);

    // Another client has its own window
    AxumTestRequest::post("/chat")
        .header("x-real-ip", "198.51.100.20")
        .json(&json!({ "message": "hello" }))
        .send(router)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_applies_before_validation() {
    let provider = Arc::new(FakeProvider::replying(&["ok"]));
    let router = app_with(provider, &[("CHAT_RATE_LIMIT_REQUESTS", "1")]);

    AxumTestRequest::post("/chat")
        .json(&json!({ "message": "" }))
        .send(router.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Invalid requests still count toward the window
    AxumTestRequest::post("/chat")
        .json(&json!({ "message": "" }))
        .send(router)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_connection_refused_is_retryable_network_error() {
    let provider = Arc::new(
        FakeProvider::replying(&["never"]).with_setup_failures(vec![
            connection_refused(),
            connection_refused(),
            connection_refused(),
        ]),
    );

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "Are you there?" }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "NETWORK_ERROR");
    assert_eq!(body["isRetryable"], true);
    assert!(!body["error"].as_str().unwrap().contains("os error"));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_transient_failure_is_retried_before_streaming() {
    let provider = Arc::new(
        FakeProvider::replying(&["recovered"]).with_setup_failures(vec![UpstreamError::Status {
            status: 503,
            message: "Service Unavailable".to_owned(),
        }]),
    );

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "retry please" }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(response.sse_events()[0]["content"], "recovered");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_invalid_api_key_is_not_retried() {
    let provider = Arc::new(
        FakeProvider::replying(&["never"]).with_setup_failures(vec![UpstreamError::Status {
            status: 401,
            message: "Invalid API Key (type: invalid_request_error, code: invalid_api_key)"
                .to_owned(),
        }]),
    );

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "hello" }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "API_KEY_INVALID");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_mid_stream_failure_ends_with_error_event() {
    let provider = Arc::new(
        FakeProvider::replying(&["Partial"])
            .with_mid_stream_error(UpstreamError::Stream("connection reset".to_owned())),
    );

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "hello" }))
        .send(app(provider))
        .await
        .assert_status(StatusCode::OK);

    let events = response.sse_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["content"], "Partial");
    assert_eq!(events[1]["type"], "error");
    assert_eq!(events[1]["errorType"], "STREAM_INTERRUPTED");
    assert!(events[1].get("technicalError").is_none());
    assert!(!events.iter().any(|e| e["type"] == "done"));
}

#[tokio::test]
async fn test_history_keeps_only_valid_entries() {
    let provider = Arc::new(FakeProvider::replying(&["ok"]));

    AxumTestRequest::post("/chat")
        .json(&json!({
            "message": "And the schedule?",
            "conversationHistory": [
                { "role": "user", "content": "Tell me about the bootcamp" },
                { "role": "wizard", "content": "dropped" },
                { "role": "assistant" },
                "not an object",
                { "role": "assistant", "content": "It runs for twelve weeks." }
            ],
            "context": { "type": "course-information" }
        }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::OK);

    let messages = &provider.requests()[0].messages;
    let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User
        ]
    );
    assert_eq!(messages[2].content, "It runs for twelve weeks.");
}

#[tokio::test]
async fn test_valid_overrides_apply_and_invalid_ones_are_ignored() {
    let provider = Arc::new(FakeProvider::replying(&["ok"]));

    AxumTestRequest::post("/chat")
        .json(&json!({
            "message": "hello",
            "config": { "model": "llama-3.1-8b-instant", "temperature": 9.5, "maxTokens": 256 }
        }))
        .send(app(Arc::clone(&provider)))
        .await
        .assert_status(StatusCode::OK);

    let request = &provider.requests()[0];
    assert_eq!(request.model, "llama-3.1-8b-instant");
    assert_eq!(request.max_tokens, Some(256));
    assert_eq!(request.temperature, Some(0.7));
}

#[tokio::test]
async fn test_well_formed_request_id_is_echoed() {
    let provider = Arc::new(FakeProvider::replying(&["ok"]));

    let response = AxumTestRequest::post("/chat")
        .header("x-request-id", "widget-7f3a")
        .json(&json!({ "message": "" }))
        .send(app(provider))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(response.header("x-request-id"), Some("widget-7f3a"));
    let body: Value = response.json();
    assert_eq!(body["requestId"], "widget-7f3a");
}

#[tokio::test]
async fn test_diagnostic_mode_exposes_technical_detail() {
    let provider = Arc::new(FakeProvider::replying(&["never"]).with_setup_failures(vec![
        UpstreamError::Status {
            status: 404,
            message: "The model `gone` does not exist or you do not have access to it.".to_owned(),
        },
    ]));

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "hello" }))
        .send(app_with(provider, &[("CHAT_DIAGNOSTICS", "true")]))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_eq!(body["errorType"], "MODEL_NOT_FOUND");
    assert!(body["technicalError"].is_string());
    assert!(body["severity"].is_string());
}

#[tokio::test]
async fn test_non_streaming_mode_sends_single_chunk() {
    let provider = Arc::new(FakeProvider::replying(&["One", " answer"]));

    let response = AxumTestRequest::post("/chat")
        .json(&json!({ "message": "hello" }))
        .send(app_with(provider, &[("GROQ_ENABLE_STREAMING", "false")]))
        .await
        .assert_status(StatusCode::OK);

    let events = response.sse_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["content"], "One answer");
    assert_eq!(events[1]["type"], "done");
}

#[tokio::test]
async fn test_options_returns_permissive_cors() {
    let provider = Arc::new(FakeProvider::replying(&["unused"]));

    let response = AxumTestRequest::options("/chat")
        .send(app(provider))
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert!(response.text().is_empty());
}
