// ABOUTME: Health check route handler for upstream connectivity and configuration
// ABOUTME: Probes the provider's model list and reports limits, rate limiter state, and issues
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring
//!
//! `GET /chat` reports whether the provider answers a model-list probe along
//! with a snapshot of the active configuration. The handler never fails: an
//! unreachable provider yields a 503 carrying the classified error.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use http::StatusCode;
use serde_json::{json, Map, Value};

use crate::config::ServerConfig;
use crate::errors::{classify_upstream, log_classified, ErrorContext, ErrorResponse};
use crate::middleware::RequestContext;
use crate::server::ServerResources;
use course_chat_core::constants::service;

const ENDPOINT: &str = "GET /chat";

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Handle `GET /chat`
    pub async fn health_check(
        State(resources): State<Arc<ServerResources>>,
        Extension(ctx): Extension<RequestContext>,
    ) -> Response {
        let config = &resources.config;
        let groq = &config.groq;
        let probe = resources.provider.health_check().await;

        let (available_models, probe_error) = match probe {
            Ok(models) => (models, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        let connected = probe_error.is_none();

        let mut issues = Vec::new();
        if !connected {
            issues.push("Groq API is not reachable".to_owned());
        } else if !available_models.iter().any(|m| m == &groq.model) {
            issues.push(format!(
                "Configured model {} is not offered by the provider",
                groq.model
            ));
        }
        if !groq.enable_streaming {
            issues.push("Streaming is disabled; responses arrive as a single chunk".to_owned());
        }

        let classified = probe_error.map(|e| {
            classify_upstream(
                &e,
                ErrorContext::new(&ctx.request_id, ENDPOINT)
                    .with_response_time(ctx.elapsed_ms())
                    .with_status_code(503),
            )
        });

        let mut body = json!({
            "status": if connected { "healthy" } else { "unhealthy" },
            "timestamp": Utc::now().to_rfc3339(),
            "requestId": ctx.request_id,
            "service": {
                "name": service::SERVICE_NAME,
                "version": service::SERVICE_VERSION,
                "environment": config.environment.as_str(),
            },
            "groq": {
                "connected": connected,
                "availableModels": available_models,
                "currentModel": groq.model,
                "baseURL": groq.base_url.as_str(),
                "maxTokens": groq.max_tokens,
                "temperature": groq.temperature,
                "enableStreaming": groq.enable_streaming,
            },
            "rateLimiter": {
                "activeRequests": resources.rate_limiter.active_entries(),
                "configured": {
                    "requests": groq.rate_limit.requests,
                    "windowMs": groq.rate_limit.window_ms,
                },
            },
            "configuration": configuration_snapshot(config),
        });
        if !issues.is_empty() {
            body["issues"] = json!(issues);
        }

        let Some(error) = classified else {
            return (StatusCode::OK, Json(body)).into_response();
        };

        log_classified(&error);
        body["groq"]["error"] = json!(error.user_friendly_message);
        if let (Some(target), Ok(Value::Object(fields))) = (
            body.as_object_mut(),
            serde_json::to_value(ErrorResponse::from_classified(&error, config.diagnostics)),
        ) {
            merge_missing(target, fields);
        }
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Copy error body fields that the health body does not already carry
fn merge_missing(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        target.entry(key).or_insert(value);
    }
}

/// Non-secret view of the active configuration
fn configuration_snapshot(config: &ServerConfig) -> Value {
    let groq = &config.groq;
    json!({
        "model": groq.model,
        "maxTokens": groq.max_tokens,
        "temperature": groq.temperature,
        "timeoutMs": groq.timeout_ms,
        "enableStreaming": groq.enable_streaming,
        "rateLimit": {
            "requests": groq.rate_limit.requests,
            "windowMs": groq.rate_limit.window_ms,
        },
        "retry": {
            "maxAttempts": groq.retry.max_attempts,
            "baseDelayMs": groq.retry.base_delay_ms,
            "maxDelayMs": groq.retry.max_delay_ms,
            "backoffMultiplier": groq.retry.backoff_multiplier,
            "jitterFactor": groq.retry.jitter_factor,
        },
        "diagnostics": config.diagnostics,
        "environment": config.environment.as_str(),
    })
}
