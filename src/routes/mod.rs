// ABOUTME: Route module organization for the course chat HTTP endpoints
// ABOUTME: Mounts the chat relay and its health check on the shared chat path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the course chat relay
//!
//! One path serves three methods: `POST` relays a message, `OPTIONS` answers
//! CORS, and `GET` reports health. Handlers stay thin and delegate to the
//! validation, provider, and rate limiting modules.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use crate::server::ServerResources;
use course_chat_core::constants::endpoints;

/// Chat relay route handlers
pub mod chat;
/// Health check and diagnostics route handlers
pub mod health;

/// Chat route handlers
pub use chat::ChatRoutes;
/// Health route handlers
pub use health::HealthRoutes;

/// Create the router for the chat path
pub fn routes(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route(
            endpoints::CHAT,
            post(ChatRoutes::send_message)
                .options(ChatRoutes::options)
                .get(HealthRoutes::health_check),
        )
        .with_state(resources)
}
