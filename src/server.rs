// ABOUTME: HTTP server assembly for the chat relay with shared resources and graceful shutdown
// ABOUTME: Builds the axum router, layers tracing and CORS, and runs the rate limit sweeper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat Server
//!
//! [`ServerResources`] holds everything a request needs: the validated
//! configuration, the LLM provider, and the rate limiter. Both collaborators
//! sit behind traits so tests can swap in fakes and a deployment can swap the
//! in-memory limiter for a shared one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::{ConfigError, ServerConfig};
use crate::llm::{GroqProvider, LlmProvider};
use crate::middleware::{setup_cors, with_request_tracing};
use crate::rate_limiting::{FixedWindowRateLimiter, RateLimiter};
use crate::routes;
use course_chat_core::constants::{endpoints, limits};

/// Shared state handed to every handler
pub struct ServerResources {
    /// Validated process configuration
    pub config: Arc<ServerConfig>,
    /// Upstream chat completion provider
    pub provider: Arc<dyn LlmProvider>,
    /// Per-client admission control
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl ServerResources {
    /// Build the production resources: Groq provider and in-memory limiter
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        let provider = GroqProvider::new(&config.groq)?;
        let rate_limiter = FixedWindowRateLimiter::new(config.groq.rate_limit);
        Ok(Self::with_components(
            config,
            Arc::new(provider),
            Arc::new(rate_limiter),
        ))
    }

    /// Assemble resources from explicit collaborators
    #[must_use]
    pub fn with_components(
        config: ServerConfig,
        provider: Arc<dyn LlmProvider>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            rate_limiter,
        }
    }
}

/// Full application router with middleware applied
///
/// Layer order, outermost first: HTTP trace span, CORS, request context,
/// body size limit.
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config.cors_origins);

    routes::routes(resources)
        .layer(DefaultBodyLimit::max(limits::MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(with_request_tracing))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop rate limit records whose window has elapsed
pub fn spawn_rate_limit_sweeper(
    rate_limiter: Arc<dyn RateLimiter>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = rate_limiter.sweep_expired();
            if removed > 0 {
                debug!(
                    removed,
                    active = rate_limiter.active_entries(),
                    "Swept expired rate limit records"
                );
            }
        }
    })
}

/// Chat relay HTTP server
pub struct ChatServer {
    resources: Arc<ServerResources>,
}

impl ChatServer {
    /// Create a server over prepared resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Router for this server, useful for in-process tests
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.resources))
    }

    /// Bind the port and serve until Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or the server fails
    pub async fn run(self, port: u16) -> Result<()> {
        let sweeper = spawn_rate_limit_sweeper(
            Arc::clone(&self.resources.rate_limiter),
            self.resources.config.sweep_interval,
        );

        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind HTTP port {port}"))?;
        info!(
            "Chat relay listening on http://0.0.0.0:{port}{}",
            endpoints::CHAT
        );

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server terminated with an error");

        sweeper.abort();
        info!("Chat relay stopped");
        served
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
