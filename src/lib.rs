// ABOUTME: Main library entry point for the course chat relay
// ABOUTME: Validated, rate-limited streaming proxy from a course website to the Groq chat API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Course Chat
//!
//! The backend behind a course website's chat widget. A single path, `/chat`,
//! accepts a visitor's message, checks it, forwards it with a course advisor
//! system prompt to the Groq chat completion API, and streams the answer back
//! as server-sent events.
//!
//! ## Architecture
//!
//! A request runs through a short pipeline:
//! - **Rate limiting**: fixed-window admission per client key
//! - **Validation**: structural checks and script/markup stripping
//! - **LLM**: prompt assembly and the Groq adapter, with retry on stream setup
//! - **Routes**: the event-stream relay and the health probe
//! - **Errors**: every failure is classified into a closed taxonomy with a
//!   fixed HTTP status and a user-safe message
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use course_chat::config::ServerConfig;
//! use course_chat::server::{ChatServer, ServerResources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let port = config.http_port;
//!     let resources = Arc::new(ServerResources::new(config)?);
//!     ChatServer::new(resources).run(port).await
//! }
//! ```

/// Environment-sourced configuration with two-phase validation
pub mod config;

/// Error classification and logging entry points
pub mod errors;

/// LLM provider abstraction, Groq adapter, SSE parsing, and prompts
pub mod llm;

/// Structured logging setup
pub mod logging;

/// HTTP middleware: CORS, request context, rate limit headers
pub mod middleware;

/// Chat request data model
pub mod models;

/// Fixed-window per-client rate limiting
pub mod rate_limiting;

/// Exponential backoff for upstream calls
pub mod retry;

/// HTTP route handlers
pub mod routes;

/// Router assembly, shared resources, and server lifecycle
pub mod server;

/// Chat request validation and sanitization
pub mod validation;
