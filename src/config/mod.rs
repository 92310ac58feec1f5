// ABOUTME: Configuration management module for the chat relay server
// ABOUTME: Holds the shared field error type used by provider and server configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! - **Environment**: server settings (port, deployment mode, diagnostics, CORS)
//! - **Groq**: provider credentials, generation limits, rate limit and retry policy
//!
//! Both are validated once at startup. Validation never stops at the first
//! problem; [`ConfigError::Invalid`] carries every violated field.

use std::fmt;

use thiserror::Error;

/// Environment and server configuration
pub mod environment;
/// Provider configuration
pub mod groq;

pub use environment::{CorsOrigins, Environment, ServerConfig};
pub use groq::{GroqConfig, RateLimitSettings, RawGroqConfig};

/// A single configuration field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Environment variable name
    pub field: &'static str,
    /// Offending value, if one was given
    pub value: Option<String>,
    /// What the value must satisfy
    pub reason: String,
}

impl FieldError {
    /// Create a field error
    #[must_use]
    pub fn new(field: &'static str, value: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.map(str::to_owned),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} ({value:?}) {}", self.field, self.reason),
            None => write!(f, "{} {}", self.field, self.reason),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more fields failed validation
    #[error("invalid configuration: {}", join_errors(.errors))]
    Invalid {
        /// Every violated field, in evaluation order
        errors: Vec<FieldError>,
    },

    /// The outbound HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
