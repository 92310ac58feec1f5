// ABOUTME: Environment configuration for deployment-specific server settings
// ABOUTME: Parses port, deployment mode, diagnostics flag, CORS origins, and sweep interval
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::groq::{parse_flag, GroqConfig, RawGroqConfig};
use super::{ConfigError, FieldError};

/// Environment variable names
pub mod env_vars {
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// Deployment mode
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    /// Expose internal error detail in responses; off unless set to true
    pub const CHAT_DIAGNOSTICS: &str = "CHAT_DIAGNOSTICS";
    /// Comma separated allowed origins, `*` for any
    pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
    /// Seconds between stale rate limit record sweeps
    pub const RATE_LIMIT_SWEEP_INTERVAL_SECS: &str = "RATE_LIMIT_SWEEP_INTERVAL_SECS";
}

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Deployment mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Live deployment; diagnostics always off
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed CORS origins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// Any origin (`*`)
    Any,
    /// Explicit allow-list
    List(Vec<String>),
}

impl CorsOrigins {
    /// Parse a comma separated list; empty or `*` means any origin
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment mode
    pub environment: Environment,
    /// Include technical error detail in response bodies
    pub diagnostics: bool,
    /// Allowed CORS origins
    pub cors_origins: CorsOrigins,
    /// Interval of the stale rate limit record sweep
    pub sweep_interval: Duration,
    /// Provider configuration
    pub groq: GroqConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every invalid server and provider field.
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment variables");
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every invalid server and provider field.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut errors = Vec::new();

        let http_port = match get(env_vars::HTTP_PORT) {
            None => DEFAULT_HTTP_PORT,
            Some(text) => text.trim().parse().unwrap_or_else(|_| {
                errors.push(FieldError::new(
                    env_vars::HTTP_PORT,
                    Some(text.as_str()),
                    "must be a port number",
                ));
                DEFAULT_HTTP_PORT
            }),
        };

        let environment = get(env_vars::ENVIRONMENT)
            .map(|v| Environment::from_str_or_default(&v))
            .unwrap_or_default();

        let requested_diagnostics = match get(env_vars::CHAT_DIAGNOSTICS) {
            None => false,
            Some(text) => parse_flag(&text.trim().to_ascii_lowercase()).unwrap_or_else(|| {
                errors.push(FieldError::new(
                    env_vars::CHAT_DIAGNOSTICS,
                    Some(text.as_str()),
                    "must be true or false",
                ));
                false
            }),
        };
        let diagnostics = requested_diagnostics && !environment.is_production();

        let cors_origins = get(env_vars::CORS_ALLOWED_ORIGINS)
            .map_or(CorsOrigins::Any, |v| CorsOrigins::parse(&v));

        let sweep_secs = match get(env_vars::RATE_LIMIT_SWEEP_INTERVAL_SECS) {
            None => DEFAULT_SWEEP_INTERVAL_SECS,
            Some(text) => match text.trim().parse::<u64>() {
                Ok(secs) if secs >= 1 => secs,
                _ => {
                    errors.push(FieldError::new(
                        env_vars::RATE_LIMIT_SWEEP_INTERVAL_SECS,
                        Some(text.as_str()),
                        "must be a whole number of seconds, at least 1",
                    ));
                    DEFAULT_SWEEP_INTERVAL_SECS
                }
            },
        };

        let groq = match GroqConfig::load(&RawGroqConfig::from_lookup(&lookup)) {
            Ok(groq) => Some(groq),
            Err(ConfigError::Invalid { errors: groq_errors }) => {
                errors.extend(groq_errors);
                None
            }
            Err(other) => return Err(other),
        };

        match groq {
            Some(groq) if errors.is_empty() => Ok(Self {
                http_port,
                environment,
                diagnostics,
                cors_origins,
                sweep_interval: Duration::from_secs(sweep_secs),
                groq,
            }),
            _ => Err(ConfigError::Invalid { errors }),
        }
    }

    /// Configuration summary for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Course Chat Server Configuration:\n\
             - HTTP Port: {}\n\
             - Environment: {}\n\
             - Diagnostics: {}\n\
             - Model: {}\n\
             - Base URL: {}\n\
             - Streaming: {}\n\
             - Rate Limit: {} requests / {}ms\n\
             - Retry: {} attempts",
            self.http_port,
            self.environment,
            if self.diagnostics { "Enabled" } else { "Disabled" },
            self.groq.model,
            self.groq.base_url,
            if self.groq.enable_streaming {
                "Enabled"
            } else {
                "Disabled"
            },
            self.groq.rate_limit.requests,
            self.groq.rate_limit.window_ms,
            self.groq.retry.max_attempts,
        )
    }
}
