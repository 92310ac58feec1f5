// ABOUTME: Two-phase Groq configuration: raw environment values and the validated snapshot
// ABOUTME: Validation reports every violated field at once instead of failing on the first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Groq Configuration
//!
//! [`RawGroqConfig`] is the unvalidated shape: every field is the string as it
//! appeared in the environment, or absent. [`GroqConfig::load`] turns it into
//! the immutable runtime snapshot or returns [`ConfigError::Invalid`] listing
//! every field that failed, so an operator fixes them all in one pass.

use std::env;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use super::{ConfigError, FieldError};
use crate::retry::RetryPolicy;
use course_chat_core::constants::limits;

/// Environment variable names
pub mod env_vars {
    /// Provider API key
    pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
    /// Provider base URL
    pub const GROQ_BASE_URL: &str = "GROQ_BASE_URL";
    /// Model identifier
    pub const GROQ_MODEL: &str = "GROQ_MODEL";
    /// Completion token cap
    pub const GROQ_MAX_TOKENS: &str = "GROQ_MAX_TOKENS";
    /// Sampling temperature
    pub const GROQ_TEMPERATURE: &str = "GROQ_TEMPERATURE";
    /// Upstream request timeout in milliseconds
    pub const GROQ_TIMEOUT_MS: &str = "GROQ_TIMEOUT_MS";
    /// Whether to request streamed completions
    pub const GROQ_ENABLE_STREAMING: &str = "GROQ_ENABLE_STREAMING";
    /// Requests allowed per client per window
    pub const CHAT_RATE_LIMIT_REQUESTS: &str = "CHAT_RATE_LIMIT_REQUESTS";
    /// Rate limit window length in milliseconds
    pub const CHAT_RATE_LIMIT_WINDOW_MS: &str = "CHAT_RATE_LIMIT_WINDOW_MS";
    /// Maximum upstream attempts per request
    pub const GROQ_RETRY_MAX_ATTEMPTS: &str = "GROQ_RETRY_MAX_ATTEMPTS";
    /// First backoff delay in milliseconds
    pub const GROQ_RETRY_BASE_DELAY_MS: &str = "GROQ_RETRY_BASE_DELAY_MS";
    /// Backoff delay cap in milliseconds
    pub const GROQ_RETRY_MAX_DELAY_MS: &str = "GROQ_RETRY_MAX_DELAY_MS";
    /// Backoff growth factor
    pub const GROQ_RETRY_BACKOFF_MULTIPLIER: &str = "GROQ_RETRY_BACKOFF_MULTIPLIER";
    /// Backoff jitter fraction (0-1)
    pub const GROQ_RETRY_JITTER: &str = "GROQ_RETRY_JITTER";
}

/// Required API key prefix
pub const API_KEY_PREFIX: &str = "gsk_";

/// OpenAI-compatible Groq endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Models the service accepts
pub const SUPPORTED_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "llama-3.1-70b-versatile",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

/// Inclusive bound for `max_tokens`
pub const MAX_TOKENS_RANGE: (u32, u32) = (1, 32_768);
/// Inclusive bound for `temperature`
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
/// Inclusive bound for `timeout_ms`
pub const TIMEOUT_MS_RANGE: (u64, u64) = (1_000, 300_000);

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Unvalidated configuration as read from the environment
#[derive(Clone, Default)]
pub struct RawGroqConfig {
    /// `GROQ_API_KEY`
    pub api_key: Option<String>,
    /// `GROQ_BASE_URL`
    pub base_url: Option<String>,
    /// `GROQ_MODEL`
    pub model: Option<String>,
    /// `GROQ_MAX_TOKENS`
    pub max_tokens: Option<String>,
    /// `GROQ_TEMPERATURE`
    pub temperature: Option<String>,
    /// `GROQ_TIMEOUT_MS`
    pub timeout_ms: Option<String>,
    /// `GROQ_ENABLE_STREAMING`
    pub enable_streaming: Option<String>,
    /// `CHAT_RATE_LIMIT_REQUESTS`
    pub rate_limit_requests: Option<String>,
    /// `CHAT_RATE_LIMIT_WINDOW_MS`
    pub rate_limit_window_ms: Option<String>,
    /// `GROQ_RETRY_MAX_ATTEMPTS`
    pub retry_max_attempts: Option<String>,
    /// `GROQ_RETRY_BASE_DELAY_MS`
    pub retry_base_delay_ms: Option<String>,
    /// `GROQ_RETRY_MAX_DELAY_MS`
    pub retry_max_delay_ms: Option<String>,
    /// `GROQ_RETRY_BACKOFF_MULTIPLIER`
    pub retry_backoff_multiplier: Option<String>,
    /// `GROQ_RETRY_JITTER`
    pub retry_jitter: Option<String>,
}

impl fmt::Debug for RawGroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawGroqConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("enable_streaming", &self.enable_streaming)
            .finish_non_exhaustive()
    }
}

impl RawGroqConfig {
    /// Read every field from process environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read every field through `lookup`, treating blank values as absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_key: get(env_vars::GROQ_API_KEY),
            base_url: get(env_vars::GROQ_BASE_URL),
            model: get(env_vars::GROQ_MODEL),
            max_tokens: get(env_vars::GROQ_MAX_TOKENS),
            temperature: get(env_vars::GROQ_TEMPERATURE),
            timeout_ms: get(env_vars::GROQ_TIMEOUT_MS),
            enable_streaming: get(env_vars::GROQ_ENABLE_STREAMING),
            rate_limit_requests: get(env_vars::CHAT_RATE_LIMIT_REQUESTS),
            rate_limit_window_ms: get(env_vars::CHAT_RATE_LIMIT_WINDOW_MS),
            retry_max_attempts: get(env_vars::GROQ_RETRY_MAX_ATTEMPTS),
            retry_base_delay_ms: get(env_vars::GROQ_RETRY_BASE_DELAY_MS),
            retry_max_delay_ms: get(env_vars::GROQ_RETRY_MAX_DELAY_MS),
            retry_backoff_multiplier: get(env_vars::GROQ_RETRY_BACKOFF_MULTIPLIER),
            retry_jitter: get(env_vars::GROQ_RETRY_JITTER),
        }
    }
}

/// Per-client admission control thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitSettings {
    /// Window length as a duration
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Window length in whole seconds, rounded up
    #[must_use]
    pub const fn window_secs(&self) -> u64 {
        self.window_ms.div_ceil(1000)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests: limits::DEFAULT_RATE_LIMIT_REQUESTS,
            window_ms: limits::DEFAULT_RATE_LIMIT_WINDOW_MS,
        }
    }
}

/// Validated, immutable provider configuration
#[derive(Clone)]
pub struct GroqConfig {
    /// Bearer token, never logged
    pub api_key: String,
    /// OpenAI-compatible API root
    pub base_url: Url,
    /// Default model id, always on the allow-list
    pub model: String,
    /// Default completion token cap
    pub max_tokens: u32,
    /// Default sampling temperature
    pub temperature: f64,
    /// Upstream request timeout
    pub timeout_ms: u64,
    /// Request streamed completions
    pub enable_streaming: bool,
    /// Per-client admission thresholds
    pub rate_limit: RateLimitSettings,
    /// Backoff for stream setup
    pub retry: RetryPolicy,
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("enable_streaming", &self.enable_streaming)
            .field("rate_limit", &self.rate_limit)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GroqConfig {
    /// Validate raw values into a runtime configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] carrying one entry per violated field.
    pub fn load(raw: &RawGroqConfig) -> Result<Self, ConfigError> {
        let mut check = FieldCheck::default();

        let api_key = check.api_key(raw.api_key.as_deref());
        let base_url = check.base_url(raw.base_url.as_deref());
        let model = check.model(raw.model.as_deref());

        let max_tokens = check.parsed(
            env_vars::GROQ_MAX_TOKENS,
            raw.max_tokens.as_deref(),
            DEFAULT_MAX_TOKENS,
        );
        check.within(env_vars::GROQ_MAX_TOKENS, max_tokens, MAX_TOKENS_RANGE);

        let temperature = check.parsed(
            env_vars::GROQ_TEMPERATURE,
            raw.temperature.as_deref(),
            DEFAULT_TEMPERATURE,
        );
        if check.finite(env_vars::GROQ_TEMPERATURE, temperature) {
            check.within(env_vars::GROQ_TEMPERATURE, temperature, TEMPERATURE_RANGE);
        }

        let timeout_ms = check.parsed(
            env_vars::GROQ_TIMEOUT_MS,
            raw.timeout_ms.as_deref(),
            DEFAULT_TIMEOUT_MS,
        );
        check.within(env_vars::GROQ_TIMEOUT_MS, timeout_ms, TIMEOUT_MS_RANGE);

        let enable_streaming = check.flag(
            env_vars::GROQ_ENABLE_STREAMING,
            raw.enable_streaming.as_deref(),
            true,
        );

        let rate_limit = check.rate_limit(raw);
        let retry = check.retry(raw);

        match base_url {
            Some(base_url) if check.errors.is_empty() => Ok(Self {
                api_key,
                base_url,
                model,
                max_tokens,
                temperature,
                timeout_ms,
                enable_streaming,
                rate_limit,
                retry,
            }),
            _ => Err(ConfigError::Invalid {
                errors: check.errors,
            }),
        }
    }

    /// Load and validate from process environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any variable is missing or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&RawGroqConfig::from_env())
    }

    /// Upstream timeout as a duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether `model` is on the allow-list
    #[must_use]
    pub fn is_supported_model(model: &str) -> bool {
        SUPPORTED_MODELS.contains(&model)
    }
}

/// Accumulates field violations while producing best-effort values
#[derive(Default)]
struct FieldCheck {
    errors: Vec<FieldError>,
}

impl FieldCheck {
    fn fail(&mut self, field: &'static str, value: Option<&str>, reason: impl Into<String>) {
        self.errors.push(FieldError::new(field, value, reason));
    }

    fn api_key(&mut self, raw: Option<&str>) -> String {
        match raw {
            None => {
                self.fail(env_vars::GROQ_API_KEY, None, "is required");
                String::new()
            }
            Some(key) if !key.starts_with(API_KEY_PREFIX) => {
                // Never echo the key itself
                self.fail(
                    env_vars::GROQ_API_KEY,
                    Some("[REDACTED]"),
                    format!("must start with '{API_KEY_PREFIX}'"),
                );
                String::new()
            }
            Some(key) => key.trim().to_owned(),
        }
    }

    fn base_url(&mut self, raw: Option<&str>) -> Option<Url> {
        let text = raw.unwrap_or(DEFAULT_BASE_URL);
        match Url::parse(text) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(_) => {
                self.fail(env_vars::GROQ_BASE_URL, raw, "must use http or https");
                None
            }
            Err(e) => {
                self.fail(env_vars::GROQ_BASE_URL, raw, format!("is not a valid URL: {e}"));
                None
            }
        }
    }

    fn model(&mut self, raw: Option<&str>) -> String {
        let model = raw.unwrap_or(DEFAULT_MODEL);
        if !GroqConfig::is_supported_model(model) {
            self.fail(
                env_vars::GROQ_MODEL,
                raw,
                format!("must be one of: {}", SUPPORTED_MODELS.join(", ")),
            );
        }
        model.to_owned()
    }

    fn parsed<T>(&mut self, field: &'static str, raw: Option<&str>, default: T) -> T
    where
        T: FromStr,
    {
        match raw {
            None => default,
            Some(text) => text.trim().parse().unwrap_or_else(|_| {
                self.fail(field, raw, "is not a valid number");
                default
            }),
        }
    }

    fn within<T>(&mut self, field: &'static str, value: T, (min, max): (T, T))
    where
        T: PartialOrd + Display + Copy,
    {
        if !(min..=max).contains(&value) {
            self.fail(
                field,
                Some(value.to_string().as_str()),
                format!("must be between {min} and {max}"),
            );
        }
    }

    fn at_least<T>(&mut self, field: &'static str, value: T, min: T)
    where
        T: PartialOrd + Display + Copy,
    {
        if !(min..).contains(&value) {
            self.fail(field, Some(value.to_string().as_str()), format!("must be at least {min}"));
        }
    }

    /// `NaN` and infinities parse as `f64` but never make sense as settings
    fn finite(&mut self, field: &'static str, value: f64) -> bool {
        if value.is_finite() {
            return true;
        }
        self.fail(field, Some(value.to_string().as_str()), "must be a finite number");
        false
    }

    fn flag(&mut self, field: &'static str, raw: Option<&str>, default: bool) -> bool {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            None => default,
            Some(v) => parse_flag(&v).unwrap_or_else(|| {
                self.fail(field, raw, "must be true or false");
                default
            }),
        }
    }

    fn rate_limit(&mut self, raw: &RawGroqConfig) -> RateLimitSettings {
        let defaults = RateLimitSettings::default();
        let requests = self.parsed(
            env_vars::CHAT_RATE_LIMIT_REQUESTS,
            raw.rate_limit_requests.as_deref(),
            defaults.requests,
        );
        self.at_least(env_vars::CHAT_RATE_LIMIT_REQUESTS, requests, 1);

        let window_ms = self.parsed(
            env_vars::CHAT_RATE_LIMIT_WINDOW_MS,
            raw.rate_limit_window_ms.as_deref(),
            defaults.window_ms,
        );
        self.at_least(env_vars::CHAT_RATE_LIMIT_WINDOW_MS, window_ms, 1_000);

        RateLimitSettings {
            requests,
            window_ms,
        }
    }

    fn retry(&mut self, raw: &RawGroqConfig) -> RetryPolicy {
        let defaults = RetryPolicy::default();

        let max_attempts = self.parsed(
            env_vars::GROQ_RETRY_MAX_ATTEMPTS,
            raw.retry_max_attempts.as_deref(),
            defaults.max_attempts,
        );
        self.within(env_vars::GROQ_RETRY_MAX_ATTEMPTS, max_attempts, (1, 10));

        let base_delay_ms = self.parsed(
            env_vars::GROQ_RETRY_BASE_DELAY_MS,
            raw.retry_base_delay_ms.as_deref(),
            defaults.base_delay_ms,
        );
        self.at_least(env_vars::GROQ_RETRY_BASE_DELAY_MS, base_delay_ms, 1);

        let max_delay_ms = self.parsed(
            env_vars::GROQ_RETRY_MAX_DELAY_MS,
            raw.retry_max_delay_ms.as_deref(),
            defaults.max_delay_ms,
        );
        self.at_least(env_vars::GROQ_RETRY_MAX_DELAY_MS, max_delay_ms, base_delay_ms);

        let backoff_multiplier = self.parsed(
            env_vars::GROQ_RETRY_BACKOFF_MULTIPLIER,
            raw.retry_backoff_multiplier.as_deref(),
            defaults.backoff_multiplier,
        );
        if self.finite(env_vars::GROQ_RETRY_BACKOFF_MULTIPLIER, backoff_multiplier) {
            self.at_least(
                env_vars::GROQ_RETRY_BACKOFF_MULTIPLIER,
                backoff_multiplier,
                1.0,
            );
        }

        let jitter_factor = self.parsed(
            env_vars::GROQ_RETRY_JITTER,
            raw.retry_jitter.as_deref(),
            defaults.jitter_factor,
        );
        if self.finite(env_vars::GROQ_RETRY_JITTER, jitter_factor) {
            self.within(env_vars::GROQ_RETRY_JITTER, jitter_factor, (0.0, 1.0));
        }

        RetryPolicy {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier,
            jitter_factor,
        }
    }
}

/// Parse common boolean spellings
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
