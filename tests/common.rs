// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging and configuration built from explicit key/value pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `course_chat`

use std::collections::HashMap;
use std::sync::Once;

use course_chat::config::ServerConfig;

static INIT_LOGGER: Once = Once::new();

/// A syntactically valid key that is never sent anywhere real
pub const TEST_API_KEY: &str = "gsk_test_0123456789abcdef";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Key/value lookup standing in for the process environment
pub fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |name| map.get(name).cloned()
}

/// Valid test configuration with fast retries; `overrides` win over defaults
pub fn test_server_config(overrides: &[(&str, &str)]) -> ServerConfig {
    let mut pairs: Vec<(&str, &str)> = vec![
        ("GROQ_API_KEY", TEST_API_KEY),
        ("ENVIRONMENT", "testing"),
        ("CHAT_DIAGNOSTICS", "false"),
        ("GROQ_RETRY_BASE_DELAY_MS", "1"),
        ("GROQ_RETRY_MAX_DELAY_MS", "5"),
        ("GROQ_RETRY_JITTER", "0"),
    ];
    pairs.extend_from_slice(overrides);

    let map: HashMap<&str, &str> = pairs.into_iter().collect();
    let flattened: Vec<(&str, &str)> = map.into_iter().collect();
    ServerConfig::from_lookup(lookup_from(&flattened)).expect("test configuration is valid")
}
