// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Service identity, request limits, and header names for the chat relay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain rather than kept in one flat list.

/// Service identity reported by the health endpoint and logs
pub mod service {
    /// Service name
    pub const SERVICE_NAME: &str = "course-chat";
    /// Service version, taken from the core crate manifest
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Route paths
pub mod endpoints {
    /// Chat pipeline and health check path
    pub const CHAT: &str = "/chat";
}

/// Request validation limits
pub mod limits {
    /// Maximum message length in characters, measured before sanitization
    pub const MAX_MESSAGE_CHARS: usize = 2000;
    /// Most recent history entries forwarded upstream
    pub const MAX_HISTORY_MESSAGES: usize = 20;
    /// Default requests allowed per client per window
    pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 10;
    /// Default rate limit window in milliseconds
    pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
    /// Client key used when no forwarding header is present
    pub const UNKNOWN_CLIENT: &str = "unknown";
    /// Largest accepted chat request body
    pub const MAX_BODY_BYTES: usize = 64 * 1024;
}

/// HTTP header names
pub mod headers {
    /// Request correlation id header
    pub const X_REQUEST_ID: &str = "x-request-id";
    /// Forwarded client address chain
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
    /// Client address set by a single reverse proxy
    pub const X_REAL_IP: &str = "x-real-ip";
}
