// ABOUTME: HTTP middleware for request tracing, CORS, and rate limit responses
// ABOUTME: Provides request ID generation, client identification, and span creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod cors;
pub mod rate_limiting;
pub mod tracing;

// CORS configuration
pub use cors::{options_headers, setup_cors};

// Rate limiting utilities
pub use rate_limiting::{client_key, create_rate_limit_headers, headers};

// Request tracing and context management
pub use tracing::{create_request_span, with_request_tracing, RequestContext};
