// ABOUTME: CORS middleware configuration for the chat endpoint
// ABOUTME: Builds the tower-http CorsLayer and the headers returned on non-preflight OPTIONS
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsOrigins;
use course_chat_core::constants::headers;

/// Methods served on the chat path
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

fn allowed_headers() -> [HeaderName; 5] {
    [
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        HeaderName::from_static("x-requested-with"),
        HeaderName::from_static(headers::X_REQUEST_ID),
    ]
}

/// Configure CORS from the allowed origin setting
///
/// `CORS_ALLOWED_ORIGINS="*"` (or unset) allows any origin; otherwise a comma
/// separated list is matched exactly. Entries that are not valid header values
/// are skipped, and an empty result falls back to any origin.
///
/// ```bash
/// export CORS_ALLOWED_ORIGINS="https://www.example.com,https://admin.example.com"
/// ```
#[must_use]
pub fn setup_cors(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect();
            if values.is_empty() {
                AllowOrigin::any()
            } else {
                AllowOrigin::list(values)
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers(allowed_headers())
        .allow_methods(ALLOWED_METHODS)
        .expose_headers([
            HeaderName::from_static(headers::X_REQUEST_ID),
            header::RETRY_AFTER,
        ])
}

/// Headers answering a plain `OPTIONS /chat`
#[must_use]
pub fn options_headers(origins: &CorsOrigins) -> HeaderMap {
    let mut map = HeaderMap::new();

    let origin = match origins {
        CorsOrigins::Any => Some(HeaderValue::from_static("*")),
        CorsOrigins::List(list) => list.first().and_then(|o| HeaderValue::from_str(o).ok()),
    };
    if let Some(origin) = origin {
        map.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }

    map.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    map.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, accept, origin, x-requested-with, x-request-id"),
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_headers_are_permissive_by_default() {
        let map = options_headers(&CorsOrigins::Any);
        assert_eq!(map[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(map[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("POST"));
    }

    #[test]
    fn test_options_headers_use_configured_origin() {
        let map = options_headers(&CorsOrigins::List(vec!["https://a.example".to_owned()]));
        assert_eq!(map[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example");
    }
}
