// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP request type for `libkm-http-client`.

use std::time::Duration;

/// HTTP methods the delivery pipeline issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
}

/// An outgoing HTTP request.
///
/// Requests carry everything in the URL query string, so there is no body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,

    /// Absolute URL string (e.g. `"https://trk.kissmetrics.com/e?_k=key"`).
    pub url: String,

    /// Request headers as a list of (name, value) pairs.
    pub headers: Vec<(String, String)>,

    /// Per-request timeout. Overrides the client-level timeout if set.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a new request with the given method and URL, no headers and no
    /// per-request timeout override.
    pub fn new(method: HttpMethod, url: String) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_defaults() {
        let req = HttpRequest::new(HttpMethod::Get, "http://localhost/info".to_owned());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost/info");
        assert!(req.headers.is_empty());
        assert!(req.timeout.is_none());
    }

    #[test]
    fn get_shorthand() {
        let mut req = HttpRequest::get("http://localhost/e?_n=bob");
        req.timeout = Some(Duration::from_secs(10));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost/e?_n=bob");
        assert_eq!(req.timeout, Some(Duration::from_secs(10)));
    }
}
