// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP response type for `libkm-http-client`.

/// An HTTP response received from the server.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code (e.g. 200, 304, 503).
    pub status_code: u16,

    /// Response headers as a list of (name, value) pairs.
    pub headers: Vec<(String, String)>,

    /// Response body bytes.
    pub body: bytes::Bytes,
}

impl HttpResponse {
    /// First value of the named header. Names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
