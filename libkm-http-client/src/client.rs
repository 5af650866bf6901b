// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The public `HttpClient` struct.

use crate::config::{HttpClientBuilder, HttpClientConfig};
use crate::{HttpClientError, HttpRequest, HttpResponse};
use std::time::Duration;
use tracing::trace;

#[cfg(feature = "reqwest-backend")]
use crate::backend::Backend;

#[cfg(feature = "reqwest-backend")]
use crate::backend::reqwest_backend::ReqwestBackend;

/// A high-level async HTTP client.
///
/// Constructed once and reused across many [`HttpClient::send`] calls. Holds
/// a connection pool internally.
#[derive(Debug)]
pub struct HttpClient {
    #[cfg(feature = "reqwest-backend")]
    backend: ReqwestBackend,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Construct a client with the given default timeout.
    ///
    /// Use [`HttpClient::builder`] for connect timeout, user agent and
    /// status handling.
    pub fn new(timeout: Duration) -> Result<Self, HttpClientError> {
        Self::from_config(HttpClientConfig::new(timeout))
    }

    /// Returns a builder for constructing an `HttpClient` with advanced options.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    pub(crate) fn from_config(config: HttpClientConfig) -> Result<Self, HttpClientError> {
        #[cfg(feature = "reqwest-backend")]
        {
            let backend = ReqwestBackend::new(&config)?;
            Ok(Self { backend, config })
        }
        #[cfg(not(feature = "reqwest-backend"))]
        {
            let _ = config;
            Err(HttpClientError::InvalidConfig(
                "no backend feature enabled; enable the `reqwest-backend` feature".to_owned(),
            ))
        }
    }

    /// The client's configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Send an HTTP request and return the response.
    ///
    /// A URL that does not parse yields [`HttpClientError::InvalidUrl`]
    /// without touching the network.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        trace!(http.method = ?request.method, "Sending request");
        #[cfg(feature = "reqwest-backend")]
        {
            self.backend.send(request, &self.config).await
        }
        #[cfg(not(feature = "reqwest-backend"))]
        {
            let _ = request;
            Err(HttpClientError::InvalidConfig(
                "no backend feature enabled".to_owned(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_client() {
        let client = HttpClient::new(Duration::from_secs(3));
        assert!(client.is_ok());
        let client = client.unwrap();
        assert_eq!(client.config().timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn send_rejects_unparseable_url() {
        let client = HttpClient::new(Duration::from_secs(1)).unwrap();
        let result = client.send(HttpRequest::get("not a url")).await;
        assert!(matches!(result, Err(HttpClientError::InvalidUrl { .. })));
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn send_returns_error_when_no_server() {
        let client = HttpClient::new(Duration::from_secs(1)).unwrap();
        // Port 9 (discard) is essentially never listening on loopback.
        let result = client.send(HttpRequest::get("http://127.0.0.1:9/ping")).await;
        assert!(result.is_err());
        assert!(!matches!(result, Err(HttpClientError::InvalidUrl { .. })));
    }
}
