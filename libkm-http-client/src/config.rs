// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration types for `libkm-http-client`.

use std::time::Duration;

/// Configuration for an [`crate::HttpClient`] instance.
///
/// Constructed via [`crate::HttpClient::new`] or [`HttpClientBuilder::build`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    connect_timeout: Option<Duration>,
    timeout: Duration,
    user_agent: Option<String>,
    treat_http_errors_as_errors: bool,
}

impl HttpClientConfig {
    /// Create a config with the given request timeout. HTTP errors are
    /// treated as errors by default.
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            connect_timeout: None,
            timeout,
            user_agent: None,
            treat_http_errors_as_errors: true,
        }
    }

    /// Upper bound for establishing the connection, if set.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// The default request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The `User-Agent` header value sent with every request, if set.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Whether HTTP 4xx/5xx responses are returned as errors.
    pub fn treat_http_errors_as_errors(&self) -> bool {
        self.treat_http_errors_as_errors
    }
}

/// Builder for [`crate::HttpClient`].
///
/// Obtain via [`crate::HttpClient::builder`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    treat_http_errors_as_errors: bool,
}

impl HttpClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            treat_http_errors_as_errors: true,
            ..Default::default()
        }
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Configure whether HTTP 4xx/5xx responses are returned as errors.
    ///
    /// Default: `true`. Set to `false` to return all responses as successful,
    /// regardless of status code.
    pub fn treat_http_errors_as_errors(mut self, value: bool) -> Self {
        self.treat_http_errors_as_errors = value;
        self
    }

    /// Build the [`crate::HttpClient`].
    ///
    /// Returns [`crate::HttpClientError::InvalidConfig`] if the timeout was
    /// not set.
    pub fn build(self) -> Result<crate::HttpClient, crate::HttpClientError> {
        let timeout = self.timeout.ok_or_else(|| {
            crate::HttpClientError::InvalidConfig("timeout is required".to_owned())
        })?;
        let config = HttpClientConfig {
            connect_timeout: self.connect_timeout,
            timeout,
            user_agent: self.user_agent,
            treat_http_errors_as_errors: self.treat_http_errors_as_errors,
        };
        crate::HttpClient::from_config(config)
    }
}
