// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! reqwest-based HTTP backend (compiled when the `reqwest-backend` feature is active).

use crate::config::HttpClientConfig;
use crate::request::HttpMethod;
use crate::{HttpClientError, HttpRequest, HttpResponse};

/// A backend that sends HTTP requests via [`reqwest::Client`].
///
/// Holds a connection-pooling client that is reused across all requests.
#[derive(Debug)]
pub(crate) struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Construct a new backend from the client configuration.
    pub(crate) fn new(config: &HttpClientConfig) -> Result<Self, HttpClientError> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout());

        if let Some(connect_timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(user_agent) = config.user_agent() {
            builder = builder.user_agent(user_agent.to_owned());
        }

        let client = builder
            .build()
            .map_err(|e| HttpClientError::InvalidConfig(e.to_string()))?;
        Ok(Self { client })
    }
}

impl super::Backend for ReqwestBackend {
    async fn send(
        &self,
        request: HttpRequest,
        config: &HttpClientConfig,
    ) -> Result<HttpResponse, HttpClientError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
        };

        let url = reqwest::Url::parse(&request.url).map_err(|e| HttpClientError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = self.client.request(method, url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();

        // Collect headers before consuming the response body.
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let v = value.to_str().map_err(|_| {
                    HttpClientError::IoError(format!(
                        "response header '{}' contains non-UTF-8 value",
                        name
                    ))
                })?;
                Ok((name.as_str().to_string(), v.to_string()))
            })
            .collect::<Result<Vec<_>, HttpClientError>>()?;

        let body_bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if config.treat_http_errors_as_errors() && status >= 400 {
            return Err(HttpClientError::RequestFailed {
                status,
                body: String::from_utf8_lossy(&body_bytes).into_owned(),
            });
        }

        Ok(HttpResponse {
            status_code: status,
            headers,
            body: body_bytes,
        })
    }
}

/// Map a `reqwest::Error` to our `HttpClientError` variants.
fn map_reqwest_error(e: reqwest::Error) -> HttpClientError {
    if e.is_timeout() {
        HttpClientError::TimedOut
    } else if e.is_connect() {
        HttpClientError::ConnectionFailed(e.to_string())
    } else if e.is_builder() {
        HttpClientError::InvalidUrl {
            url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            reason: e.to_string(),
        }
    } else {
        HttpClientError::IoError(e.to_string())
    }
}
