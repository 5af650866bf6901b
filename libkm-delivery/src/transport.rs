// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use libkm_http_client::{HttpClient, HttpClientError, HttpRequest, HttpResponse};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built. It was never sent.
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] HttpClientError),
}

/// Issues one GET per call.
///
/// Implementations return every HTTP status as `Ok`; only faults that kept a
/// response from arriving are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// How a delivery attempt ended, from the sender's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 200 or 304.
    Success,
    /// Any other status or a connectivity fault. The record stays queued.
    Failure,
    /// The request could not be constructed. The record is discarded.
    Malformed,
}

impl DeliveryOutcome {
    pub fn classify(result: &Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) if matches!(response.status_code, 200 | 304) => Self::Success,
            Ok(_) => Self::Failure,
            Err(TransportError::Malformed(_)) => Self::Malformed,
            Err(TransportError::Http(_)) => Self::Failure,
        }
    }
}

/// [`Transport`] over `libkm_http_client`.
#[derive(Debug)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(
        connect_timeout: Duration,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        let client = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(user_agent)
            .treat_http_errors_as_errors(false)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let result = self.client.send(HttpRequest::get(url)).await;
        match result {
            Ok(response) => {
                debug!(http.status = response.status_code, "Transport response");
                Ok(response)
            }
            Err(HttpClientError::InvalidUrl { reason, .. }) => Err(TransportError::Malformed(reason)),
            Err(e) => Err(e.into()),
        }
    }
}
