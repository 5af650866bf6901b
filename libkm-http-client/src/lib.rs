// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! `libkm-http-client` is the HTTP layer beneath the libkm delivery
//! pipeline. It offers a simple `send()` API over a concrete `HttpClient`
//! struct. The backend is selected at compile time via cargo features.
//!
//! The client never retries. Callers that want a second attempt decide so
//! themselves from the returned status or error.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), libkm_http_client::HttpClientError> {
//! use libkm_http_client::{HttpClient, HttpMethod, HttpRequest};
//! use std::time::Duration;
//!
//! let client = HttpClient::new(Duration::from_secs(20))?;
//! let request = HttpRequest::new(HttpMethod::Get, "http://localhost:8080/e?_n=x".to_string());
//! let response = client.send(request).await?;
//! println!("Status: {}", response.status_code);
//! # Ok(())
//! # }
//! ```

pub mod config;

pub(crate) mod backend;
mod client;
mod error;
mod request;
mod response;

pub use client::HttpClient;
pub use config::{HttpClientBuilder, HttpClientConfig};
pub use error::HttpClientError;
pub use request::{HttpMethod, HttpRequest};
pub use response::HttpResponse;
