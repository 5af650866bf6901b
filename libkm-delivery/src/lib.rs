// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Delivery core of the KISSmetrics mobile SDK.
//!
//! Producer calls (`identify`, `record`, `set`, ...) are turned into
//! percent-encoded query strings, appended to a durable queue and sent to the
//! tracking endpoint one GET at a time, oldest first. A periodic remote
//! policy check decides whether anything is archived or sent at all.
//!
//! Start with [`Client`].

pub mod archive;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod encoder;
pub mod sender;
pub mod store;
pub mod tracking;
pub mod transport;
pub mod verification;

pub use archive::{RecordArchive, RecordCondition, Settings};
pub use client::{Client, ClientBuilder, ClientError};
pub use config::{Config, ConfigBuilder};
pub use encoder::{Properties, QueryEncoder};
pub use sender::SenderState;
pub use store::{FileStore, MemoryStore, PersistentStore, StoreError};
pub use tracking::TrackingState;
pub use transport::{HttpTransport, Transport, TransportError};
pub use verification::VerificationResult;
