// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use async_trait::async_trait;
use libkm_delivery::config::DEFAULT_VERIFICATION_URL;
use libkm_delivery::{
    Client, Config, MemoryStore, PersistentStore, StoreError, Transport, TransportError,
};
use libkm_http_client::HttpResponse;
use std::sync::{Arc, Mutex};

pub const TRACKING_ENDPOINT: &str = "trk.example.com";
pub const FAR_EXPIRES: &str = "Wed, 21 Oct 2099 07:28:00 GMT";

/// Serves a fixed verification answer and 200 for every tracking request,
/// remembering the tracking URLs it was asked for.
pub struct ScriptedTransport {
    policy_status: u16,
    policy_body: String,
    tracking: Mutex<Vec<String>>,
    verifications: Mutex<usize>,
}

impl ScriptedTransport {
    pub fn tracking(do_track: bool) -> Arc<Self> {
        Arc::new(Self {
            policy_status: 200,
            policy_body: format!(
                r#"{{"tracking":{do_track},"tracking_endpoint":"{TRACKING_ENDPOINT}"}}"#
            ),
            tracking: Mutex::new(vec![]),
            verifications: Mutex::new(0),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            policy_status: 500,
            policy_body: String::new(),
            tracking: Mutex::new(vec![]),
            verifications: Mutex::new(0),
        })
    }

    pub fn tracking_urls(&self) -> Vec<String> {
        self.tracking.lock().unwrap().clone()
    }

    pub fn verification_count(&self) -> usize {
        *self.verifications.lock().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        if url.starts_with(DEFAULT_VERIFICATION_URL) {
            *self.verifications.lock().unwrap() += 1;
            return Ok(HttpResponse {
                status_code: self.policy_status,
                headers: vec![("Expires".to_owned(), FAR_EXPIRES.to_owned())],
                body: self.policy_body.clone().into(),
            });
        }
        self.tracking.lock().unwrap().push(url.to_owned());
        Ok(HttpResponse {
            status_code: 200,
            headers: vec![],
            body: Default::default(),
        })
    }
}

/// Refuses every write and reads nothing back.
pub struct FailingStore;

impl PersistentStore for FailingStore {
    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    fn save(&self, key: &str, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::io(
            key,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        ))
    }
}

pub fn config() -> Config {
    Config {
        product_key: "KEY".to_owned(),
        user_agent: "kissmetrics-rust/test".to_owned(),
        ..Config::default()
    }
}

/// A client whose startup verification has already been applied.
pub fn client(store: Arc<dyn PersistentStore>, transport: Arc<ScriptedTransport>) -> Client {
    let client = Client::builder(config())
        .store(store)
        .transport(transport)
        .build()
        .unwrap();
    client.flush();
    client
}

pub fn memory_client(transport: Arc<ScriptedTransport>) -> (Client, MemoryStore) {
    let store = MemoryStore::new();
    (client(Arc::new(store.clone()), transport), store)
}
