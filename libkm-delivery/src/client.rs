// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The public entry point. A [`Client`] owns its runtime, the archive, the
//! sender, the tracking gate, the verification gate and the dispatch pool.
//!
//! ```rust,no_run
//! use libkm_delivery::{Client, Config, RecordCondition};
//!
//! let mut config = Config::from_env();
//! config.product_key = "product-key".to_owned();
//! let client = Client::new(config)?;
//! client.identify("bob@example.com");
//! client.record("Signed Up", None, RecordCondition::Always);
//! client.shutdown();
//! # Ok::<(), libkm_delivery::ClientError>(())
//! ```

use crate::archive::{RecordArchive, RecordCondition, Settings};
use crate::config::Config;
use crate::dispatch::DispatchPool;
use crate::encoder::{Properties, QueryEncoder};
use crate::sender::{SenderController, SenderState};
use crate::store::{FileStore, PersistentStore};
use crate::tracking::{ProducerCall, TrackingGate, TrackingState};
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::verification::VerificationGate;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not start the delivery runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("could not open storage directory {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not build the transport: {0}")]
    Transport(#[from] TransportError),
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Builds a [`Client`], optionally with a custom store or transport.
pub struct ClientBuilder {
    config: Config,
    store: Option<Arc<dyn PersistentStore>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            transport: None,
        }
    }

    /// Replaces the default [`FileStore`] under `config.storage_dir`.
    pub fn store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the default [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        let Self {
            config,
            store,
            transport,
        } = self;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("km-delivery")
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)?;
        let handle = runtime.handle().clone();

        let store: Arc<dyn PersistentStore> = match store {
            Some(store) => store,
            None => Arc::new(FileStore::new(&config.storage_dir).map_err(|source| {
                ClientError::Storage {
                    path: config.storage_dir.clone(),
                    source,
                }
            })?),
        };
        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                config.connect_timeout,
                config.request_timeout,
                &config.user_agent,
            )?),
        };

        let encoder = QueryEncoder::new(
            config.product_key.clone(),
            config.client_type.clone(),
            config.user_agent.clone(),
        );
        let archive = Arc::new(RecordArchive::open(store, encoder));

        if archive.install_uuid().is_none() {
            archive.archive_install_uuid(&generate_id());
        }
        if archive.identity().is_empty() {
            archive.archive_first_identity(&generate_id());
        }
        if let Some(base_url) = &config.base_url {
            archive.archive_base_url(base_url);
        }

        let sender = Arc::new(SenderController::new(
            archive.clone(),
            transport.clone(),
            handle.clone(),
            !archive.do_send(),
        ));
        let tracking = Arc::new(TrackingGate::new(
            TrackingState::from_do_track(archive.do_track()),
            archive.clone(),
            sender.clone(),
        ));
        let verification = Arc::new(VerificationGate::new(
            config.product_key.clone(),
            config.verification_url.clone(),
            config.verification_ceiling,
            transport,
            archive.clone(),
            sender.clone(),
            tracking.clone(),
            handle.clone(),
        ));
        let dispatch = DispatchPool::new(&handle, config.dispatch_workers);

        info!(
            client.sender = ?sender.state(),
            client.tracking = ?tracking.state(),
            client.queued = archive.queue_count(),
            "Delivery client started"
        );

        verification.trigger_if_due();

        Ok(Client {
            runtime,
            archive,
            sender,
            tracking,
            verification,
            dispatch,
        })
    }
}

/// Producer calls return immediately. The archive mutation and the send it
/// triggers run on the client's own threads.
///
/// [`Client::flush`] and [`Client::shutdown`] block and must not be called
/// from inside an async context.
pub struct Client {
    runtime: Runtime,
    archive: Arc<RecordArchive>,
    sender: Arc<SenderController>,
    tracking: Arc<TrackingGate>,
    verification: Arc<VerificationGate>,
    dispatch: DispatchPool,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("sender", &self.sender.state())
            .field("tracking", &self.tracking.state())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    fn submit(&self, call: ProducerCall) {
        if let Some(call) = self.tracking.admit(call) {
            let tracking = self.tracking.clone();
            self.dispatch.submit(move || tracking.execute(call));
        }
    }

    pub fn identify(&self, identity: &str) {
        self.submit(ProducerCall::Identify {
            identity: identity.to_owned(),
        });
    }

    /// Queues an alias record carrying `alias` as `_p` and `identity` as `_n`.
    pub fn alias(&self, alias: &str, identity: &str) {
        self.submit(ProducerCall::Alias {
            alias: alias.to_owned(),
            identity: identity.to_owned(),
        });
    }

    /// Switches to a fresh generated identity.
    pub fn clear_identity(&self) {
        self.submit(ProducerCall::ClearIdentity {
            new_identity: generate_id(),
        });
    }

    pub fn record(&self, name: &str, properties: Option<Properties>, condition: RecordCondition) {
        self.verification.trigger_if_due();
        self.submit(ProducerCall::Record {
            name: name.to_owned(),
            properties,
            condition,
        });
    }

    /// Same as `record` with [`RecordCondition::OncePerIdentity`].
    pub fn record_once(&self, name: &str) {
        self.submit(ProducerCall::RecordOnce {
            name: name.to_owned(),
        });
    }

    pub fn set(&self, properties: Properties) {
        self.submit(ProducerCall::Set { properties });
    }

    pub fn set_distinct(&self, name: &str, value: &str) {
        self.submit(ProducerCall::SetDistinct {
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    /// Records `Installed App` on first run and `Updated App` when
    /// `app_version` differs from the archived one.
    pub fn auto_record_installs(&self, app_version: &str) {
        if !app_version.is_empty() {
            self.set_distinct("App Version", app_version);
        }
        let last = self.archive.app_version();
        if last.as_deref() == Some(app_version) {
            return;
        }
        self.archive.archive_app_version(app_version);
        let event = if last.is_none() {
            "Installed App"
        } else {
            "Updated App"
        };
        debug!(app.version = app_version, event, "Recording install event");
        self.record(event, None, RecordCondition::Always);
    }

    pub fn identity(&self) -> String {
        self.archive.identity()
    }

    pub fn install_uuid(&self) -> Option<String> {
        self.archive.install_uuid()
    }

    pub fn settings(&self) -> Settings {
        self.archive.settings()
    }

    pub fn queue_count(&self) -> usize {
        self.archive.queue_count()
    }

    pub fn sender_state(&self) -> SenderState {
        self.sender.state()
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracking.state()
    }

    /// Blocks until every submitted call, running verification and drain
    /// has finished.
    pub fn flush(&self) {
        self.runtime.block_on(async {
            self.dispatch.flush().await;
            self.verification.wait_until_settled().await;
            self.sender.wait_until_settled().await;
        });
    }

    /// Runs queued producer calls to completion, waits for the sender, then
    /// stops the runtime.
    pub fn shutdown(self) {
        let Self {
            runtime,
            sender,
            verification,
            dispatch,
            ..
        } = self;
        runtime.block_on(async {
            dispatch.shutdown().await;
            verification.wait_until_settled().await;
            sender.wait_until_settled().await;
        });
        runtime.shutdown_timeout(SHUTDOWN_GRACE);
        debug!("Delivery client stopped");
    }
}
