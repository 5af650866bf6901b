// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The record archive: settings, identity, the send queue and the
//! deduplication state, all behind one lock and mirrored to a
//! [`PersistentStore`].
//!
//! Storage faults never reach callers. A failed write is logged and the
//! in-memory value stays authoritative until the next restart. A failed or
//! missing read falls back to defaults, which are then written back.

mod settings;

pub use settings::{Settings, DEFAULT_BASE_URL};

use crate::encoder::{Properties, QueryEncoder};
use crate::store::{PersistentStore, StoreError};
use libkm_common::{time::unix_time_secs, MutexExt};
use serde::{de::DeserializeOwned, Serialize};
use settings::IdentityRecord;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const SETTINGS_KEY: &str = "settings";
pub const IDENTITY_KEY: &str = "identity";
pub const SEND_QUEUE_KEY: &str = "sendQueue";
pub const SAVED_INSTALL_EVENTS_KEY: &str = "savedInstallEvents";
pub const SAVED_ID_EVENTS_KEY: &str = "savedIdEvents";
pub const SAVED_PROPERTIES_KEY: &str = "savedProperties";

/// When an event is allowed into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordCondition {
    #[default]
    Always,
    /// At most once for the lifetime of the install.
    OncePerInstall,
    /// At most once until the identity changes to a different user.
    OncePerIdentity,
}

#[derive(Debug, Default)]
struct ArchiveState {
    settings: Settings,
    identity: String,
    send_queue: Vec<String>,
    saved_install_events: Vec<String>,
    saved_id_events: Vec<String>,
    saved_properties: Properties,
}

pub struct RecordArchive {
    store: Arc<dyn PersistentStore>,
    encoder: QueryEncoder,
    state: Mutex<ArchiveState>,
}

impl fmt::Debug for RecordArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordArchive")
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

fn load<T: DeserializeOwned>(store: &dyn PersistentStore, key: &str) -> Option<T> {
    let bytes = match store.load(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!(store.key = key, error = %e, "Unable to load archived snapshot");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            let e = StoreError::serialization(key, e);
            warn!(store.key = key, error = %e, "Discarding unreadable archived snapshot");
            None
        }
    }
}

fn persist<T: Serialize + ?Sized>(store: &dyn PersistentStore, key: &str, value: &T) {
    let result = serde_json::to_vec(value)
        .map_err(|e| StoreError::serialization(key, e))
        .and_then(|bytes| store.save(key, &bytes));
    if let Err(e) = result {
        warn!(store.key = key, error = %e, "Unable to persist archive snapshot");
    }
}

fn load_or_init<T>(store: &dyn PersistentStore, key: &str) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    load(store, key).unwrap_or_else(|| {
        debug!(store.key = key, "Initializing archived snapshot with defaults");
        let value = T::default();
        persist(store, key, &value);
        value
    })
}

impl RecordArchive {
    /// Loads every snapshot from `store`, writing defaults for the ones that
    /// are missing or unreadable.
    pub fn open(store: Arc<dyn PersistentStore>, encoder: QueryEncoder) -> Self {
        let s = store.as_ref();
        let state = ArchiveState {
            settings: load_or_init(s, SETTINGS_KEY),
            identity: load::<IdentityRecord>(s, IDENTITY_KEY)
                .map(|r| r.identity)
                .unwrap_or_default(),
            send_queue: load_or_init(s, SEND_QUEUE_KEY),
            saved_install_events: load_or_init(s, SAVED_INSTALL_EVENTS_KEY),
            saved_id_events: load_or_init(s, SAVED_ID_EVENTS_KEY),
            saved_properties: load_or_init(s, SAVED_PROPERTIES_KEY),
        };
        debug!(
            archive.queued = state.send_queue.len(),
            "Record archive opened"
        );
        Self {
            store,
            encoder,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ArchiveState> {
        self.state.lock_or_recover()
    }

    fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        persist(self.store.as_ref(), key, value);
    }

    fn persist_identity(&self, identity: &str) {
        self.persist(
            IDENTITY_KEY,
            &IdentityRecord {
                identity: identity.to_owned(),
            },
        );
    }

    fn push_record(&self, state: &mut ArchiveState, query: String) {
        state.send_queue.push(query);
        self.persist(SEND_QUEUE_KEY, &state.send_queue);
    }

    fn update_settings(&self, f: impl FnOnce(&mut Settings)) {
        let mut state = self.lock();
        f(&mut state.settings);
        self.persist(SETTINGS_KEY, &state.settings);
    }

    // Settings

    /// Write-once. Empty input and a second call are ignored.
    pub fn archive_install_uuid(&self, install_uuid: &str) {
        if install_uuid.is_empty() {
            warn!("Empty install uuid not saved");
            return;
        }
        let mut state = self.lock();
        if state.settings.install_uuid.is_some() {
            warn!("Install uuid already set, not overwritten");
            return;
        }
        state.settings.install_uuid = Some(install_uuid.to_owned());
        self.persist(SETTINGS_KEY, &state.settings);
    }

    pub fn archive_do_track(&self, do_track: bool) {
        self.update_settings(|s| s.do_track = do_track);
    }

    pub fn archive_do_send(&self, do_send: bool) {
        self.update_settings(|s| s.do_send = do_send);
    }

    pub fn archive_base_url(&self, base_url: &str) {
        if base_url.is_empty() {
            warn!("Empty base url not saved");
            return;
        }
        self.update_settings(|s| s.base_url = base_url.to_owned());
    }

    pub fn archive_verification_exp_date(&self, exp_date_millis: i64) {
        self.update_settings(|s| s.verification_exp_date = exp_date_millis);
    }

    /// Memory only. The flag reaches the store with the next settings write.
    pub fn archive_has_generic_identity(&self, has_generic_identity: bool) {
        self.lock().settings.has_generic_identity = has_generic_identity;
    }

    pub fn archive_app_version(&self, app_version: &str) {
        self.update_settings(|s| s.app_version = Some(app_version.to_owned()));
    }

    // Identity

    /// Installs a generated identity. Nothing is queued.
    pub fn archive_first_identity(&self, identity: &str) {
        if identity.is_empty() {
            return;
        }
        let mut state = self.lock();
        state.identity = identity.to_owned();
        state.settings.has_generic_identity = true;
        self.persist_identity(&state.identity);
    }

    /// Switches to a caller-chosen identity.
    ///
    /// Leaving a generated identity queues an alias from the old identity to
    /// the new one. Switching between two chosen identities means a different
    /// user, so the dedup sets and distinct properties are reset instead.
    pub fn archive_identity(&self, identity: &str) {
        if identity.is_empty() {
            warn!("Attempted to use an empty identity. Ignoring");
            return;
        }
        let mut state = self.lock();
        if identity == state.identity {
            debug!("Identity unchanged. Ignoring");
            return;
        }
        let previous = std::mem::replace(&mut state.identity, identity.to_owned());
        self.persist_identity(&state.identity);

        if state.settings.has_generic_identity {
            state.settings.has_generic_identity = false;
            let query = self.encoder.create_alias_query(&previous, identity);
            self.push_record(&mut state, query);
        } else {
            state.saved_install_events.clear();
            self.persist(SAVED_INSTALL_EVENTS_KEY, &state.saved_install_events);
            state.saved_id_events.clear();
            self.persist(SAVED_ID_EVENTS_KEY, &state.saved_id_events);
            state.saved_properties.clear();
            self.persist(SAVED_PROPERTIES_KEY, &state.saved_properties);
        }
    }

    pub fn archive_alias(&self, alias: &str, identity: &str) {
        if alias.is_empty() || identity.is_empty() {
            warn!(
                alias = alias,
                identity = identity,
                "Attempted to alias with an empty identity. Ignoring"
            );
            return;
        }
        let query = self.encoder.create_alias_query(alias, identity);
        let mut state = self.lock();
        self.push_record(&mut state, query);
    }

    // Records

    pub fn archive_event(
        &self,
        name: &str,
        properties: Option<&Properties>,
        condition: RecordCondition,
    ) {
        if name.is_empty() {
            warn!("Attempted to record an event with an empty name. Ignoring");
            return;
        }

        match condition {
            RecordCondition::Always => {}
            RecordCondition::OncePerIdentity => {
                let mut state = self.lock();
                if state.saved_id_events.iter().any(|n| n == name) {
                    debug!(event.name = name, "Event already recorded for this identity");
                    return;
                }
                state.saved_id_events.push(name.to_owned());
                self.persist(SAVED_ID_EVENTS_KEY, &state.saved_id_events);
            }
            RecordCondition::OncePerInstall => {
                let mut state = self.lock();
                if state.saved_install_events.iter().any(|n| n == name) {
                    debug!(event.name = name, "Event already recorded for this install");
                    return;
                }
                state.saved_install_events.push(name.to_owned());
                self.persist(SAVED_INSTALL_EVENTS_KEY, &state.saved_install_events);
            }
        }

        // The dedup mark and the enqueue are separate critical sections.
        let mut state = self.lock();
        let query =
            self.encoder
                .create_event_query(name, properties, &state.identity, unix_time_secs());
        self.push_record(&mut state, query);
    }

    pub fn archive_properties(&self, properties: &Properties) {
        if properties.is_empty() {
            warn!("Attempted to set an empty property map. Ignoring");
            return;
        }
        let mut state = self.lock();
        let query =
            self.encoder
                .create_properties_query(Some(properties), &state.identity, unix_time_secs());
        self.push_record(&mut state, query);
    }

    /// Queues `name=value` unless it equals the last value queued for `name`.
    pub fn archive_distinct_property(&self, name: &str, value: &str) {
        {
            let mut state = self.lock();
            if state.saved_properties.get(name).map(String::as_str) == Some(value) {
                debug!(property.key = name, "Distinct property unchanged");
                return;
            }
            state
                .saved_properties
                .insert(name.to_owned(), value.to_owned());
            self.persist(SAVED_PROPERTIES_KEY, &state.saved_properties);
        }
        let mut properties = Properties::new();
        properties.insert(name.to_owned(), value.to_owned());
        self.archive_properties(&properties);
    }

    // Clearing

    pub fn clear_send_queue(&self) {
        let mut state = self.lock();
        state.send_queue.clear();
        self.persist(SEND_QUEUE_KEY, &state.send_queue);
    }

    pub fn clear_saved_install_events(&self) {
        let mut state = self.lock();
        state.saved_install_events.clear();
        self.persist(SAVED_INSTALL_EVENTS_KEY, &state.saved_install_events);
    }

    pub fn clear_saved_id_events(&self) {
        let mut state = self.lock();
        state.saved_id_events.clear();
        self.persist(SAVED_ID_EVENTS_KEY, &state.saved_id_events);
    }

    pub fn clear_saved_properties(&self) {
        let mut state = self.lock();
        state.saved_properties.clear();
        self.persist(SAVED_PROPERTIES_KEY, &state.saved_properties);
    }

    // Queue access

    pub fn query_string(&self, index: usize) -> Option<String> {
        self.lock().send_queue.get(index).cloned()
    }

    /// Out-of-range indices are ignored.
    pub fn remove_query_string(&self, index: usize) {
        let mut state = self.lock();
        if index >= state.send_queue.len() {
            debug!(index, "No queued record to remove");
            return;
        }
        state.send_queue.remove(index);
        self.persist(SEND_QUEUE_KEY, &state.send_queue);
    }

    pub fn queue_count(&self) -> usize {
        self.lock().send_queue.len()
    }

    /// The full request for the head record: current base URL plus query.
    pub fn head_request(&self) -> Option<String> {
        let state = self.lock();
        state
            .send_queue
            .first()
            .map(|query| format!("{}{}", state.settings.base_url, query))
    }

    // Getters

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn install_uuid(&self) -> Option<String> {
        self.lock().settings.install_uuid.clone()
    }

    /// The current identity, empty until one has been archived.
    pub fn identity(&self) -> String {
        self.lock().identity.clone()
    }

    pub fn do_track(&self) -> bool {
        self.lock().settings.do_track
    }

    pub fn do_send(&self) -> bool {
        self.lock().settings.do_send
    }

    pub fn base_url(&self) -> String {
        self.lock().settings.base_url.clone()
    }

    pub fn verification_exp_date(&self) -> i64 {
        self.lock().settings.verification_exp_date
    }

    pub fn has_generic_identity(&self) -> bool {
        self.lock().settings.has_generic_identity
    }

    pub fn app_version(&self) -> Option<String> {
        self.lock().settings.app_version.clone()
    }

    pub fn saved_install_events(&self) -> Vec<String> {
        self.lock().saved_install_events.clone()
    }

    pub fn saved_id_events(&self) -> Vec<String> {
        self.lock().saved_id_events.clone()
    }

    pub fn saved_properties(&self) -> Properties {
        self.lock().saved_properties.clone()
    }
}
