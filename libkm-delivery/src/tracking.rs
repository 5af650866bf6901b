// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::archive::{RecordArchive, RecordCondition};
use crate::encoder::Properties;
use crate::sender::SenderController;
use libkm_common::RwLockExt;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Tracking,
    /// Producer calls are dropped at submission.
    NotTracking,
}

impl TrackingState {
    pub fn from_do_track(do_track: bool) -> Self {
        if do_track {
            Self::Tracking
        } else {
            Self::NotTracking
        }
    }

    pub fn admit(self, call: ProducerCall) -> Option<ProducerCall> {
        match self {
            Self::Tracking => Some(call),
            Self::NotTracking => None,
        }
    }
}

/// One public API call, captured for execution on the dispatch pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerCall {
    Identify {
        identity: String,
    },
    Alias {
        alias: String,
        identity: String,
    },
    /// `new_identity` is generated at submission.
    ClearIdentity {
        new_identity: String,
    },
    Record {
        name: String,
        properties: Option<Properties>,
        condition: RecordCondition,
    },
    RecordOnce {
        name: String,
    },
    Set {
        properties: Properties,
    },
    SetDistinct {
        name: String,
        value: String,
    },
}

impl ProducerCall {
    fn name(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "identify",
            Self::Alias { .. } => "alias",
            Self::ClearIdentity { .. } => "clear_identity",
            Self::Record { .. } => "record",
            Self::RecordOnce { .. } => "record_once",
            Self::Set { .. } => "set",
            Self::SetDistinct { .. } => "set_distinct",
        }
    }

    /// Performs the archive mutation. Returns whether the queue should be
    /// drained afterwards.
    pub fn apply(self, archive: &RecordArchive) -> bool {
        match self {
            Self::Identify { identity } => archive.archive_identity(&identity),
            Self::Alias { alias, identity } => archive.archive_alias(&alias, &identity),
            Self::ClearIdentity { new_identity } => {
                archive.archive_first_identity(&new_identity);
                archive.clear_saved_id_events();
                archive.clear_saved_properties();
                return false;
            }
            Self::Record {
                name,
                properties,
                condition,
            } => archive.archive_event(&name, properties.as_ref(), condition),
            Self::RecordOnce { name } => {
                archive.archive_event(&name, None, RecordCondition::OncePerIdentity)
            }
            Self::Set { properties } => archive.archive_properties(&properties),
            Self::SetDistinct { name, value } => archive.archive_distinct_property(&name, &value),
        }
        true
    }
}

/// Decides whether producer calls reach the archive at all.
///
/// The state is consulted when a call is submitted, not when it runs, so a
/// call admitted just before verification turns tracking off still lands.
#[derive(Debug)]
pub struct TrackingGate {
    state: RwLock<TrackingState>,
    archive: Arc<RecordArchive>,
    sender: Arc<SenderController>,
}

impl TrackingGate {
    pub fn new(
        state: TrackingState,
        archive: Arc<RecordArchive>,
        sender: Arc<SenderController>,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            archive,
            sender,
        }
    }

    pub fn state(&self) -> TrackingState {
        *self.state.read_or_recover()
    }

    pub fn set_state(&self, state: TrackingState) {
        let previous = std::mem::replace(&mut *self.state.write_or_recover(), state);
        if previous != state {
            debug!(tracking.from = ?previous, tracking.to = ?state, "Tracking state changed");
        }
    }

    pub fn admit(&self, call: ProducerCall) -> Option<ProducerCall> {
        let name = call.name();
        let admitted = self.state().admit(call);
        if admitted.is_none() {
            trace!(producer.call = name, "Not tracking, call dropped");
        }
        admitted
    }

    /// Runs an admitted call: the archive mutation, then a drain request.
    pub fn execute(&self, call: ProducerCall) {
        trace!(producer.call = call.name(), "Executing producer call");
        if call.apply(&self.archive) {
            self.sender.start_sending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::QueryEncoder;
    use crate::store::MemoryStore;

    fn archive() -> RecordArchive {
        RecordArchive::open(
            Arc::new(MemoryStore::new()),
            QueryEncoder::new("KEY", "mobile_app", "UA"),
        )
    }

    #[test]
    fn test_not_tracking_drops_every_call() {
        let calls = vec![
            ProducerCall::Identify {
                identity: "bob".to_owned(),
            },
            ProducerCall::RecordOnce {
                name: "x".to_owned(),
            },
            ProducerCall::ClearIdentity {
                new_identity: "anon".to_owned(),
            },
        ];
        for call in calls {
            assert!(TrackingState::NotTracking.admit(call.clone()).is_none());
            assert_eq!(TrackingState::Tracking.admit(call.clone()), Some(call));
        }
    }

    #[test]
    fn test_from_do_track() {
        assert_eq!(TrackingState::from_do_track(true), TrackingState::Tracking);
        assert_eq!(TrackingState::from_do_track(false), TrackingState::NotTracking);
    }

    #[test]
    fn test_clear_identity_does_not_request_send() {
        let archive = archive();
        archive.archive_first_identity("anon");
        archive.archive_identity("bob");
        archive.archive_event("Once", None, RecordCondition::OncePerIdentity);
        archive.archive_event("Install", None, RecordCondition::OncePerInstall);
        archive.archive_distinct_property("k", "v");
        let queued = archive.queue_count();

        let send = ProducerCall::ClearIdentity {
            new_identity: "anon-2".to_owned(),
        }
        .apply(&archive);

        assert!(!send);
        assert_eq!(archive.identity(), "anon-2");
        assert!(archive.has_generic_identity());
        assert!(archive.saved_id_events().is_empty());
        assert!(archive.saved_properties().is_empty());
        // Install-scoped dedup survives an identity reset.
        assert_eq!(archive.saved_install_events(), vec!["Install".to_owned()]);
        assert_eq!(archive.queue_count(), queued);
    }

    #[test]
    fn test_record_once_is_once_per_identity() {
        let archive = archive();
        for _ in 0..2 {
            assert!(ProducerCall::RecordOnce {
                name: "Tutorial".to_owned(),
            }
            .apply(&archive));
        }
        assert_eq!(archive.queue_count(), 1);
        assert_eq!(archive.saved_id_events(), vec!["Tutorial".to_owned()]);
    }

    #[test]
    fn test_each_call_maps_to_its_archive_operation() {
        let archive = archive();
        archive.archive_first_identity("anon");

        let mut properties = Properties::new();
        properties.insert("plan".to_owned(), "pro".to_owned());
        let calls = [
            ProducerCall::Identify {
                identity: "bob".to_owned(),
            },
            ProducerCall::Alias {
                alias: "b2".to_owned(),
                identity: "bob".to_owned(),
            },
            ProducerCall::Record {
                name: "Paid".to_owned(),
                properties: Some(properties.clone()),
                condition: RecordCondition::Always,
            },
            ProducerCall::Set { properties },
            ProducerCall::SetDistinct {
                name: "tier".to_owned(),
                value: "1".to_owned(),
            },
        ];
        for call in calls {
            assert!(call.apply(&archive));
        }

        let queue: Vec<String> = (0..archive.queue_count())
            .filter_map(|i| archive.query_string(i))
            .collect();
        assert_eq!(queue.len(), 5);
        assert!(queue[0].starts_with("/a?") && queue[0].ends_with("_p=anon&_n=bob"));
        assert!(queue[1].starts_with("/a?") && queue[1].ends_with("_p=b2&_n=bob"));
        assert!(queue[2].starts_with("/e?") && queue[2].ends_with("&plan=pro"));
        assert!(queue[3].starts_with("/s?") && queue[3].ends_with("&plan=pro"));
        assert!(queue[4].starts_with("/s?") && queue[4].ends_with("&tier=1"));
    }
}
