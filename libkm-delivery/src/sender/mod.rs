// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drains the archive's send queue, one request at a time.
//!
//! The controller lock is always taken before the archive lock, and the
//! network call is made with neither held. Each Ready→Sending transition
//! opens a new drain generation; a completion tagged with an older
//! generation is dropped, so a request left in flight across a
//! disable/enable cycle cannot consume a record it never sent. A new
//! generation's worker only starts sending once the previous worker has
//! exited, so at most one request is ever outstanding.

mod state;

pub use state::{transition, SenderAction, SenderEffect, SenderState};

use crate::archive::RecordArchive;
use crate::transport::{DeliveryOutcome, Transport};
use libkm_common::MutexExt;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SenderInner {
    state: SenderState,
    generation: u64,
    workers: Vec<JoinHandle<()>>,
}

pub struct SenderController {
    inner: Mutex<SenderInner>,
    archive: Arc<RecordArchive>,
    transport: Arc<dyn Transport>,
    runtime: Handle,
}

impl fmt::Debug for SenderController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderController")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SenderController {
    /// `disabled` selects the initial state: Disabled instead of Ready.
    pub fn new(
        archive: Arc<RecordArchive>,
        transport: Arc<dyn Transport>,
        runtime: Handle,
        disabled: bool,
    ) -> Self {
        let state = if disabled {
            SenderState::Disabled
        } else {
            SenderState::Ready
        };
        Self {
            inner: Mutex::new(SenderInner {
                state,
                ..Default::default()
            }),
            archive,
            transport,
            runtime,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SenderInner> {
        self.inner.lock_or_recover()
    }

    fn apply(
        inner: &mut SenderInner,
        action: SenderAction,
    ) -> Option<SenderEffect> {
        let from = inner.state;
        let (to, effect) = transition(from, action);
        if from != to {
            debug!(sender.from = ?from, sender.to = ?to, sender.action = ?action, "Sender transition");
        }
        inner.state = to;
        effect
    }

    pub fn state(&self) -> SenderState {
        self.lock().state
    }

    /// Starts a drain worker if the controller is Ready and the queue is not
    /// empty. Ignored while Sending or Disabled.
    pub fn start_sending(self: &Arc<Self>) {
        let mut inner = self.lock();
        let queued = self.archive.queue_count();
        if let Some(SenderEffect::StartDrain) =
            Self::apply(&mut inner, SenderAction::Start { queued })
        {
            inner.generation += 1;
            let generation = inner.generation;
            let this = Arc::clone(self);
            // A worker from an older generation may still have its request in
            // flight after a disable/enable cycle. The new one waits for it.
            let previous: Vec<JoinHandle<()>> = std::mem::take(&mut inner.workers)
                .into_iter()
                .filter(|w| !w.is_finished())
                .collect();
            inner.workers.push(self.runtime.spawn(async move {
                for worker in previous {
                    if let Err(e) = worker.await {
                        warn!(error = %e, "Previous drain worker ended abnormally");
                    }
                }
                this.drain(generation).await
            }));
        }
    }

    /// Moves to Disabled and empties the queue before returning.
    pub fn disable_sending(&self) {
        let mut inner = self.lock();
        if let Some(SenderEffect::ClearQueue) = Self::apply(&mut inner, SenderAction::Disable) {
            self.archive.clear_send_queue();
        }
    }

    /// Disabled → Ready. Does not start a drain by itself.
    pub fn enable_sending(&self) {
        let mut inner = self.lock();
        Self::apply(&mut inner, SenderAction::Enable);
    }

    /// Waits for every drain worker spawned so far to finish.
    pub async fn wait_until_settled(&self) {
        loop {
            let workers = std::mem::take(&mut self.lock().workers);
            if workers.is_empty() {
                return;
            }
            for worker in workers {
                if let Err(e) = worker.await {
                    warn!(error = %e, "Drain worker ended abnormally");
                }
            }
        }
    }

    async fn drain(self: Arc<Self>, generation: u64) {
        loop {
            let Some(url) = self.archive.head_request() else {
                // Emptied between the start decision and now.
                self.advance_after_empty(generation);
                return;
            };
            let result = self.transport.get(&url).await;
            let outcome = DeliveryOutcome::classify(&result);
            match &result {
                Ok(response) => {
                    debug!(http.status = response.status_code, delivery.outcome = ?outcome, "Record delivery finished")
                }
                Err(e) => warn!(error = %e, delivery.outcome = ?outcome, "Record delivery failed"),
            }
            if !self.complete(generation, outcome) {
                return;
            }
        }
    }

    /// Applies a delivery outcome. Returns whether this worker should send
    /// the next head.
    fn complete(&self, generation: u64, outcome: DeliveryOutcome) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding stale completion");
            return false;
        }
        if let Some(SenderEffect::RemoveHead) =
            Self::apply(&mut inner, SenderAction::Delivered { outcome })
        {
            self.archive.remove_query_string(0);
        }
        if inner.state != SenderState::Sending {
            return false;
        }
        let queued = self.archive.queue_count();
        matches!(
            Self::apply(&mut inner, SenderAction::Advance { queued }),
            Some(SenderEffect::SendNext)
        )
    }

    fn advance_after_empty(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            let queued = self.archive.queue_count();
            Self::apply(&mut inner, SenderAction::Advance { queued });
        }
    }
}
