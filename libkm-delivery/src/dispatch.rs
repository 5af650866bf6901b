// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Runs producer calls off the caller's thread.
//!
//! The pool has a fixed number of lanes. Each lane executes its jobs one at a
//! time in submission order, and a calling thread always maps to the same
//! lane, so calls from one thread are applied in the order they were made.
//! Calls from different threads may interleave.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
pub struct DispatchPool {
    lanes: Vec<mpsc::UnboundedSender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl DispatchPool {
    /// Spawns `lanes` consumers on `runtime`. At least one lane is created.
    pub fn new(runtime: &Handle, lanes: usize) -> Self {
        let lane_count = lanes.max(1);
        let mut senders = Vec::with_capacity(lane_count);
        let mut workers = Vec::with_capacity(lane_count);
        for lane in 0..lane_count {
            let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
            // Jobs do blocking storage I/O, hence spawn_blocking. Awaiting
            // each one before the next keeps the lane sequential.
            workers.push(runtime.spawn(async move {
                while let Some(job) = rx.recv().await {
                    if let Err(e) = tokio::task::spawn_blocking(job).await {
                        warn!(dispatch.lane = lane, error = %e, "Producer job did not complete");
                    }
                }
                debug!(dispatch.lane = lane, "Dispatch lane closed");
            }));
            senders.push(tx);
        }
        Self {
            lanes: senders,
            workers,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    fn lane_for_current_thread(&self) -> usize {
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let lane = self.lane_for_current_thread();
        if self.lanes[lane].send(Box::new(job)).is_err() {
            warn!(dispatch.lane = lane, "Dispatch lane closed, producer call dropped");
        }
    }

    /// Resolves once every job submitted before the call has run.
    pub async fn flush(&self) {
        let mut barriers = Vec::with_capacity(self.lanes.len());
        for lane in &self.lanes {
            let (tx, rx) = oneshot::channel::<()>();
            let job: Job = Box::new(move || {
                let _ = tx.send(());
            });
            if lane.send(job).is_ok() {
                barriers.push(rx);
            }
        }
        for barrier in barriers {
            let _ = barrier.await;
        }
    }

    /// Stops accepting jobs and waits for the queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Dispatch lane ended abnormally");
            }
        }
    }
}
