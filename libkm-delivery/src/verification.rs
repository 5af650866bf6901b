// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote tracking policy.
//!
//! The collector answers `GET {verification_url}?product_key=..&install_uuid=..`
//! with `{"tracking": bool, "tracking_endpoint": "host"}` and an `Expires`
//! header. The answer decides whether producer calls are archived, whether
//! the queue is sent, and where it is sent to.

use crate::archive::RecordArchive;
use crate::encoder::encode;
use crate::sender::SenderController;
use crate::tracking::{TrackingGate, TrackingState};
use crate::transport::{DeliveryOutcome, Transport};
use anyhow::Context;
use chrono::DateTime;
use libkm_common::{time::unix_time_millis, MutexExt};
use libkm_http_client::HttpResponse;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub success: bool,
    pub do_track: bool,
    /// `https://` plus the advertised endpoint. Empty on failure.
    pub base_url: String,
    /// Unix milliseconds.
    pub expires_at: i64,
}

impl VerificationResult {
    fn failed() -> Self {
        Self {
            success: false,
            do_track: true,
            base_url: String::new(),
            expires_at: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PolicyBody {
    tracking: bool,
    tracking_endpoint: String,
    #[serde(default)]
    reason: Option<String>,
}

/// `Expires` as unix milliseconds, or `now` when absent or unparsable.
pub fn parse_expires(value: Option<&str>, now_millis: i64) -> i64 {
    value
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
        .map(|date| date.timestamp_millis())
        .unwrap_or(now_millis)
}

fn parse_policy(response: &HttpResponse, now_millis: i64) -> anyhow::Result<VerificationResult> {
    let body: PolicyBody =
        serde_json::from_slice(&response.body).context("verification body is not a policy")?;
    if let Some(reason) = &body.reason {
        debug!(verification.reason = %reason, "Verification reason");
    }
    Ok(VerificationResult {
        success: true,
        do_track: body.tracking,
        base_url: format!("https://{}", body.tracking_endpoint),
        expires_at: parse_expires(response.header("expires"), now_millis),
    })
}

/// Runs one policy check. Never fails: every fault becomes an unsuccessful
/// result.
pub async fn verify_tracking(
    transport: &dyn Transport,
    verification_url: &str,
    product_key: &str,
    install_uuid: &str,
) -> VerificationResult {
    let url = format!(
        "{verification_url}?product_key={}&install_uuid={}",
        encode(product_key),
        encode(install_uuid)
    );
    let now = unix_time_millis();
    let result = transport.get(&url).await;
    if DeliveryOutcome::classify(&result) != DeliveryOutcome::Success {
        match &result {
            Ok(response) => warn!(
                http.status = response.status_code,
                "Verification rejected"
            ),
            Err(e) => warn!(error = %e, "Verification request failed"),
        }
        return VerificationResult::failed();
    }
    let parsed = result
        .map_err(anyhow::Error::from)
        .and_then(|response| parse_policy(&response, now));
    match parsed {
        Ok(result) => result,
        Err(e) => {
            warn!(error = ?e, "Verification response unusable");
            VerificationResult::failed()
        }
    }
}

/// Applies policy checks to the archive, the sender and the tracking gate.
pub struct VerificationGate {
    product_key: String,
    verification_url: String,
    ceiling: Duration,
    transport: Arc<dyn Transport>,
    archive: Arc<RecordArchive>,
    sender: Arc<SenderController>,
    tracking: Arc<TrackingGate>,
    runtime: Handle,
    in_flight: AtomicBool,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for VerificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationGate")
            .field("verification_url", &self.verification_url)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl VerificationGate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_key: String,
        verification_url: String,
        ceiling: Duration,
        transport: Arc<dyn Transport>,
        archive: Arc<RecordArchive>,
        sender: Arc<SenderController>,
        tracking: Arc<TrackingGate>,
        runtime: Handle,
    ) -> Self {
        Self {
            product_key,
            verification_url,
            ceiling,
            transport,
            archive,
            sender,
            tracking,
            runtime,
            in_flight: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// True once the last verification has expired.
    pub fn is_due(&self) -> bool {
        unix_time_millis() >= self.archive.verification_exp_date()
    }

    /// Spawns a check if one is due and none is running.
    pub fn trigger_if_due(self: &Arc<Self>) {
        if !self.is_due() {
            return;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Verification already in flight");
            return;
        }
        let this = Arc::clone(self);
        let task = self.runtime.spawn(async move {
            this.verify().await;
            this.in_flight.store(false, Ordering::Release);
        });
        let mut pending = self.pending.lock_or_recover();
        pending.retain(|t| !t.is_finished());
        pending.push(task);
    }

    /// Runs a check now and applies its result.
    pub async fn verify(&self) -> VerificationResult {
        let install_uuid = self.archive.install_uuid().unwrap_or_default();
        let result = verify_tracking(
            self.transport.as_ref(),
            &self.verification_url,
            &self.product_key,
            &install_uuid,
        )
        .await;
        self.apply(&result);
        result
    }

    pub fn apply(&self, result: &VerificationResult) {
        if !result.success {
            self.tracking.set_state(TrackingState::Tracking);
            self.archive.archive_do_track(true);
            self.sender.disable_sending();
            self.archive.archive_do_send(false);
            return;
        }

        let ceiling_millis = i64::try_from(self.ceiling.as_millis()).unwrap_or(i64::MAX);
        let max_expiry = unix_time_millis().saturating_add(ceiling_millis);
        self.archive
            .archive_verification_exp_date(result.expires_at.min(max_expiry));

        if result.do_track {
            self.tracking.set_state(TrackingState::Tracking);
            self.sender.enable_sending();
            self.archive.archive_do_send(true);
        } else {
            self.tracking.set_state(TrackingState::NotTracking);
            self.sender.disable_sending();
        }
        self.archive.archive_do_track(result.do_track);
        self.archive.archive_base_url(&result.base_url);
        debug!(
            verification.do_track = result.do_track,
            verification.base_url = %result.base_url,
            "Verification applied"
        );
    }

    /// Waits for spawned checks to finish.
    pub async fn wait_until_settled(&self) {
        loop {
            let pending = std::mem::take(&mut *self.pending.lock_or_recover());
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if let Err(e) = task.await {
                    warn!(error = %e, "Verification task ended abnormally");
                }
            }
        }
    }
}
