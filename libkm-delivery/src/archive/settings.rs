// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://trk.kissmetrics.com";

/// Persisted SDK settings, written as one snapshot under the `settings` key.
///
/// Fields missing from a stored snapshot take their defaults, so snapshots
/// written by older builds still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_uuid: Option<String>,
    #[serde(default = "default_do_track")]
    pub do_track: bool,
    #[serde(default)]
    pub do_send: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Unix milliseconds after which tracking must be verified again.
    #[serde(rename = "verification_exp_date", default)]
    pub verification_exp_date: i64,
    #[serde(default)]
    pub has_generic_identity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

fn default_do_track() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_uuid: None,
            do_track: default_do_track(),
            do_send: false,
            base_url: default_base_url(),
            verification_exp_date: 0,
            has_generic_identity: false,
            app_version: None,
        }
    }
}

/// Stored under the `identity` key, apart from the settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IdentityRecord {
    pub identity: String,
}
