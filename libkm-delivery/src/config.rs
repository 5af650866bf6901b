// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_VERIFICATION_URL: &str = "https://et.kissmetrics.io/m/trk";
pub const DEFAULT_CLIENT_TYPE: &str = "mobile_app";
pub const DEFAULT_USER_AGENT: &str = concat!("kissmetrics-rust/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_STORAGE_DIR: &str = ".kissmetrics";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DISPATCH_WORKERS: usize = 2;
/// Upper bound on how long a successful verification stays valid.
pub const DEFAULT_VERIFICATION_CEILING: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Clone, Debug)]
pub struct Config {
    pub product_key: String,
    pub client_type: String,
    pub user_agent: String,
    /// Replaces the persisted tracking endpoint at startup. Verification can
    /// still change it afterwards.
    pub base_url: Option<String>,
    pub verification_url: String,
    /// Directory holding the archive snapshots.
    pub storage_dir: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub dispatch_workers: usize,
    pub verification_ceiling: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product_key: String::new(),
            client_type: DEFAULT_CLIENT_TYPE.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            base_url: None,
            verification_url: DEFAULT_VERIFICATION_URL.to_owned(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            dispatch_workers: DEFAULT_DISPATCH_WORKERS,
            verification_ceiling: DEFAULT_VERIFICATION_CEILING,
        }
    }
}

fn check_http_url(url: &str) -> anyhow::Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| anyhow::anyhow!("unsupported scheme in {url:?}, expected http or https"))?;
    if rest.is_empty() || rest.starts_with('/') {
        anyhow::bail!("missing host in {url:?}");
    }
    Ok(())
}

pub struct FromEnv {}

impl FromEnv {
    const KM_PRODUCT_KEY: &'static str = "KM_PRODUCT_KEY";
    const KM_BASE_URL: &'static str = "KM_BASE_URL";
    const KM_VERIFICATION_URL: &'static str = "KM_VERIFICATION_URL";
    const KM_STORAGE_DIR: &'static str = "KM_STORAGE_DIR";
    const KM_CONNECT_TIMEOUT: &'static str = "KM_CONNECT_TIMEOUT";
    const KM_REQUEST_TIMEOUT: &'static str = "KM_REQUEST_TIMEOUT";
    const KM_DISPATCH_WORKERS: &'static str = "KM_DISPATCH_WORKERS";

    fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
        lookup(key).filter(|v| !v.is_empty())
    }

    fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
        let secs = lookup(key)?.parse::<f32>().ok()?;
        Duration::try_from_secs_f32(secs).ok()
    }

    fn url(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
        let url = Self::non_empty(lookup, key)?;
        match check_http_url(&url) {
            Ok(()) => Some(url),
            Err(e) => {
                tracing::warn!(env.key = key, error = %e, "Ignoring invalid url");
                None
            }
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            product_key: FromEnv::non_empty(&lookup, FromEnv::KM_PRODUCT_KEY)
                .unwrap_or(default.product_key),
            base_url: FromEnv::url(&lookup, FromEnv::KM_BASE_URL),
            verification_url: FromEnv::url(&lookup, FromEnv::KM_VERIFICATION_URL)
                .unwrap_or(default.verification_url),
            storage_dir: FromEnv::non_empty(&lookup, FromEnv::KM_STORAGE_DIR)
                .map(PathBuf::from)
                .unwrap_or(default.storage_dir),
            connect_timeout: FromEnv::seconds(&lookup, FromEnv::KM_CONNECT_TIMEOUT)
                .unwrap_or(default.connect_timeout),
            request_timeout: FromEnv::seconds(&lookup, FromEnv::KM_REQUEST_TIMEOUT)
                .unwrap_or(default.request_timeout),
            dispatch_workers: lookup(FromEnv::KM_DISPATCH_WORKERS)
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default.dispatch_workers),
            ..default
        }
    }

    pub fn set_base_url(&mut self, url: &str) -> anyhow::Result<()> {
        check_http_url(url)?;
        self.base_url = Some(url.to_owned());
        Ok(())
    }

    pub fn set_verification_url(&mut self, url: &str) -> anyhow::Result<()> {
        check_http_url(url)?;
        self.verification_url = url.to_owned();
        Ok(())
    }
}

/// Explicit overrides layered over a base [`Config`].
#[derive(Default, Debug)]
pub struct ConfigBuilder {
    pub product_key: Option<String>,
    pub base_url: Option<String>,
    pub verification_url: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub dispatch_workers: Option<usize>,
    pub verification_ceiling: Option<Duration>,
}

impl ConfigBuilder {
    pub fn merge(self, other: Config) -> Config {
        Config {
            product_key: self.product_key.unwrap_or(other.product_key),
            base_url: self.base_url.or(other.base_url),
            verification_url: self.verification_url.unwrap_or(other.verification_url),
            storage_dir: self.storage_dir.unwrap_or(other.storage_dir),
            connect_timeout: self.connect_timeout.unwrap_or(other.connect_timeout),
            request_timeout: self.request_timeout.unwrap_or(other.request_timeout),
            dispatch_workers: self.dispatch_workers.unwrap_or(other.dispatch_workers),
            verification_ceiling: self
                .verification_ceiling
                .unwrap_or(other.verification_ceiling),
            ..other
        }
    }
}
