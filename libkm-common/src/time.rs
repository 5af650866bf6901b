// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .unwrap_or_default()
}

/// Seconds since the unix epoch, as carried by the `_t` query parameter.
pub fn unix_time_secs() -> u64 {
    since_epoch().as_secs()
}

/// Milliseconds since the unix epoch, the unit used for verification expiry.
pub fn unix_time_millis() -> i64 {
    i64::try_from(since_epoch().as_millis()).unwrap_or(i64::MAX)
}
