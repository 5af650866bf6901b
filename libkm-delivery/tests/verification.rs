// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use httpmock::prelude::*;
use libkm_delivery::verification::verify_tracking;
use libkm_delivery::{HttpTransport, VerificationResult};
use std::time::Duration;

fn transport() -> HttpTransport {
    HttpTransport::new(
        Duration::from_secs(5),
        Duration::from_secs(5),
        "kissmetrics-rust/test",
    )
    .unwrap()
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_policy_fetched_with_key_and_install_uuid() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/m/trk")
                .query_param("product_key", "KEY 1")
                .query_param("install_uuid", "uuid-1")
                .header("user-agent", "kissmetrics-rust/test");
            then.status(200)
                .header("Expires", "Wed, 21 Oct 2026 07:28:00 GMT")
                .body(r#"{"tracking":true,"tracking_endpoint":"trk.example.com"}"#);
        })
        .await;

    let result = verify_tracking(&transport(), &server.url("/m/trk"), "KEY 1", "uuid-1").await;

    assert_eq!(
        result,
        VerificationResult {
            success: true,
            do_track: true,
            base_url: "https://trk.example.com".to_owned(),
            expires_at: 1_792_567_680_000,
        }
    );
    mock.assert_async().await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_not_modified_body_is_unusable() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/m/trk");
            then.status(304);
        })
        .await;

    let result = verify_tracking(&transport(), &server.url("/m/trk"), "KEY", "uuid-1").await;

    assert!(!result.success);
    assert!(result.do_track);
    assert!(result.base_url.is_empty());
    mock.assert_calls_async(1).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_error_status_fails_without_retry() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/m/trk");
            then.status(503).body(r#"{"tracking":false,"tracking_endpoint":"x"}"#);
        })
        .await;

    let result = verify_tracking(&transport(), &server.url("/m/trk"), "KEY", "uuid-1").await;

    assert!(!result.success);
    assert!(result.do_track);
    mock.assert_calls_async(1).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_unreachable_endpoint_fails() {
    // Nothing listens on port 9 on the loopback interface.
    let result = verify_tracking(&transport(), "http://127.0.0.1:9/m/trk", "KEY", "uuid-1").await;
    assert!(!result.success);
}
