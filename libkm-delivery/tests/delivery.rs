// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use httpmock::prelude::*;
use libkm_delivery::sender::SenderController;
use libkm_delivery::{
    HttpTransport, MemoryStore, Properties, QueryEncoder, RecordArchive, RecordCondition,
    SenderState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

fn setup(base_url: &str) -> (Arc<RecordArchive>, Arc<SenderController>) {
    let archive = Arc::new(RecordArchive::open(
        Arc::new(MemoryStore::new()),
        QueryEncoder::new("KEY", "mobile_app", "kissmetrics-rust/test"),
    ));
    archive.archive_base_url(base_url);
    archive.archive_first_identity("anon");
    let transport = Arc::new(
        HttpTransport::new(
            Duration::from_secs(5),
            Duration::from_secs(5),
            "kissmetrics-rust/test",
        )
        .unwrap(),
    );
    let sender = Arc::new(SenderController::new(
        archive.clone(),
        transport,
        Handle::current(),
        false,
    ));
    (archive, sender)
}

#[cfg_attr(miri, ignore)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queue_delivered_over_http() {
    let server = MockServer::start_async().await;

    let alias = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/a")
                .query_param("_k", "KEY")
                .query_param("_c", "mobile_app")
                .query_param("_p", "anon")
                .query_param("_n", "bob@example.com");
            then.status(200);
        })
        .await;
    let event = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/e")
                .query_param("_p", "bob@example.com")
                .query_param("_n", "Played Song")
                .query_param("_d", "1")
                .query_param("genre", "rock & roll");
            then.status(304);
        })
        .await;

    let (archive, sender) = setup(&server.base_url());
    archive.archive_identity("bob@example.com");
    let mut properties = Properties::new();
    properties.insert("genre".to_owned(), "rock & roll".to_owned());
    archive.archive_event("Played Song", Some(&properties), RecordCondition::Always);

    sender.start_sending();
    sender.wait_until_settled().await;

    alias.assert_async().await;
    event.assert_async().await;
    assert_eq!(archive.queue_count(), 0);
    assert_eq!(sender.state(), SenderState::Ready);
}

#[cfg_attr(miri, ignore)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_error_keeps_record_for_next_drain() {
    let failing_server = MockServer::start_async().await;
    let failing = failing_server
        .mock_async(|when, then| {
            when.method(GET).path("/s");
            then.status(500);
        })
        .await;

    let (archive, sender) = setup(&failing_server.base_url());
    archive.archive_distinct_property("tier", "gold");
    archive.archive_distinct_property("seats", "4");

    sender.start_sending();
    sender.wait_until_settled().await;

    failing.assert_calls_async(1).await;
    assert_eq!(archive.queue_count(), 2);
    assert_eq!(sender.state(), SenderState::Ready);

    // The base url is read at send time, so the retry goes to the new host.
    let server = MockServer::start_async().await;
    let ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/s");
            then.status(200);
        })
        .await;
    archive.archive_base_url(&server.base_url());

    sender.start_sending();
    sender.wait_until_settled().await;

    ok.assert_calls_async(2).await;
    failing.assert_calls_async(1).await;
    assert_eq!(archive.queue_count(), 0);
}

#[cfg_attr(miri, ignore)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_record_is_discarded() {
    let server = MockServer::start_async().await;

    let ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/a");
            then.status(200);
        })
        .await;

    // A base url with no scheme cannot be turned into a request.
    let (archive, sender) = setup("not a url");
    archive.archive_alias("new", "old");
    sender.start_sending();
    sender.wait_until_settled().await;
    assert_eq!(archive.queue_count(), 0);

    archive.archive_base_url(&server.base_url());
    archive.archive_alias("new", "old");
    sender.start_sending();
    sender.wait_until_settled().await;

    ok.assert_calls_async(1).await;
    assert_eq!(archive.queue_count(), 0);
}
