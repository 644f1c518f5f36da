//! Architectural Contract Test: Replay and Shutdown
//!
//! This test verifies the stream-driven run loop.
//!
//! Constraints verified:
//! - Every saved record on the stream is handled, in order
//! - The loop stops at end of stream
//! - A shutdown signal stops a loop that is waiting for records
//!
//! If this test fails, someone has:
//! - Made the run loop drop or reorder saves
//! - Blocked shutdown behind an idle stream

mod common;

use common::*;
use docsync_core::model::{DocumentKind, EntityKind, SavedRecord};
use docsync_core::{ChangeSet, SyncConfig, SyncEvent};
use std::time::Duration;
use tokio::time::timeout;

fn saves() -> Vec<SavedRecord> {
    vec![
        SavedRecord::new(EntityKind::Organization, ORGANIZATION_ID)
            .with_changes(ChangeSet::new().with_change("name", "Acme", "Acme Inc")),
        // Not a shared field
        SavedRecord::new(EntityKind::User, USER_ID)
            .with_changes(ChangeSet::new().with_change("email", "a@x", "b@x")),
        SavedRecord::new(EntityKind::Tag, GO_TAG_ID)
            .with_attribute("name", "go")
            .with_changes(ChangeSet::new().with_change("name", "golang", "go")),
    ]
}

#[tokio::test]
async fn replay_handles_every_record_in_order() {
    let index = RecordingSearchIndex::new();
    let (engine, mut events) = engine_with(forum_source(), index.clone(), SyncConfig::default());
    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let summary = engine
        .run_with_shutdown(tokio_stream::iter(saves()), Some(shutdown_rx))
        .await
        .expect("run succeeds");

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.synced, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    // Articles 1-3, then go-tagged article 2 and its reading-list reaction 103
    assert_eq!(summary.documents, 5);

    let touched: Vec<_> = index.calls().iter().map(IndexCall::document).collect();
    assert_eq!(
        touched,
        vec![
            doc(DocumentKind::Article, 1),
            doc(DocumentKind::Article, 2),
            doc(DocumentKind::Article, 3),
            doc(DocumentKind::Article, 2),
            doc(DocumentKind::Reaction, 103),
        ]
    );

    let events = drain_events(&mut events);
    assert!(matches!(
        events.last(),
        Some(SyncEvent::Stopped { reason }) if reason == "End of stream"
    ));
}

#[tokio::test]
async fn shutdown_stops_idle_loop() {
    let (engine, mut events) = engine_with(
        forum_source(),
        RecordingSearchIndex::new(),
        SyncConfig::default(),
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn(async move {
        engine
            .run_with_shutdown(tokio_stream::pending::<SavedRecord>(), Some(shutdown_rx))
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(()).expect("engine is listening");

    let summary = timeout(Duration::from_secs(1), handle)
        .await
        .expect("engine stops promptly")
        .expect("task completes")
        .expect("run succeeds");
    assert_eq!(summary.processed, 0);

    let events = drain_events(&mut events);
    assert!(matches!(
        events.as_slice(),
        [SyncEvent::Stopped { reason }] if reason == "Shutdown signal"
    ));
}
