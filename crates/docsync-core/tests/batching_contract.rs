//! Architectural Contract Test: Batched Iteration
//!
//! This test verifies that relations are always read page by page and that
//! every related record is handled exactly once.
//!
//! Constraints verified:
//! - Page size never exceeds the configured batch size
//! - Each record receives exactly one index call, across page boundaries
//! - Iteration ends on the first short or empty page
//!
//! If this test fails, someone has:
//! - Loaded a whole relation into memory
//! - Broken the keyset cursor (duplicates or gaps between pages)

mod common;

use async_trait::async_trait;
use common::*;
use docsync_core::error::Result;
use docsync_core::model::{DocumentKind, EntityKind, EntityRef, RelatedRecord, SavedRecord};
use docsync_core::traits::{RecordSource, RelationQuery};
use docsync_core::{ChangeSet, MemoryRecordStore, Snapshot, SyncConfig};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Records the limit of every fetch it forwards
#[derive(Clone)]
struct LimitRecordingSource {
    inner: MemoryRecordStore,
    limits: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl RecordSource for LimitRecordingSource {
    async fn fetch_batch(
        &self,
        query: &RelationQuery,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>> {
        self.limits.lock().unwrap().push(limit);
        self.inner.fetch_batch(query, after, limit).await
    }

    fn source_name(&self) -> &'static str {
        "limit-recording"
    }
}

fn organization_with_articles(count: u64) -> MemoryRecordStore {
    let owner = EntityRef::new(EntityKind::Organization, ORGANIZATION_ID);
    let mut snapshot = Snapshot::new().with_association(owner, "articles", 1..=count);
    for id in 1..=count {
        snapshot = snapshot.with_document(DocumentKind::Article, id, json!({ "id": id }));
    }
    MemoryRecordStore::from_snapshot(snapshot)
}

fn rename() -> SavedRecord {
    SavedRecord::new(EntityKind::Organization, ORGANIZATION_ID)
        .with_changes(ChangeSet::new().with_change("name", "Acme", "Acme Inc"))
}

#[tokio::test]
async fn large_relation_is_indexed_exactly_once_per_record() {
    let source = CountingRecordSource::new(organization_with_articles(25));
    let index = RecordingSearchIndex::new();
    let engine = engine(
        source.clone(),
        index.clone(),
        SyncConfig::default().with_batch_size(10),
    );

    let report = engine.after_save(&rename()).await;

    assert!(report.is_success());
    assert_eq!(index.call_count(), 25);
    assert_eq!(index.indexed(), docs(DocumentKind::Article, 1..=25));
    // 10 + 10 + 5: the short page ends iteration
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(report.relations[0].batches, 3);
}

#[tokio::test]
async fn exact_multiple_needs_one_empty_page() {
    let source = CountingRecordSource::new(organization_with_articles(20));
    let index = RecordingSearchIndex::new();
    let engine = engine(
        source.clone(),
        index.clone(),
        SyncConfig::default().with_batch_size(10),
    );

    let report = engine.after_save(&rename()).await;

    assert_eq!(index.call_count(), 20);
    assert_eq!(source.fetch_count(), 3);
    // The trailing empty page is not a batch
    assert_eq!(report.relations[0].batches, 2);
}

#[tokio::test]
async fn fetches_never_exceed_batch_size() {
    let limits = Arc::new(Mutex::new(Vec::new()));
    let source = LimitRecordingSource {
        inner: organization_with_articles(7),
        limits: limits.clone(),
    };
    let engine = engine(
        source,
        RecordingSearchIndex::new(),
        SyncConfig::default().with_batch_size(3),
    );

    engine.after_save(&rename()).await;

    let limits = limits.lock().unwrap().clone();
    assert_eq!(limits, vec![3, 3, 3]);
}

#[tokio::test]
async fn guard_reads_a_single_record() {
    let limits = Arc::new(Mutex::new(Vec::new()));
    let source = LimitRecordingSource {
        inner: MemoryRecordStore::from_snapshot(forum_snapshot()),
        limits: limits.clone(),
    };
    let engine = engine(source, RecordingSearchIndex::new(), SyncConfig::default());

    let saved = SavedRecord::new(EntityKind::Article, 1)
        .with_attribute("published", true)
        .with_changes(ChangeSet::new().with_change("title", "Old", "New"));
    engine.after_save(&saved).await;

    assert_eq!(limits.lock().unwrap().clone(), vec![1]);
}

#[tokio::test]
async fn empty_relation_costs_one_query() {
    let source = CountingRecordSource::new(organization_with_articles(0));
    let index = RecordingSearchIndex::new();
    let engine = engine(source.clone(), index.clone(), SyncConfig::default());

    let report = engine.after_save(&rename()).await;

    assert!(report.is_success());
    assert_eq!(report.documents_for("articles"), Some(0));
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(index.call_count(), 0);
}

#[tokio::test]
async fn relation_ending_on_the_largest_id_completes() {
    let owner = EntityRef::new(EntityKind::Organization, ORGANIZATION_ID);
    let store = MemoryRecordStore::from_snapshot(
        Snapshot::new()
            .with_document(DocumentKind::Article, u64::MAX, json!({}))
            .with_association(owner, "articles", [u64::MAX]),
    );
    let index = RecordingSearchIndex::new();
    let engine = engine(store, index.clone(), SyncConfig::default().with_batch_size(1));

    let report = engine.after_save(&rename()).await;

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(index.indexed(), vec![doc(DocumentKind::Article, u64::MAX)]);
}
