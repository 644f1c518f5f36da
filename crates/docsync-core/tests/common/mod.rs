//! Test doubles and common utilities for sync contract tests
//!
//! This module provides call-recording backends and a small forum fixture
//! shared by every contract test.

#![allow(dead_code)]

use async_trait::async_trait;
use docsync_core::config::SyncConfig;
use docsync_core::error::{Error, Result};
use docsync_core::model::{DocumentKind, DocumentRef, EntityKind, EntityRef, RelatedRecord};
use docsync_core::store::{MemoryRecordStore, Snapshot, Tagging};
use docsync_core::traits::{RecordSource, RelationQuery, SearchIndex};
use docsync_core::{PolicyRegistry, SyncEngine, SyncEvent};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const ORGANIZATION_ID: u64 = 7;
pub const RUST_TAG_ID: u64 = 10;
pub const GO_TAG_ID: u64 = 11;
pub const USER_ID: u64 = 5;

/// One call received by a [`RecordingSearchIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCall {
    Index(DocumentRef),
    Remove(DocumentRef),
}

impl IndexCall {
    pub fn document(&self) -> DocumentRef {
        match self {
            IndexCall::Index(doc) | IndexCall::Remove(doc) => *doc,
        }
    }
}

/// A SearchIndex that records every call, optionally failing on one document
#[derive(Clone, Default)]
pub struct RecordingSearchIndex {
    calls: Arc<Mutex<Vec<IndexCall>>>,
    fail_on: Option<DocumentRef>,
}

impl RecordingSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that fails every call touching `document`
    pub fn failing_on(document: DocumentRef) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: Some(document),
        }
    }

    /// All calls, in the order received
    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Documents that received an index call, sorted
    pub fn indexed(&self) -> Vec<DocumentRef> {
        self.filtered(|call| matches!(call, IndexCall::Index(_)))
    }

    /// Documents that received a remove call, sorted
    pub fn removed(&self) -> Vec<DocumentRef> {
        self.filtered(|call| matches!(call, IndexCall::Remove(_)))
    }

    fn filtered(&self, keep: impl Fn(&IndexCall) -> bool) -> Vec<DocumentRef> {
        let mut docs: Vec<_> = self
            .calls()
            .iter()
            .filter(|call| keep(call))
            .map(IndexCall::document)
            .collect();
        docs.sort();
        docs
    }

    fn record(&self, call: IndexCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(call.document()) {
            return Err(Error::search_index(format!("injected failure for {}", call.document())));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for RecordingSearchIndex {
    async fn index_document(&self, record: &RelatedRecord) -> Result<()> {
        self.record(IndexCall::Index(record.document_ref()))
    }

    async fn remove_document(&self, document: &DocumentRef) -> Result<()> {
        self.record(IndexCall::Remove(*document))
    }

    fn index_name(&self) -> &'static str {
        "recording"
    }
}

/// A RecordSource over a MemoryRecordStore that counts fetches and can fail
/// every query for one document kind
#[derive(Clone)]
pub struct CountingRecordSource {
    inner: MemoryRecordStore,
    fetch_count: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<RelationQuery>>>,
    fail_for: Option<DocumentKind>,
}

impl CountingRecordSource {
    pub fn new(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            fetch_count: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
            fail_for: None,
        }
    }

    /// Fail every fetch whose target is `kind`
    pub fn failing_for(mut self, kind: DocumentKind) -> Self {
        self.fail_for = Some(kind);
        self
    }

    /// Get the number of times fetch_batch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Queries received, in order (one entry per page)
    pub fn queries(&self) -> Vec<RelationQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for CountingRecordSource {
    async fn fetch_batch(
        &self,
        query: &RelationQuery,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        if self.fail_for == Some(query.target()) {
            return Err(Error::record_source(format!("injected failure for {}", query)));
        }
        self.inner.fetch_batch(query, after, limit).await
    }

    fn source_name(&self) -> &'static str {
        "counting"
    }
}

/// Small forum used across contract tests
///
/// - Organization 7 owns articles 1, 2, 3
/// - Tag 10 "rust" tags articles 1 and 3 and podcast episode 20
/// - Tag 11 "go" tags article 2
/// - Reading-list reactions: 100 on article 1, 101 on article 3, 103 on article 2;
///   reaction 102 on article 3 and reaction 104 on article 5 are plain likes
/// - User 5 owns articles 4 and 5, comments 30–32, membership 40, and
///   created podcast episode 21
pub fn forum_snapshot() -> Snapshot {
    let organization = EntityRef::new(EntityKind::Organization, ORGANIZATION_ID);
    let user = EntityRef::new(EntityKind::User, USER_ID);

    let mut snapshot = Snapshot::new();
    for id in 1..=5 {
        snapshot = snapshot.with_document(
            DocumentKind::Article,
            id,
            json!({ "title": format!("Article {}", id) }),
        );
    }
    for id in 30..=32 {
        snapshot = snapshot.with_document(DocumentKind::Comment, id, json!({ "user_id": USER_ID }));
    }

    snapshot
        .with_document(DocumentKind::ChatChannelMembership, 40, json!({ "user_id": USER_ID }))
        .with_document(DocumentKind::PodcastEpisode, 20, json!({ "creator_id": 6 }))
        .with_document(DocumentKind::PodcastEpisode, 21, json!({ "creator_id": USER_ID }))
        .with_association(organization, "articles", [1, 2, 3])
        .with_association(user, "articles", [4, 5])
        .with_association(user, "comments", [30, 31, 32])
        .with_association(user, "chat_channel_memberships", [40])
        .with_tagging(Tagging::article(RUST_TAG_ID, "rust", 1))
        .with_tagging(Tagging::article(RUST_TAG_ID, "rust", 3))
        .with_tagging(Tagging::article(GO_TAG_ID, "go", 2))
        .with_tagging(Tagging::podcast_episode(RUST_TAG_ID, "rust", 20))
        .with_reading_list_reaction(100, 1)
        .with_reading_list_reaction(101, 3)
        .with_reaction(102, 3, "like")
        .with_reading_list_reaction(103, 2)
        .with_reaction(104, 5, "like")
}

pub fn forum_source() -> CountingRecordSource {
    CountingRecordSource::new(MemoryRecordStore::from_snapshot(forum_snapshot()))
}

pub fn doc(kind: DocumentKind, id: u64) -> DocumentRef {
    DocumentRef::new(kind, id)
}

pub fn docs(kind: DocumentKind, ids: impl IntoIterator<Item = u64>) -> Vec<DocumentRef> {
    ids.into_iter().map(|id| DocumentRef::new(kind, id)).collect()
}

/// Build an engine over the built-in policies
pub fn engine_with(
    source: impl RecordSource + 'static,
    index: impl SearchIndex + 'static,
    config: SyncConfig,
) -> (SyncEngine, mpsc::Receiver<SyncEvent>) {
    let registry = Arc::new(PolicyRegistry::with_defaults(&config));
    SyncEngine::new(registry, Box::new(source), Box::new(index), config)
        .expect("engine construction succeeds")
}

/// Build an engine over the built-in policies, discarding events
pub fn engine(
    source: impl RecordSource + 'static,
    index: impl SearchIndex + 'static,
    config: SyncConfig,
) -> SyncEngine {
    engine_with(source, index, config).0
}

/// Drain every event currently queued
pub fn drain_events(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
