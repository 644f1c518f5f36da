// # Memory Search Index
//
// In-memory implementation of SearchIndex.
//
// Keeps the latest document for every indexed record and counts the calls
// it received. Nothing survives a restart; used for embedding, tests and
// the daemon's memory mode.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{DocumentKind, DocumentRef, RelatedRecord};
use crate::traits::SearchIndex;

/// In-memory search index
///
/// Clones share the same documents and counters.
#[derive(Debug, Clone, Default)]
pub struct MemorySearchIndex {
    documents: Arc<RwLock<BTreeMap<DocumentRef, Value>>>,
    index_calls: Arc<AtomicUsize>,
    remove_calls: Arc<AtomicUsize>,
}

impl MemorySearchIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document for a record, if indexed
    pub async fn get(&self, document: &DocumentRef) -> Option<Value> {
        self.documents.read().await.get(document).cloned()
    }

    pub async fn contains(&self, document: &DocumentRef) -> bool {
        self.documents.read().await.contains_key(document)
    }

    /// Indexed ids of one document kind, ascending
    pub async fn ids(&self, kind: DocumentKind) -> Vec<u64> {
        self.documents
            .read()
            .await
            .keys()
            .filter(|doc| doc.kind == kind)
            .map(|doc| doc.id)
            .collect()
    }

    /// Get the number of indexed documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Check if the index is empty
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Number of `index_document` calls received
    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    /// Number of `remove_document` calls received
    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index_document(&self, record: &RelatedRecord) -> Result<(), Error> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.documents.write().await;
        guard.insert(record.document_ref(), record.document.clone());
        Ok(())
    }

    async fn remove_document(&self, document: &DocumentRef) -> Result<(), Error> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.documents.write().await;
        guard.remove(document);
        Ok(())
    }

    fn index_name(&self) -> &'static str {
        "memory"
    }
}
