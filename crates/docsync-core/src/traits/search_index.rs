// # Search Index Trait
//
// Defines the interface for pushing documents into, and removing documents
// from, the search backend.
//
// ## Implementations
//
// - Elasticsearch: `docsync-index-elasticsearch` crate
// - In-memory: `MemorySearchIndex` (tests, embedding, daemon memory mode)
//
// ## Usage
//
// ```rust,ignore
// use docsync_core::SearchIndex;
//
// index.index_document(&record).await?;
// index.remove_document(&record.document_ref()).await?;
// ```

use crate::error::Result;
use crate::model::{DocumentRef, RelatedRecord};
use async_trait::async_trait;

/// Trait for search index implementations
///
/// Both operations must be idempotent: indexing an already indexed document
/// overwrites it, removing an absent document succeeds.
///
/// # Responsibilities
///
/// A search index performs exactly one backend call per method invocation.
/// It does not retry, batch, or decide *whether* a document should be
/// indexed; those decisions belong to `SyncEngine`.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Index (create or overwrite) a related record's document
    async fn index_document(&self, record: &RelatedRecord) -> Result<()>;

    /// Remove a document from the index
    async fn remove_document(&self, document: &DocumentRef) -> Result<()>;

    /// Index name for logging
    fn index_name(&self) -> &'static str;
}
