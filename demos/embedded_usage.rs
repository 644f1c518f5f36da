//! Minimal embedding example for docsync-core
//!
//! This example wires the engine into an application's own persistence
//! hooks: a custom search index, an in-memory record store, and a direct
//! `after_save` call per save. A replay over a stream follows.

use docsync_core::engine::SyncEvent;
use docsync_core::model::{DocumentKind, DocumentRef, EntityKind, EntityRef, RelatedRecord};
use docsync_core::store::Tagging;
use docsync_core::traits::SearchIndex;
use docsync_core::{
    ChangeSet, MemoryRecordStore, PolicyRegistry, Result, SavedRecord, Snapshot, SyncConfig,
    SyncEngine,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Search index that prints instead of indexing
struct PrintingIndex {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl SearchIndex for PrintingIndex {
    async fn index_document(&self, record: &RelatedRecord) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] index {} {}", record.document_ref(), record.document);
        Ok(())
    }

    async fn remove_document(&self, document: &DocumentRef) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] remove {}", document);
        Ok(())
    }

    fn index_name(&self) -> &'static str {
        "printing"
    }
}

fn blog_snapshot() -> Snapshot {
    let org = EntityRef::new(EntityKind::Organization, 1);
    Snapshot::new()
        .with_document(DocumentKind::Article, 10, json!({ "title": "Ownership in practice" }))
        .with_document(DocumentKind::Article, 11, json!({ "title": "Async without tears" }))
        .with_association(org, "articles", [10, 11])
        .with_tagging(Tagging::article(5, "rust", 10))
        .with_tagging(Tagging::article(5, "rust", 11))
        .with_reading_list_reaction(100, 10)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Embedded docsync-core Example ===\n");

    let config = SyncConfig::default().with_batch_size(50);
    let registry = Arc::new(PolicyRegistry::with_defaults(&config));
    let store = MemoryRecordStore::from_snapshot(blog_snapshot());
    let calls = Arc::new(AtomicUsize::new(0));
    let index = PrintingIndex {
        calls: calls.clone(),
    };

    println!("1. Creating engine...");
    let (engine, mut event_rx) =
        SyncEngine::new(registry, Box::new(store), Box::new(index), config)?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let SyncEvent::Completed { entity, documents, .. } = event {
                info!("{} touched {} document(s)", entity, documents);
            }
        }
    });

    // An application's post-save hook calls after_save directly
    println!("2. Organization renamed:");
    let rename = SavedRecord::new(EntityKind::Organization, 1)
        .with_attribute("name", "Rustaceans")
        .with_changes(ChangeSet::new().with_change("name", "Crabs", "Rustaceans"));
    let report = engine.after_save(&rename).await;
    println!("{}\n", serde_json::to_string_pretty(&report)?);

    // A batch of saves can be replayed as a stream
    println!("3. Replaying saves:");
    let saves = vec![
        SavedRecord::new(EntityKind::Tag, 5)
            .with_attribute("name", "rust")
            .with_changes(ChangeSet::new().with_change("keywords_for_search", "", "crab")),
        SavedRecord::new(EntityKind::Article, 11)
            .with_attribute("published", true)
            .with_changes(ChangeSet::new().with_change("title", "Async", "Async without tears")),
    ];
    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let summary = engine
        .run_with_shutdown(tokio_stream::iter(saves), Some(shutdown_rx))
        .await?;
    println!("{}\n", serde_json::to_string_pretty(&summary)?);

    drop(engine);
    let _ = event_listener.await;

    println!("4. Search index received {} call(s)", calls.load(Ordering::SeqCst));
    println!("\n=== Embedding Successful ===");

    Ok(())
}
