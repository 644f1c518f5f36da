// # docsync-core
//
// Core library for propagating record changes to related search documents.
//
// ## Architecture Overview
//
// After a primary record (article, organization, tag, user) is saved, the
// search documents that embed its fields may be stale. This library decides
// whether they are, finds them, and reindexes or removes them:
// - **ChangeSet**: Fields changed by one save, with old and new values
// - **EntitySync / SyncPolicy**: Per-entity shared fields and relations
// - **PolicyRegistry**: Dispatch table from entity kind to policy
// - **RecordSource**: Batch-paged access to related records
// - **SearchIndex**: Index / remove operations on the search backend
// - **SyncEngine**: The post-save entry point tying these together
//
// ## Design Principles
//
// 1. **Declarative policies**: Entity types declare fields and relations as data
// 2. **Explicit wiring**: Policies and backends are injected at start-up
// 3. **Bounded memory**: Relations are always paged, never loaded whole
// 4. **Contained failures**: One relation's failure never blocks another, or the save

pub mod change_set;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod policy;
pub mod registry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use change_set::{ChangeSet, FieldChange};
pub use config::{DocsyncConfig, RecordSourceConfig, SearchIndexConfig, SyncConfig};
pub use engine::{SyncEngine, SyncEvent, SyncReport};
pub use error::{Error, Result};
pub use model::{DocumentKind, DocumentRef, EntityKind, EntityRef, RelatedRecord, SavedRecord};
pub use policy::{EntitySync, IndexAction, SyncPolicy};
pub use registry::PolicyRegistry;
pub use store::{MemoryRecordStore, MemorySearchIndex, Snapshot};
pub use traits::{RecordSource, RelationQuery, SearchIndex};
