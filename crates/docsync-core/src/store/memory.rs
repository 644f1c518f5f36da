// # Memory Record Store
//
// In-memory implementation of RecordSource.
//
// ## Purpose
//
// Holds search documents, direct associations and taggings in memory and
// answers every `RelationQuery` against them. Seeded from a `Snapshot`
// (file or builder) and mutable at runtime.
//
// ## Query Semantics
//
// - Association: ids listed for `(owner, relation)`, restricted to existing
//   documents of the query's target kind
// - Tagged articles: article taggings whose tag name matches
// - Reading-list reactions: reaction documents with category `readinglist`
//   on an `Article` reactable
// - Tagged podcast episodes: taggings with taggable type `PodcastEpisode`
// - User podcast episodes: podcast episode documents whose `creator_id`
//   is the user

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::snapshot::{ARTICLE_TAGGABLE, Association, Snapshot, Tagging};
use crate::Error;
use crate::model::{DocumentKind, DocumentRef, EntityRef, RelatedRecord};
use crate::traits::{PODCAST_EPISODE_TAGGABLE, READING_LIST_CATEGORY, RecordSource, RelationQuery};

#[derive(Debug, Default)]
struct StoreData {
    documents: BTreeMap<DocumentRef, Value>,
    associations: HashMap<(EntityRef, String), BTreeSet<u64>>,
    taggings: Vec<Tagging>,
}

impl StoreData {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut data = Self::default();
        for record in snapshot.documents {
            data.documents.insert(record.document_ref(), record.document);
        }
        for Association { owner, relation, ids } in snapshot.associations {
            data.associations
                .entry((owner, relation))
                .or_default()
                .extend(ids);
        }
        data.taggings = snapshot.taggings;
        data
    }

    fn tagged_ids(&self, taggable_type: &str, matches: impl Fn(&Tagging) -> bool) -> BTreeSet<u64> {
        self.taggings
            .iter()
            .filter(|t| t.taggable_type == taggable_type && matches(t))
            .map(|t| t.taggable_id)
            .collect()
    }

    fn reading_list_reaction_ids(&self, article_ids: &BTreeSet<u64>) -> BTreeSet<u64> {
        self.documents
            .iter()
            .filter(|(doc, _)| doc.kind == DocumentKind::Reaction)
            .filter(|(_, document)| {
                document["category"] == READING_LIST_CATEGORY
                    && document["reactable_type"] == ARTICLE_TAGGABLE
                    && document["reactable_id"]
                        .as_u64()
                        .is_some_and(|id| article_ids.contains(&id))
            })
            .map(|(doc, _)| doc.id)
            .collect()
    }

    fn matching_ids(&self, query: &RelationQuery) -> BTreeSet<u64> {
        match query {
            RelationQuery::Association { owner, relation, .. } => self
                .associations
                .get(&(*owner, relation.to_string()))
                .cloned()
                .unwrap_or_default(),
            RelationQuery::TaggedArticles { tag_name } => {
                self.tagged_ids(ARTICLE_TAGGABLE, |t| &t.tag_name == tag_name)
            }
            RelationQuery::ArticleReadingListReactions { article_id } => {
                self.reading_list_reaction_ids(&BTreeSet::from([*article_id]))
            }
            RelationQuery::TaggedReadingListReactions { tag_name } => {
                let articles = self.tagged_ids(ARTICLE_TAGGABLE, |t| &t.tag_name == tag_name);
                self.reading_list_reaction_ids(&articles)
            }
            RelationQuery::TaggedPodcastEpisodes { tag_id } => {
                self.tagged_ids(PODCAST_EPISODE_TAGGABLE, |t| t.tag_id == *tag_id)
            }
            RelationQuery::UserPodcastEpisodes { user_id } => self
                .documents
                .iter()
                .filter(|(doc, document)| {
                    doc.kind == DocumentKind::PodcastEpisode
                        && document["creator_id"].as_u64() == Some(*user_id)
                })
                .map(|(doc, _)| doc.id)
                .collect(),
        }
    }
}

/// In-memory record store
///
/// Clones share the same underlying data.
///
/// # Example
///
/// ```rust,no_run
/// use docsync_core::model::{DocumentKind, EntityKind, EntityRef};
/// use docsync_core::store::{MemoryRecordStore, Snapshot};
/// use serde_json::json;
///
/// let store = MemoryRecordStore::from_snapshot(
///     Snapshot::new()
///         .with_document(DocumentKind::Article, 1, json!({ "title": "Hello" }))
///         .with_association(EntityRef::new(EntityKind::Organization, 7), "articles", [1]),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<StoreData>>,
}

impl MemoryRecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreData::from_snapshot(snapshot))),
        }
    }

    /// Create a store seeded from a snapshot file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::from_snapshot(Snapshot::load(path).await?))
    }

    /// Export the current contents
    pub async fn snapshot(&self) -> Snapshot {
        let guard = self.inner.read().await;
        let mut associations: Vec<_> = guard
            .associations
            .iter()
            .map(|((owner, relation), ids)| Association {
                owner: *owner,
                relation: relation.clone(),
                ids: ids.iter().copied().collect(),
            })
            .collect();
        associations.sort_by(|a, b| (a.owner, &a.relation).cmp(&(b.owner, &b.relation)));

        Snapshot {
            documents: guard
                .documents
                .iter()
                .map(|(doc, document)| RelatedRecord::new(doc.kind, doc.id, document.clone()))
                .collect(),
            associations,
            taggings: guard.taggings.clone(),
            ..Snapshot::default()
        }
    }

    /// Insert or replace a search document
    pub async fn insert_document(&self, kind: DocumentKind, id: u64, document: Value) {
        let mut guard = self.inner.write().await;
        guard.documents.insert(DocumentRef::new(kind, id), document);
    }

    /// Remove a search document
    pub async fn remove_document(&self, document: &DocumentRef) -> Option<Value> {
        let mut guard = self.inner.write().await;
        guard.documents.remove(document)
    }

    /// Add ids to a direct association
    pub async fn associate(
        &self,
        owner: EntityRef,
        relation: impl Into<String>,
        ids: impl IntoIterator<Item = u64>,
    ) {
        let mut guard = self.inner.write().await;
        guard
            .associations
            .entry((owner, relation.into()))
            .or_default()
            .extend(ids);
    }

    /// Add a tagging row
    pub async fn add_tagging(&self, tagging: Tagging) {
        let mut guard = self.inner.write().await;
        guard.taggings.push(tagging);
    }

    /// Get the number of documents in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.documents.is_empty()
    }
}

#[async_trait]
impl RecordSource for MemoryRecordStore {
    async fn fetch_batch(
        &self,
        query: &RelationQuery,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>, Error> {
        let guard = self.inner.read().await;
        let target = query.target();
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);

        Ok(guard
            .matching_ids(query)
            .range((lower, Bound::Unbounded))
            .filter_map(|id| {
                let doc = DocumentRef::new(target, *id);
                guard
                    .documents
                    .get(&doc)
                    .map(|document| RelatedRecord::new(target, *id, document.clone()))
            })
            .take(limit)
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "memory"
    }
}
