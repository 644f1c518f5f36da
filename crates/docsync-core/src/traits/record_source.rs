// # Record Source Trait
//
// Defines the read side of the persistence layer as seen by the sync engine.
//
// ## Purpose
//
// The record source answers one question: "give me the next page of records
// in this relation". Every relation a sync policy declares is expressed as a
// [`RelationQuery`] and paged through [`RecordSource::fetch_batch`] using
// keyset pagination on the record id, so relation size never dictates memory
// use.
//
// ## Implementations
//
// - In-memory: `MemoryRecordStore` (tests, embedding)
// - Snapshot file: `SnapshotRecordStore` (JSON fixture loaded into memory)
// - Future: SQL-backed sources
//
// ## Usage
//
// ```rust,ignore
// use docsync_core::traits::{RecordSource, RelationQuery};
//
// let query = RelationQuery::TaggedArticles { tag_name: "rust".into() };
// let mut after = None;
// loop {
//     let batch = source.fetch_batch(&query, after, 1000).await?;
//     if batch.is_empty() { break; }
//     after = batch.last().map(|r| r.id);
// }
// ```

use crate::error::Result;
use crate::model::{DocumentKind, EntityRef, RelatedRecord};
use async_trait::async_trait;
use std::fmt;

/// Reaction category that marks a bookmark ("reading list") reaction
pub const READING_LIST_CATEGORY: &str = "readinglist";

/// Taggable type recorded on podcast episode taggings
pub const PODCAST_EPISODE_TAGGABLE: &str = "PodcastEpisode";

/// A relation of the saved record, resolved to a concrete query
///
/// Relation resolvers turn a saved record into one of these at sync time;
/// record sources execute them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationQuery {
    /// Direct association owned by a record (e.g. `organization.articles`)
    Association {
        owner: EntityRef,
        relation: &'static str,
        target: DocumentKind,
    },

    /// Articles tagged with a tag name (the cached tagged-with lookup)
    TaggedArticles { tag_name: String },

    /// Reading-list reactions on a single article
    ArticleReadingListReactions { article_id: u64 },

    /// Reading-list reactions on every article tagged with a tag name
    TaggedReadingListReactions { tag_name: String },

    /// Podcast episodes joined through the polymorphic taggings table,
    /// filtered to taggable type [`PODCAST_EPISODE_TAGGABLE`]
    TaggedPodcastEpisodes { tag_id: u64 },

    /// Podcast episodes created by a user
    UserPodcastEpisodes { user_id: u64 },
}

impl RelationQuery {
    /// Document kind every record of this query has
    pub fn target(&self) -> DocumentKind {
        match self {
            RelationQuery::Association { target, .. } => *target,
            RelationQuery::TaggedArticles { .. } => DocumentKind::Article,
            RelationQuery::ArticleReadingListReactions { .. }
            | RelationQuery::TaggedReadingListReactions { .. } => DocumentKind::Reaction,
            RelationQuery::TaggedPodcastEpisodes { .. }
            | RelationQuery::UserPodcastEpisodes { .. } => DocumentKind::PodcastEpisode,
        }
    }
}

impl fmt::Display for RelationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationQuery::Association { owner, relation, .. } => write!(f, "{}.{}", owner, relation),
            RelationQuery::TaggedArticles { tag_name } => write!(f, "articles tagged '{}'", tag_name),
            RelationQuery::ArticleReadingListReactions { article_id } => {
                write!(f, "reading list reactions on article#{}", article_id)
            }
            RelationQuery::TaggedReadingListReactions { tag_name } => {
                write!(f, "reading list reactions on articles tagged '{}'", tag_name)
            }
            RelationQuery::TaggedPodcastEpisodes { tag_id } => {
                write!(f, "podcast episodes tagged with tag#{}", tag_id)
            }
            RelationQuery::UserPodcastEpisodes { user_id } => {
                write!(f, "podcast episodes of user#{}", user_id)
            }
        }
    }
}

/// Trait for record source implementations
///
/// # Ordering
///
/// Every batch must be sorted by ascending id, and must only contain ids
/// strictly greater than `after`. The engine uses the last id of a batch as
/// the cursor for the next call and stops when a batch comes back shorter
/// than `limit`.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the next page of a relation
    ///
    /// # Parameters
    ///
    /// - `query`: The relation to page through
    /// - `after`: Exclusive lower bound on record ids (`None` for the first page)
    /// - `limit`: Maximum number of records to return
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RelatedRecord>)`: Up to `limit` records, ascending by id
    /// - `Err(Error)`: Storage error
    async fn fetch_batch(
        &self,
        query: &RelationQuery,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<RelatedRecord>>;

    /// Source name for logging
    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    #[test]
    fn test_query_targets() {
        let association = RelationQuery::Association {
            owner: EntityRef::new(EntityKind::User, 1),
            relation: "comments",
            target: DocumentKind::Comment,
        };
        assert_eq!(association.target(), DocumentKind::Comment);
        assert_eq!(association.to_string(), "user#1.comments");

        let reactions = RelationQuery::TaggedReadingListReactions {
            tag_name: "rust".to_string(),
        };
        assert_eq!(reactions.target(), DocumentKind::Reaction);
    }
}
