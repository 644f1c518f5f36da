//! Article sync declarations
//!
//! Article is the only entity with an engagement guard: a change to a
//! shared field only propagates when the article has been added to at least
//! one reading list. The reading-list reactions are the guard, and by
//! default they are not reindexed themselves.

use super::{EntitySync, Relation};
use crate::error::Result;
use crate::model::{EntityKind, SavedRecord};
use crate::traits::RelationQuery;

/// Article sync declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleSync {
    /// Also reindex the reading-list reactions when the guard passes
    pub reindex_reading_list_reactions: bool,
}

impl ArticleSync {
    pub fn new(reindex_reading_list_reactions: bool) -> Self {
        Self {
            reindex_reading_list_reactions,
        }
    }
}

const READING_LIST_REACTIONS: Relation = Relation::new("reactions", reading_list_reactions);

impl EntitySync for ArticleSync {
    const KIND: EntityKind = EntityKind::Article;

    const SHARED_FIELDS: &'static [&'static str] = &[
        "body_markdown",
        "organization_id",
        "path",
        "published",
        "reading_time",
        "tag_list",
        "title",
        "user_id",
    ];

    fn related_docs(&self) -> Vec<Relation> {
        if self.reindex_reading_list_reactions {
            vec![READING_LIST_REACTIONS]
        } else {
            Vec::new()
        }
    }

    fn engagement_guard(&self) -> Option<Relation> {
        Some(READING_LIST_REACTIONS)
    }

    fn visibility_field(&self) -> Option<&'static str> {
        Some("published")
    }
}

fn reading_list_reactions(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(RelationQuery::ArticleReadingListReactions {
        article_id: saved.id,
    })
}
