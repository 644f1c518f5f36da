//! Tag sync declarations
//!
//! Tags own no documents directly. Articles are found through the
//! tagged-with lookup on the tag's current name, reactions through those
//! articles, and podcast episodes through the polymorphic taggings table.

use super::{EntitySync, Relation, required_str};
use crate::error::Result;
use crate::model::{EntityKind, SavedRecord};
use crate::traits::RelationQuery;

/// Tag sync declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSync;

impl EntitySync for TagSync {
    const KIND: EntityKind = EntityKind::Tag;

    const SHARED_FIELDS: &'static [&'static str] = &["keywords_for_search", "name"];

    fn related_docs(&self) -> Vec<Relation> {
        vec![
            Relation::new("articles", articles),
            Relation::new("reactions", reactions),
            Relation::new("podcast_episodes", podcast_episodes),
        ]
    }
}

fn articles(saved: &SavedRecord) -> Result<RelationQuery> {
    let tag_name = required_str(saved, "name", "articles")?;
    Ok(RelationQuery::TaggedArticles {
        tag_name: tag_name.to_string(),
    })
}

fn reactions(saved: &SavedRecord) -> Result<RelationQuery> {
    let tag_name = required_str(saved, "name", "reactions")?;
    Ok(RelationQuery::TaggedReadingListReactions {
        tag_name: tag_name.to_string(),
    })
}

fn podcast_episodes(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(RelationQuery::TaggedPodcastEpisodes { tag_id: saved.id })
}
