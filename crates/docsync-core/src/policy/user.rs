//! User sync declarations

use super::{EntitySync, Relation};
use crate::error::Result;
use crate::model::{DocumentKind, EntityKind, SavedRecord};
use crate::traits::RelationQuery;

/// User sync declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct UserSync;

impl EntitySync for UserSync {
    const KIND: EntityKind = EntityKind::User;

    const SHARED_FIELDS: &'static [&'static str] = &["name", "profile_image", "username"];

    fn related_docs(&self) -> Vec<Relation> {
        vec![
            Relation::new("articles", articles),
            Relation::new("podcast_episodes", podcast_episodes),
            Relation::new("chat_channel_memberships", chat_channel_memberships),
            Relation::new("comments", comments),
        ]
    }
}

fn association(saved: &SavedRecord, relation: &'static str, target: DocumentKind) -> RelationQuery {
    RelationQuery::Association {
        owner: saved.entity_ref(),
        relation,
        target,
    }
}

fn articles(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(association(saved, "articles", DocumentKind::Article))
}

fn podcast_episodes(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(RelationQuery::UserPodcastEpisodes { user_id: saved.id })
}

fn chat_channel_memberships(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(association(
        saved,
        "chat_channel_memberships",
        DocumentKind::ChatChannelMembership,
    ))
}

fn comments(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(association(saved, "comments", DocumentKind::Comment))
}
