//! Organization sync declarations

use super::{EntitySync, Relation};
use crate::error::Result;
use crate::model::{DocumentKind, EntityKind, SavedRecord};
use crate::traits::RelationQuery;

/// Organization sync declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationSync;

impl EntitySync for OrganizationSync {
    const KIND: EntityKind = EntityKind::Organization;

    const SHARED_FIELDS: &'static [&'static str] = &["name", "profile_image", "slug"];

    fn related_docs(&self) -> Vec<Relation> {
        vec![Relation::new("articles", articles)]
    }
}

fn articles(saved: &SavedRecord) -> Result<RelationQuery> {
    Ok(RelationQuery::Association {
        owner: saved.entity_ref(),
        relation: "articles",
        target: DocumentKind::Article,
    })
}
