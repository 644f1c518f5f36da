//! Per-entity sync policies
//!
//! Each entity type declares, as data, which of its fields are shared with
//! downstream search documents and which relations hold those documents.
//! The declarations live on one [`EntitySync`] implementation per entity
//! type and are materialized into a [`SyncPolicy`] when the
//! [`PolicyRegistry`](crate::registry::PolicyRegistry) is built, so the
//! engine only ever looks policies up by [`EntityKind`].
//!
//! ## Decision Table
//!
//! ```text
//! shared field changed? ── no ──▶ skip
//!         │ yes
//! visibility field true? ── yes ──▶ index ─┐
//!         │ no                             │
//! visibility field changed? ── yes ──▶ remove
//!         │ no                             │
//!       skip                               ▼
//!                     engagement guard empty? ── yes ──▶ skip
//!                                          │ no
//!                                          ▼
//!                          apply action to every related record
//! ```
//!
//! Entities without a visibility field always index. Visibility is decided
//! before the guard so an invisible record never costs a guard query.

pub mod article;
pub mod organization;
pub mod tag;
pub mod user;

pub use article::ArticleSync;
pub use organization::OrganizationSync;
pub use tag::TagSync;
pub use user::UserSync;

use crate::change_set::ChangeSet;
use crate::error::{Error, Result};
use crate::model::{EntityKind, SavedRecord};
use crate::traits::RelationQuery;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolves a relation of a saved record into a concrete query
pub type ResolveFn = fn(&SavedRecord) -> Result<RelationQuery>;

/// A named relation and the function that resolves it
#[derive(Clone, Copy)]
pub struct Relation {
    /// Relation name, used in logs, events and reports
    pub name: &'static str,
    /// Resolver for this relation
    pub resolve: ResolveFn,
}

impl Relation {
    pub const fn new(name: &'static str, resolve: ResolveFn) -> Self {
        Self { name, resolve }
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation").field("name", &self.name).finish()
    }
}

/// Declarations one entity type makes about its search-relevant state
pub trait EntitySync {
    /// Entity type these declarations apply to
    const KIND: EntityKind;

    /// Fields whose change triggers propagation
    const SHARED_FIELDS: &'static [&'static str];

    /// Relations whose members are reindexed
    fn related_docs(&self) -> Vec<Relation>;

    /// Relation that must be non-empty for a sync to happen
    fn engagement_guard(&self) -> Option<Relation> {
        None
    }

    /// Boolean attribute that controls index vs. remove
    ///
    /// Entity types without one are always treated as visible.
    fn visibility_field(&self) -> Option<&'static str> {
        None
    }
}

/// What happens to every related record of one hook invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexAction {
    /// Push each related record into the search index
    Index,
    /// Remove each related record from the search index
    Remove,
    /// Leave related records untouched
    Skip,
}

impl fmt::Display for IndexAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexAction::Index => f.write_str("index"),
            IndexAction::Remove => f.write_str("remove"),
            IndexAction::Skip => f.write_str("skip"),
        }
    }
}

/// Materialized sync declarations for one entity type
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    kind: EntityKind,
    shared_fields: &'static [&'static str],
    related_docs: Vec<Relation>,
    engagement_guard: Option<Relation>,
    visibility_field: Option<&'static str>,
}

impl SyncPolicy {
    /// Build a policy from an entity type's declarations
    pub fn of<E: EntitySync>(entity: &E) -> Self {
        Self {
            kind: E::KIND,
            shared_fields: E::SHARED_FIELDS,
            related_docs: entity.related_docs(),
            engagement_guard: entity.engagement_guard(),
            visibility_field: entity.visibility_field(),
        }
    }

    /// Start an empty policy for `kind`
    ///
    /// An empty policy never syncs; use the `with_*` builders to declare
    /// fields and relations.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            shared_fields: &[],
            related_docs: Vec::new(),
            engagement_guard: None,
            visibility_field: None,
        }
    }

    pub fn with_shared_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.shared_fields = fields;
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.related_docs.push(relation);
        self
    }

    pub fn with_engagement_guard(mut self, relation: Relation) -> Self {
        self.engagement_guard = Some(relation);
        self
    }

    pub fn with_visibility_field(mut self, field: &'static str) -> Self {
        self.visibility_field = Some(field);
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn shared_fields(&self) -> &'static [&'static str] {
        self.shared_fields
    }

    pub fn related_docs(&self) -> &[Relation] {
        &self.related_docs
    }

    pub fn engagement_guard(&self) -> Option<&Relation> {
        self.engagement_guard.as_ref()
    }

    pub fn visibility_field(&self) -> Option<&'static str> {
        self.visibility_field
    }

    /// Whether the save touched any shared field
    pub fn shared_fields_changed(&self, changes: &ChangeSet) -> bool {
        changes.intersects(self.shared_fields)
    }

    /// Decide index vs. remove vs. skip from the saved record's visibility
    pub fn index_action(&self, saved: &SavedRecord) -> IndexAction {
        match self.visibility_field {
            None => IndexAction::Index,
            Some(field) if saved.bool_attribute(field) => IndexAction::Index,
            Some(field) if saved.changes.contains(field) => IndexAction::Remove,
            Some(_) => IndexAction::Skip,
        }
    }
}

/// Read a string attribute a relation resolver depends on
pub(crate) fn required_str<'a>(
    saved: &'a SavedRecord,
    field: &str,
    relation: &str,
) -> Result<&'a str> {
    saved.str_attribute(field).ok_or_else(|| {
        Error::relation(
            relation,
            format!("{} is missing string attribute '{}'", saved.entity_ref(), field),
        )
    })
}
