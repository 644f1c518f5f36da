//! Record identities shared by the policies, record sources and search indexes

use crate::change_set::ChangeSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Primary record types whose saves can trigger propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Article,
    Organization,
    Tag,
    User,
}

impl EntityKind {
    /// All entity kinds, in registration order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Article,
        EntityKind::Organization,
        EntityKind::Tag,
        EntityKind::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Article => "article",
            EntityKind::Organization => "organization",
            EntityKind::Tag => "tag",
            EntityKind::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "article" => Ok(EntityKind::Article),
            "organization" => Ok(EntityKind::Organization),
            "tag" => Ok(EntityKind::Tag),
            "user" => Ok(EntityKind::User),
            other => Err(crate::Error::invalid_input(format!(
                "Unknown entity kind: {}",
                other
            ))),
        }
    }
}

/// Search document types that can be reindexed as related records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Article,
    Reaction,
    PodcastEpisode,
    Comment,
    ChatChannelMembership,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Article => "article",
            DocumentKind::Reaction => "reaction",
            DocumentKind::PodcastEpisode => "podcast_episode",
            DocumentKind::Comment => "comment",
            DocumentKind::ChatChannelMembership => "chat_channel_membership",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a primary record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Identity of a search document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: u64,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// A record reachable from the saved record through a relation
///
/// `document` is the search representation the persistence layer produces
/// for the record; it is handed to the search index untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedRecord {
    pub kind: DocumentKind,
    pub id: u64,
    #[serde(default)]
    pub document: Value,
}

impl RelatedRecord {
    pub fn new(kind: DocumentKind, id: u64, document: Value) -> Self {
        Self { kind, id, document }
    }

    pub fn document_ref(&self) -> DocumentRef {
        DocumentRef::new(self.kind, self.id)
    }
}

/// A just-saved primary record, as handed to the post-save hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    /// Entity type of the saved record
    pub kind: EntityKind,

    /// Primary key
    pub id: u64,

    /// Attribute values after the save
    #[serde(default)]
    pub attributes: Map<String, Value>,

    /// Fields changed by the save
    #[serde(default)]
    pub changes: ChangeSet,
}

impl SavedRecord {
    pub fn new(kind: EntityKind, id: u64) -> Self {
        Self {
            kind,
            id,
            attributes: Map::new(),
            changes: ChangeSet::new(),
        }
    }

    /// Set an attribute's current value
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attach the change set produced by the save
    pub fn with_changes(mut self, changes: ChangeSet) -> Self {
        self.changes = changes;
        self
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind, self.id)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String attribute, or `None` when absent or not a string
    pub fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Boolean attribute; absent or non-boolean values read as `false`
    pub fn bool_attribute(&self, name: &str) -> bool {
        self.attribute(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_saved_record_deserializes_from_hook_payload() {
        let saved: SavedRecord = serde_json::from_value(json!({
            "kind": "organization",
            "id": 7,
            "attributes": { "name": "Acme" },
            "changes": { "name": ["Old", "Acme"] }
        }))
        .unwrap();

        assert_eq!(saved.entity_ref(), EntityRef::new(EntityKind::Organization, 7));
        assert_eq!(saved.str_attribute("name"), Some("Acme"));
        assert!(saved.changes.contains("name"));
        assert!(!saved.bool_attribute("published"));
    }

    #[test]
    fn test_entity_kind_parsing() {
        assert_eq!("Tag".parse::<EntityKind>().unwrap(), EntityKind::Tag);
        assert!("podcast".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_document_ref_display() {
        let doc = DocumentRef::new(DocumentKind::PodcastEpisode, 12);
        assert_eq!(doc.to_string(), "podcast_episode#12");
    }
}
