// # Record Snapshot
//
// Serializable picture of the records the sync engine reads: search
// documents, direct associations, and polymorphic taggings.
//
// ## Purpose
//
// A snapshot seeds a `MemoryRecordStore`, either from a JSON file (daemon,
// fixtures) or from the builder methods below (tests, embedding).
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "documents": [
//     { "kind": "article", "id": 1, "document": { "title": "Hello" } }
//   ],
//   "associations": [
//     { "owner": { "kind": "organization", "id": 7 }, "relation": "articles", "ids": [1] }
//   ],
//   "taggings": [
//     { "tag_id": 3, "tag_name": "rust", "taggable_type": "Article", "taggable_id": 1 }
//   ]
// }
// ```

use crate::Error;
use crate::model::{DocumentKind, EntityRef, RelatedRecord};
use crate::traits::{PODCAST_EPISODE_TAGGABLE, READING_LIST_CATEGORY};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Snapshot file format version
pub const SNAPSHOT_FILE_VERSION: &str = "1.0";

/// Taggable type recorded on article taggings
pub const ARTICLE_TAGGABLE: &str = "Article";

/// Direct association from an owner to target records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub owner: EntityRef,
    pub relation: String,
    pub ids: Vec<u64>,
}

/// Row of the polymorphic taggings table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tagging {
    pub tag_id: u64,
    pub tag_name: String,
    pub taggable_type: String,
    pub taggable_id: u64,
}

impl Tagging {
    pub fn article(tag_id: u64, tag_name: impl Into<String>, article_id: u64) -> Self {
        Self {
            tag_id,
            tag_name: tag_name.into(),
            taggable_type: ARTICLE_TAGGABLE.to_string(),
            taggable_id: article_id,
        }
    }

    pub fn podcast_episode(tag_id: u64, tag_name: impl Into<String>, episode_id: u64) -> Self {
        Self {
            tag_id,
            tag_name: tag_name.into(),
            taggable_type: PODCAST_EPISODE_TAGGABLE.to_string(),
            taggable_id: episode_id,
        }
    }
}

/// Serializable record snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub documents: Vec<RelatedRecord>,
    #[serde(default)]
    pub associations: Vec<Association>,
    #[serde(default)]
    pub taggings: Vec<Tagging>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: default_version(),
            documents: Vec::new(),
            associations: Vec::new(),
            taggings: Vec::new(),
        }
    }
}

fn default_version() -> String {
    SNAPSHOT_FILE_VERSION.to_string()
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a search document
    pub fn with_document(mut self, kind: DocumentKind, id: u64, document: Value) -> Self {
        self.documents.push(RelatedRecord::new(kind, id, document));
        self
    }

    /// Add a direct association
    pub fn with_association(
        mut self,
        owner: EntityRef,
        relation: impl Into<String>,
        ids: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.associations.push(Association {
            owner,
            relation: relation.into(),
            ids: ids.into_iter().collect(),
        });
        self
    }

    /// Add a tagging row
    pub fn with_tagging(mut self, tagging: Tagging) -> Self {
        self.taggings.push(tagging);
        self
    }

    /// Add a reaction document on an article
    pub fn with_reaction(mut self, id: u64, article_id: u64, category: &str) -> Self {
        self.documents.push(RelatedRecord::new(
            DocumentKind::Reaction,
            id,
            json!({
                "category": category,
                "reactable_type": ARTICLE_TAGGABLE,
                "reactable_id": article_id,
            }),
        ));
        self
    }

    /// Add a reading-list reaction on an article
    pub fn with_reading_list_reaction(self, id: u64, article_id: u64) -> Self {
        self.with_reaction(id, article_id, READING_LIST_CATEGORY)
    }

    /// Load a snapshot from a JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::record_source(format!("Failed to read snapshot {}: {}", path.display(), e))
        })?;

        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            Error::record_source(format!("Corrupt snapshot {}: {}", path.display(), e))
        })?;

        if snapshot.version != SNAPSHOT_FILE_VERSION {
            return Err(Error::record_source(format!(
                "Unsupported snapshot version {} in {} (expected {})",
                snapshot.version,
                path.display(),
                SNAPSHOT_FILE_VERSION
            )));
        }

        info!(
            "Loaded snapshot {}: {} document(s), {} association(s), {} tagging(s)",
            path.display(),
            snapshot.documents.len(),
            snapshot.associations.len(),
            snapshot.taggings.len()
        );
        Ok(snapshot)
    }
}
