//! Configuration types for the docsync system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::model::EntityKind;
use serde::{Deserialize, Serialize};

/// Main docsync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocsyncConfig {
    /// Record source configuration
    #[serde(default)]
    pub record_source: RecordSourceConfig,

    /// Search index configuration
    #[serde(default)]
    pub search_index: SearchIndexConfig,

    /// Engine settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl DocsyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.record_source.validate()?;
        self.search_index.validate()?;
        self.sync.validate()?;
        Ok(())
    }
}

/// Record source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordSourceConfig {
    /// JSON snapshot file loaded into memory at start-up
    Snapshot {
        /// Path to the snapshot file
        path: String,
    },

    /// Empty in-memory source
    #[default]
    Memory,
}

impl RecordSourceConfig {
    /// Validate the record source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RecordSourceConfig::Snapshot { path } if path.is_empty() => Err(
                crate::Error::config("Snapshot record source path cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the record source type name
    pub fn type_name(&self) -> &'static str {
        match self {
            RecordSourceConfig::Snapshot { .. } => "snapshot",
            RecordSourceConfig::Memory => "memory",
        }
    }
}

/// Search index configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchIndexConfig {
    /// Elasticsearch document API
    Elasticsearch {
        /// Cluster base URL (e.g., "http://localhost:9200")
        url: String,
        /// Prefix prepended to every per-kind index name
        #[serde(default)]
        index_prefix: String,
        /// API key (optional)
        #[serde(default)]
        api_key: Option<String>,
    },

    /// In-memory index (not persistent)
    #[default]
    Memory,
}

impl SearchIndexConfig {
    /// Validate the search index configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SearchIndexConfig::Elasticsearch { url, .. } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Elasticsearch URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "Elasticsearch URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            SearchIndexConfig::Memory => Ok(()),
        }
    }

    /// Get the search index type name
    pub fn type_name(&self) -> &'static str {
        match self {
            SearchIndexConfig::Elasticsearch { .. } => "elasticsearch",
            SearchIndexConfig::Memory => "memory",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Records fetched per page when iterating a relation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Entity kinds whose post-save hooks are ignored
    #[serde(default)]
    pub disabled_entities: Vec<EntityKind>,

    /// Article-specific settings
    #[serde(default)]
    pub article: ArticleSyncConfig,
}

impl SyncConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.batch_size == 0 {
            return Err(crate::Error::config("Batch size must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Disable hooks for an entity kind
    pub fn with_disabled(mut self, kind: EntityKind) -> Self {
        if !self.disabled_entities.contains(&kind) {
            self.disabled_entities.push(kind);
        }
        self
    }

    pub fn is_enabled(&self, kind: EntityKind) -> bool {
        !self.disabled_entities.contains(&kind)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            event_channel_capacity: default_event_channel_capacity(),
            disabled_entities: Vec::new(),
            article: ArticleSyncConfig::default(),
        }
    }
}

/// Article-specific settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArticleSyncConfig {
    /// Reindex an article's reading-list reactions, not just use them as
    /// the sync guard
    #[serde(default)]
    pub reindex_reading_list_reactions: bool,
}

fn default_batch_size() -> usize {
    1000
}

fn default_event_channel_capacity() -> usize {
    1000
}
