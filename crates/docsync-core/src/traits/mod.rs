//! Core traits for the docsync system
//!
//! This module defines the abstract interfaces that all backends must follow.
//!
//! - [`RecordSource`]: Page through the related records of a saved record
//! - [`SearchIndex`]: Index or remove search documents

pub mod record_source;
pub mod search_index;

pub use record_source::{
    PODCAST_EPISODE_TAGGABLE, READING_LIST_CATEGORY, RecordSource, RelationQuery,
};
pub use search_index::SearchIndex;
