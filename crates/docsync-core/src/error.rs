//! Error types for the docsync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for docsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the docsync system
#[derive(Error, Debug)]
pub enum Error {
    /// Record source (persistence layer) errors
    #[error("Record source error: {0}")]
    RecordSource(String),

    /// Search index errors
    #[error("Search index error: {0}")]
    SearchIndex(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (snapshot files, stdin)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A relation could not be resolved for the saved record
    #[error("Cannot resolve relation '{relation}': {message}")]
    Relation {
        /// Relation name
        relation: String,
        /// Error message
        message: String,
    },

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend-specific error
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a record source error
    pub fn record_source(msg: impl Into<String>) -> Self {
        Self::RecordSource(msg.into())
    }

    /// Create a search index error
    pub fn search_index(msg: impl Into<String>) -> Self {
        Self::SearchIndex(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a relation resolution error
    pub fn relation(relation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Relation {
            relation: relation.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a backend-specific error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
