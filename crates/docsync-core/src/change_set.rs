//! Field-level changes produced by a single save
//!
//! A [`ChangeSet`] maps each changed field name to its `[old, new]` pair.
//! It is produced by the persistence layer when a record is saved and is
//! read-only to the sync logic.
//!
//! ## Wire Format
//!
//! ```json
//! { "name": ["Old Name", "New Name"], "published": [true, false] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Old and new value of a single changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Value, Value)", into = "(Value, Value)")]
pub struct FieldChange {
    /// Value before the save
    pub old: Value,
    /// Value after the save
    pub new: Value,
}

impl From<(Value, Value)> for FieldChange {
    fn from((old, new): (Value, Value)) -> Self {
        Self { old, new }
    }
}

impl From<FieldChange> for (Value, Value) {
    fn from(change: FieldChange) -> Self {
        (change.old, change.new)
    }
}

/// The set of fields changed by one save operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<String, FieldChange>,
}

impl ChangeSet {
    /// Create an empty change set (a no-op save)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a changed field
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        old: impl Into<Value>,
        new: impl Into<Value>,
    ) -> Self {
        self.insert(field, old, new);
        self
    }

    /// Record a changed field, replacing any previous entry for it
    pub fn insert(&mut self, field: impl Into<String>, old: impl Into<Value>, new: impl Into<Value>) {
        self.changes.insert(
            field.into(),
            FieldChange {
                old: old.into(),
                new: new.into(),
            },
        );
    }

    /// Whether `field` changed in this save
    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    /// The change recorded for `field`, if any
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    /// Names of all changed fields, in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True for a no-op save
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changed fields that also appear in `fields`
    pub fn intersection<'a>(&'a self, fields: &'a [&'a str]) -> Vec<&'a str> {
        fields
            .iter()
            .copied()
            .filter(|field| self.contains(field))
            .collect()
    }

    /// Whether any changed field appears in `fields`
    ///
    /// Always false when either side is empty.
    pub fn intersects(&self, fields: &[&str]) -> bool {
        fields.iter().any(|field| self.contains(field))
    }
}

impl FromIterator<(String, FieldChange)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, FieldChange)>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}
