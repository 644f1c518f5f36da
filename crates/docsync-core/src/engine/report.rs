//! Per-invocation outcome of a post-save hook

use crate::model::EntityRef;
use crate::policy::IndexAction;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Why a hook invocation did not touch any related record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Entity kind disabled in configuration
    Disabled,
    /// No policy registered for the entity kind
    NoPolicy,
    /// No shared field in the change set
    NoSharedFieldChanged,
    /// Not visible, and visibility did not change in this save
    NotVisible,
    /// The engagement guard relation is empty
    NoEngagement,
    /// The engagement guard could not be evaluated
    GuardFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Disabled => "entity kind disabled",
            SkipReason::NoPolicy => "no sync policy registered",
            SkipReason::NoSharedFieldChanged => "no shared field changed",
            SkipReason::NotVisible => "not visible and visibility unchanged",
            SkipReason::NoEngagement => "engagement guard is empty",
            SkipReason::GuardFailed => "engagement guard failed",
        };
        f.write_str(reason)
    }
}

/// Decision taken for one hook invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Synced(IndexAction),
}

/// Documents handled by one relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationReport {
    pub relation: &'static str,
    pub documents: usize,
    pub batches: usize,
}

/// A relation whose propagation stopped on an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationFailure {
    pub relation: &'static str,
    pub error: String,
    /// Documents handled before the error
    pub documents: usize,
}

/// Outcome of one post-save hook invocation
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub entity: EntityRef,
    pub outcome: SyncOutcome,
    pub relations: Vec<RelationReport>,
    pub failures: Vec<RelationFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub(crate) fn begin(entity: EntityRef) -> Self {
        let now = Utc::now();
        Self {
            entity,
            outcome: SyncOutcome::Skipped(SkipReason::NoPolicy),
            relations: Vec::new(),
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(mut self, outcome: SyncOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Utc::now();
        self
    }

    /// True when no relation failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Skipped(_))
    }

    /// Total documents indexed or removed, including those handled before a
    /// relation failed
    pub fn documents_touched(&self) -> usize {
        self.relations.iter().map(|r| r.documents).sum::<usize>()
            + self.failures.iter().map(|f| f.documents).sum::<usize>()
    }

    /// Documents handled by a relation that completed
    pub fn documents_for(&self, relation: &str) -> Option<usize> {
        self.relations
            .iter()
            .find(|r| r.relation == relation)
            .map(|r| r.documents)
    }
}
