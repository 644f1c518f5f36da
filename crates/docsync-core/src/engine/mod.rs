//! Core sync engine
//!
//! The SyncEngine is the single post-save entry point for every entity
//! type. For one saved record it:
//! - Looks up the entity's policy in the registry
//! - Decides whether a sync is needed from the change set
//! - Evaluates the entity's engagement guard, if it declares one
//! - Pages through each related relation and indexes or removes every record
//!
//! ## Architecture
//!
//! ```text
//!   SavedRecord (post-save hook)
//!          │
//!          ▼
//!  ┌──────────────┐   policy    ┌────────────────┐
//!  │  SyncEngine  │◀────────────│ PolicyRegistry │
//!  └──────────────┘             └────────────────┘
//!          │
//!          ├──────────────────────────┬──────────────────────────┐
//!          ▼                          ▼                          ▼
//!  ┌──────────────┐           ┌──────────────┐           ┌─────────────┐
//!  │ RecordSource │           │ SearchIndex  │           │   Events    │
//!  │ (batches)    │           │ (index/rm)   │           │  (notify)   │
//!  └──────────────┘           └──────────────┘           └─────────────┘
//! ```
//!
//! ## Error Boundaries
//!
//! Each relation is propagated inside its own error boundary. A failure
//! stops that relation only; it is logged, emitted as an event and recorded
//! in the [`SyncReport`]. `after_save` itself never fails, so a sync problem
//! can never abort the save that triggered it.

pub mod batch;
pub mod report;

pub use batch::{RelationBatches, relation_has_records};
pub use report::{RelationFailure, RelationReport, SkipReason, SyncOutcome, SyncReport};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::{EntityRef, RelatedRecord, SavedRecord};
use crate::policy::{IndexAction, Relation, SyncPolicy};
use crate::registry::PolicyRegistry;
use crate::traits::{RecordSource, SearchIndex};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Hook invocation ended without touching related records
    Skipped {
        entity: EntityRef,
        reason: SkipReason,
    },

    /// Propagation started
    Started {
        entity: EntityRef,
        action: IndexAction,
        relations: usize,
    },

    /// One relation fully propagated
    RelationSynced {
        entity: EntityRef,
        relation: &'static str,
        action: IndexAction,
        documents: usize,
    },

    /// One relation stopped on an error
    RelationFailed {
        entity: EntityRef,
        relation: &'static str,
        error: String,
    },

    /// Propagation finished (possibly with failed relations)
    Completed {
        entity: EntityRef,
        documents: usize,
        failures: usize,
    },

    /// Replay loop stopped
    Stopped { reason: String },
}

/// Counters for a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Saved records handled
    pub processed: usize,
    /// Records whose related documents were propagated
    pub synced: usize,
    /// Records skipped by the sync decision
    pub skipped: usize,
    /// Records with at least one failed relation
    pub failed: usize,
    /// Documents indexed or removed
    pub documents: usize,
}

impl RunSummary {
    fn record(&mut self, report: &SyncReport) {
        self.processed += 1;
        if report.is_skipped() {
            self.skipped += 1;
        } else {
            self.synced += 1;
        }
        if !report.is_success() {
            self.failed += 1;
        }
        self.documents += report.documents_touched();
    }
}

enum Decision {
    Skip(SkipReason),
    Sync(Arc<SyncPolicy>, IndexAction),
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Build a [`PolicyRegistry`] and the record source / search index
/// 2. Create with [`SyncEngine::new()`]
/// 3. Call [`SyncEngine::after_save()`] from the persistence layer's
///    post-save hook, or feed a stream to [`SyncEngine::run()`]
///
/// ## Threading
///
/// One invocation is fully sequential: relations in declaration order,
/// pages in cursor order, records in page order.
pub struct SyncEngine {
    /// Dispatch table of entity policies
    registry: Arc<PolicyRegistry>,

    /// Persistence layer read side
    source: Box<dyn RecordSource>,

    /// Search backend
    index: Box<dyn SearchIndex>,

    /// Engine settings
    config: SyncConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `registry`: Entity policies, filled during initialization
    /// - `source`: Record source implementation
    /// - `index`: Search index implementation
    /// - `config`: Engine configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        registry: Arc<PolicyRegistry>,
        source: Box<dyn RecordSource>,
        index: Box<dyn SearchIndex>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            registry,
            source,
            index,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Handle the post-save of a record
    ///
    /// Never fails: every error is contained in a relation's error boundary
    /// and reported in the returned [`SyncReport`].
    pub async fn after_save(&self, saved: &SavedRecord) -> SyncReport {
        let entity = saved.entity_ref();
        let mut report = SyncReport::begin(entity);

        let (policy, action) = match self.decide(saved, &mut report).await {
            Decision::Skip(reason) => {
                debug!("Skipping sync for {}: {}", entity, reason);
                self.emit_event(SyncEvent::Skipped { entity, reason });
                return report.finish(SyncOutcome::Skipped(reason));
            }
            Decision::Sync(policy, action) => (policy, action),
        };

        debug!(
            "Syncing {} ({}): changed [{}], {} relation(s)",
            entity,
            action,
            saved.changes.intersection(policy.shared_fields()).join(", "),
            policy.related_docs().len()
        );
        self.emit_event(SyncEvent::Started {
            entity,
            action,
            relations: policy.related_docs().len(),
        });

        for relation in policy.related_docs() {
            let mut progress = RelationReport {
                relation: relation.name,
                documents: 0,
                batches: 0,
            };

            match self.propagate(saved, relation, action, &mut progress).await {
                Ok(()) => {
                    info!(
                        "Synced {}.{}: {} document(s) {} in {} batch(es)",
                        entity,
                        relation.name,
                        progress.documents,
                        past_tense(action),
                        progress.batches
                    );
                    self.emit_event(SyncEvent::RelationSynced {
                        entity,
                        relation: relation.name,
                        action,
                        documents: progress.documents,
                    });
                    report.relations.push(progress);
                }
                Err(e) => {
                    error!(
                        "Failed to sync {}.{} after {} document(s): {}",
                        entity, relation.name, progress.documents, e
                    );
                    self.emit_event(SyncEvent::RelationFailed {
                        entity,
                        relation: relation.name,
                        error: e.to_string(),
                    });
                    report.failures.push(RelationFailure {
                        relation: relation.name,
                        error: e.to_string(),
                        documents: progress.documents,
                    });
                }
            }
        }

        let report = report.finish(SyncOutcome::Synced(action));
        self.emit_event(SyncEvent::Completed {
            entity,
            documents: report.documents_touched(),
            failures: report.failures.len(),
        });
        report
    }

    /// Decide whether this save needs propagating, and how
    async fn decide(&self, saved: &SavedRecord, report: &mut SyncReport) -> Decision {
        if !self.config.is_enabled(saved.kind) {
            return Decision::Skip(SkipReason::Disabled);
        }

        let Some(policy) = self.registry.policy(saved.kind) else {
            return Decision::Skip(SkipReason::NoPolicy);
        };

        if !policy.shared_fields_changed(&saved.changes) {
            return Decision::Skip(SkipReason::NoSharedFieldChanged);
        }

        let action = policy.index_action(saved);
        if action == IndexAction::Skip {
            return Decision::Skip(SkipReason::NotVisible);
        }

        if let Some(guard) = policy.engagement_guard() {
            match self.guard_passes(saved, guard).await {
                Ok(true) => {}
                Ok(false) => return Decision::Skip(SkipReason::NoEngagement),
                Err(e) => {
                    let entity = saved.entity_ref();
                    error!(
                        "Failed to evaluate engagement guard {}.{}: {}",
                        entity, guard.name, e
                    );
                    self.emit_event(SyncEvent::RelationFailed {
                        entity,
                        relation: guard.name,
                        error: e.to_string(),
                    });
                    report.failures.push(RelationFailure {
                        relation: guard.name,
                        error: e.to_string(),
                        documents: 0,
                    });
                    return Decision::Skip(SkipReason::GuardFailed);
                }
            }
        }

        Decision::Sync(policy, action)
    }

    async fn guard_passes(&self, saved: &SavedRecord, guard: &Relation) -> Result<bool> {
        let query = (guard.resolve)(saved)?;
        relation_has_records(self.source.as_ref(), &query).await
    }

    /// Propagate one relation, page by page
    async fn propagate(
        &self,
        saved: &SavedRecord,
        relation: &Relation,
        action: IndexAction,
        progress: &mut RelationReport,
    ) -> Result<()> {
        let query = (relation.resolve)(saved)?;
        let mut batches = RelationBatches::new(self.source.as_ref(), &query, self.config.batch_size);

        while let Some(batch) = batches.next_batch().await? {
            progress.batches += 1;
            for record in &batch {
                self.dispatch(record, action).await?;
                progress.documents += 1;
            }
        }

        Ok(())
    }

    /// Hand one related record to the search index
    async fn dispatch(&self, record: &RelatedRecord, action: IndexAction) -> Result<()> {
        match action {
            IndexAction::Index => self.index.index_document(record).await,
            IndexAction::Remove => self.index.remove_document(&record.document_ref()).await,
            IndexAction::Skip => Ok(()),
        }
    }

    /// Run the engine over a stream of saved records
    ///
    /// Records are handled one at a time until the stream ends or a
    /// SIGINT is received.
    pub async fn run<S>(&self, records: S) -> Result<RunSummary>
    where
        S: Stream<Item = SavedRecord> + Unpin,
    {
        self.run_internal(records, None).await
    }

    /// Run the engine with a controlled shutdown signal
    ///
    /// Used by embedders (and tests) that own their shutdown sequence
    /// instead of relying on SIGINT.
    pub async fn run_with_shutdown<S>(
        &self,
        records: S,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<RunSummary>
    where
        S: Stream<Item = SavedRecord> + Unpin,
    {
        self.run_internal(records, shutdown_rx).await
    }

    async fn run_internal<S>(
        &self,
        mut records: S,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<RunSummary>
    where
        S: Stream<Item = SavedRecord> + Unpin,
    {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for SIGINT: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut summary = RunSummary::default();
        let reason = loop {
            tokio::select! {
                next = records.next() => match next {
                    Some(saved) => {
                        let report = self.after_save(&saved).await;
                        summary.record(&report);
                    }
                    None => break "End of stream",
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break "Shutdown signal";
                }
            }
        };

        info!(
            "Sync loop stopped ({}): {} processed, {} synced, {} skipped, {} failed",
            reason, summary.processed, summary.synced, summary.skipped, summary.failed
        );
        self.emit_event(SyncEvent::Stopped {
            reason: reason.to_string(),
        });

        Ok(summary)
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

fn past_tense(action: IndexAction) -> &'static str {
    match action {
        IndexAction::Index => "indexed",
        IndexAction::Remove => "removed",
        IndexAction::Skip => "skipped",
    }
}
