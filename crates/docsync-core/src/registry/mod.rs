//! Post-save hook registry
//!
//! The registry is the dispatch table from [`EntityKind`] to the
//! [`SyncPolicy`] that handles saves of that kind. It is filled explicitly
//! during initialization and then handed to the engine, so which entity
//! types propagate changes is decided at start-up rather than discovered
//! at call time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsync_core::registry::PolicyRegistry;
//! use docsync_core::config::SyncConfig;
//!
//! // The four built-in entity types
//! let registry = PolicyRegistry::with_defaults(&SyncConfig::default());
//!
//! // Replace or add a policy
//! registry.register(SyncPolicy::new(EntityKind::Tag).with_shared_fields(&["name"]));
//! ```

use crate::config::SyncConfig;
use crate::model::EntityKind;
use crate::policy::{ArticleSync, EntitySync, OrganizationSync, SyncPolicy, TagSync, UserSync};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Dispatch table of sync policies keyed by entity kind
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// lookups and exclusive registration.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<EntityKind, Arc<SyncPolicy>>>,
}

impl PolicyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in Article, Organization, Tag and
    /// User policies
    pub fn with_defaults(config: &SyncConfig) -> Self {
        let registry = Self::new();
        registry.register_entity(&ArticleSync::new(
            config.article.reindex_reading_list_reactions,
        ));
        registry.register_entity(&OrganizationSync);
        registry.register_entity(&TagSync);
        registry.register_entity(&UserSync);
        registry
    }

    /// Register a policy, replacing any existing policy for its kind
    ///
    /// # Returns
    ///
    /// The replaced policy, if there was one
    pub fn register(&self, policy: SyncPolicy) -> Option<Arc<SyncPolicy>> {
        let kind = policy.kind();
        debug!(
            "Registering sync policy for {}: {} shared field(s), {} relation(s)",
            kind,
            policy.shared_fields().len(),
            policy.related_docs().len()
        );
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        policies.insert(kind, Arc::new(policy))
    }

    /// Register an entity type's declarations
    pub fn register_entity<E: EntitySync>(&self, entity: &E) -> Option<Arc<SyncPolicy>> {
        self.register(SyncPolicy::of(entity))
    }

    /// Remove the policy for `kind`
    pub fn unregister(&self, kind: EntityKind) -> Option<Arc<SyncPolicy>> {
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        policies.remove(&kind)
    }

    /// Look up the policy for `kind`
    pub fn policy(&self, kind: EntityKind) -> Option<Arc<SyncPolicy>> {
        let policies = self.policies.read().unwrap_or_else(PoisonError::into_inner);
        policies.get(&kind).cloned()
    }

    /// Check if a policy is registered for `kind`
    pub fn has_policy(&self, kind: EntityKind) -> bool {
        let policies = self.policies.read().unwrap_or_else(PoisonError::into_inner);
        policies.contains_key(&kind)
    }

    /// List registered entity kinds, sorted
    pub fn list_policies(&self) -> Vec<EntityKind> {
        let policies = self.policies.read().unwrap_or_else(PoisonError::into_inner);
        let mut kinds: Vec<_> = policies.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArticleSyncConfig;

    #[test]
    fn test_registry_registration() {
        let registry = PolicyRegistry::new();

        // Initially empty
        assert!(!registry.has_policy(EntityKind::Tag));

        // Register
        registry.register_entity(&TagSync);

        // Now present
        assert!(registry.has_policy(EntityKind::Tag));
        assert_eq!(registry.list_policies(), vec![EntityKind::Tag]);
    }

    #[test]
    fn test_defaults_cover_every_entity() {
        let registry = PolicyRegistry::with_defaults(&SyncConfig::default());
        assert_eq!(registry.list_policies(), EntityKind::ALL.to_vec());
    }

    #[test]
    fn test_register_replaces_existing_policy() {
        let registry = PolicyRegistry::with_defaults(&SyncConfig::default());

        let replaced = registry.register(SyncPolicy::new(EntityKind::Organization));
        assert!(replaced.is_some());

        let policy = registry.policy(EntityKind::Organization).unwrap();
        assert!(policy.shared_fields().is_empty());
    }

    #[test]
    fn test_article_opt_in_flows_from_config() {
        let config = SyncConfig {
            article: ArticleSyncConfig {
                reindex_reading_list_reactions: true,
            },
            ..SyncConfig::default()
        };
        let registry = PolicyRegistry::with_defaults(&config);
        let article = registry.policy(EntityKind::Article).unwrap();
        assert_eq!(article.related_docs().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = PolicyRegistry::with_defaults(&SyncConfig::default());
        assert!(registry.unregister(EntityKind::User).is_some());
        assert!(!registry.has_policy(EntityKind::User));
        assert!(registry.unregister(EntityKind::User).is_none());
    }
}
