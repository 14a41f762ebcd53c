//! Scheduler event handling.
//!
//! The scheduler is responsible for:
//! - Dispatching each resource-manager event to its handler
//! - Running a reconciliation pass for every offer batch
//! - Releasing registry slots when tasks reach a terminal state
//! - Persisting the framework identity on registration
//!
//! Events are processed one at a time by [`SchedulerWorker`].

mod dispatcher;
mod worker;

use std::collections::BTreeMap;

use fleet_id::GroupKey;
use fleet_reconcile::{MemoryRegistry, ReconcileError};
use tracing::info;

use crate::store::{StateStore, StateStoreError};

pub use dispatcher::Scheduler;
pub use worker::SchedulerWorker;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur while handling an event.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("state store error: {0}")]
    Store(#[from] StateStoreError),
}

/// Build the registry from stored desired counts, with `overrides` taking
/// precedence. Overrides are written back so the store stays authoritative
/// across restarts.
pub fn seed_registry(
    store: &StateStore,
    overrides: &BTreeMap<GroupKey, u32>,
) -> Result<MemoryRegistry, StateStoreError> {
    let mut requirements = store.requirements()?;

    for (group, desired) in overrides {
        store.set_requirement(group, *desired)?;
        requirements.insert(group.clone(), *desired);
    }

    let mut registry = MemoryRegistry::new();
    for (group, desired) in requirements {
        info!(group = %group, desired, "Loaded group requirement");
        registry.set_desired(group, desired);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_registry_overrides_win() {
        let store = StateStore::open_in_memory().unwrap();
        let a = GroupKey::parse("http://es-a:9200").unwrap();
        let b = GroupKey::parse("http://es-b:9200").unwrap();
        store.set_requirement(&a, 4).unwrap();
        store.set_requirement(&b, 1).unwrap();

        let overrides = BTreeMap::from([(a.clone(), 2)]);
        let registry = seed_registry(&store, &overrides).unwrap();

        assert_eq!(registry.desired(&a), Some(2));
        assert_eq!(registry.desired(&b), Some(1));
        assert_eq!(store.requirements().unwrap()[&a], 2);
    }

    #[test]
    fn test_seed_registry_empty() {
        let store = StateStore::open_in_memory().unwrap();
        let registry = seed_registry(&store, &BTreeMap::new()).unwrap();
        assert!(registry.groups().is_empty());
    }
}
