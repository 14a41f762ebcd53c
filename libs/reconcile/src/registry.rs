//! Group registry: desired counts and running task sets.

use std::collections::{BTreeMap, HashMap};

use fleet_id::{GroupKey, TaskId};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No desired count was ever set for the group.
    #[error("unknown group: {0}")]
    UnknownGroup(GroupKey),

    /// The task id is already tracked.
    #[error("task {task_id} already registered under {group}")]
    DuplicateTask { task_id: TaskId, group: GroupKey },
}

/// Source of truth for desired counts and running tasks per group.
pub trait GroupRegistry {
    /// Desired minus running for every known group, computed fresh.
    fn deltas(&self) -> BTreeMap<GroupKey, i64>;

    /// Add a task to a group's running set.
    fn register_task(&mut self, group: &GroupKey, task_id: TaskId) -> Result<(), RegistryError>;

    /// Remove a task from whichever group holds it. Returns that group, or
    /// `None` (and changes nothing) if the task is not tracked.
    fn unregister_task(&mut self, task_id: &TaskId) -> Option<GroupKey>;

    /// Most recently registered task of the group still running.
    fn youngest_task(&self, group: &GroupKey) -> Option<TaskId>;
}

/// Snapshot of one group for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub group: GroupKey,
    pub desired: u32,
    pub running: usize,
    pub delta: i64,
    /// Oldest first.
    pub tasks: Vec<TaskId>,
}

#[derive(Debug, Default, Clone)]
struct GroupEntry {
    desired: u32,
    /// Registration order; the last element is the youngest.
    running: Vec<TaskId>,
}

impl GroupEntry {
    fn delta(&self) -> i64 {
        i64::from(self.desired) - self.running.len() as i64
    }
}

/// In-memory registry.
///
/// Single-writer: callers serialize access (one event at a time, or a lock
/// held for a whole reconciliation pass).
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    groups: BTreeMap<GroupKey, GroupEntry>,
    owners: HashMap<TaskId, GroupKey>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a group's desired count, creating the group if needed. Returns the
    /// previous desired count.
    ///
    /// Groups are never removed: a group set to zero keeps its entry so its
    /// remaining tasks get killed.
    pub fn set_desired(&mut self, group: GroupKey, desired: u32) -> Option<u32> {
        debug!(group = %group, desired, "Setting desired count");
        match self.groups.get_mut(&group) {
            Some(entry) => Some(std::mem::replace(&mut entry.desired, desired)),
            None => {
                self.groups.insert(
                    group,
                    GroupEntry {
                        desired,
                        running: Vec::new(),
                    },
                );
                None
            }
        }
    }

    pub fn desired(&self, group: &GroupKey) -> Option<u32> {
        self.groups.get(group).map(|e| e.desired)
    }

    /// Running tasks of a group, oldest first.
    pub fn running(&self, group: &GroupKey) -> &[TaskId] {
        self.groups
            .get(group)
            .map(|e| e.running.as_slice())
            .unwrap_or(&[])
    }

    pub fn group_of(&self, task_id: &TaskId) -> Option<&GroupKey> {
        self.owners.get(task_id)
    }

    pub fn total_running(&self) -> usize {
        self.owners.len()
    }

    pub fn groups(&self) -> Vec<GroupSummary> {
        self.groups
            .iter()
            .map(|(group, entry)| GroupSummary {
                group: group.clone(),
                desired: entry.desired,
                running: entry.running.len(),
                delta: entry.delta(),
                tasks: entry.running.clone(),
            })
            .collect()
    }
}

impl GroupRegistry for MemoryRegistry {
    fn deltas(&self) -> BTreeMap<GroupKey, i64> {
        self.groups
            .iter()
            .map(|(group, entry)| (group.clone(), entry.delta()))
            .collect()
    }

    fn register_task(&mut self, group: &GroupKey, task_id: TaskId) -> Result<(), RegistryError> {
        if let Some(owner) = self.owners.get(&task_id) {
            return Err(RegistryError::DuplicateTask {
                task_id,
                group: owner.clone(),
            });
        }

        let entry = self
            .groups
            .get_mut(group)
            .ok_or_else(|| RegistryError::UnknownGroup(group.clone()))?;
        entry.running.push(task_id);
        self.owners.insert(task_id, group.clone());

        debug!(group = %group, task_id = %task_id, "Registered task");
        Ok(())
    }

    fn unregister_task(&mut self, task_id: &TaskId) -> Option<GroupKey> {
        let group = self.owners.remove(task_id)?;
        if let Some(entry) = self.groups.get_mut(&group) {
            entry.running.retain(|t| t != task_id);
        }

        debug!(group = %group, task_id = %task_id, "Unregistered task");
        Some(group)
    }

    fn youngest_task(&self, group: &GroupKey) -> Option<TaskId> {
        self.groups.get(group)?.running.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> GroupKey {
        GroupKey::parse(s).unwrap()
    }

    #[test]
    fn test_deltas_track_desired_and_running() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a:9200");
        let b = key("http://b:9200");
        registry.set_desired(a.clone(), 3);
        registry.set_desired(b.clone(), 0);

        registry.register_task(&a, TaskId::new()).unwrap();
        let deltas = registry.deltas();
        assert_eq!(deltas[&a], 2);
        assert_eq!(deltas[&b], 0);
    }

    #[test]
    fn test_register_unknown_group_fails() {
        let mut registry = MemoryRegistry::new();
        let err = registry
            .register_task(&key("http://nowhere"), TaskId::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownGroup(_)));
        assert_eq!(registry.total_running(), 0);
    }

    #[test]
    fn test_register_duplicate_task_fails() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a");
        let b = key("http://b");
        registry.set_desired(a.clone(), 1);
        registry.set_desired(b.clone(), 1);

        let task = TaskId::new();
        registry.register_task(&a, task).unwrap();
        let err = registry.register_task(&b, task).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTask {
                task_id: task,
                group: a.clone()
            }
        );
        assert!(registry.running(&b).is_empty());
    }

    #[test]
    fn test_youngest_is_last_registered() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a");
        registry.set_desired(a.clone(), 3);

        let tasks: Vec<TaskId> = (0..3).map(|_| TaskId::new()).collect();
        for t in &tasks {
            registry.register_task(&a, *t).unwrap();
        }

        assert_eq!(registry.youngest_task(&a), Some(tasks[2]));
        registry.unregister_task(&tasks[2]);
        assert_eq!(registry.youngest_task(&a), Some(tasks[1]));
        assert_eq!(registry.running(&a), &tasks[..2]);
    }

    #[test]
    fn test_youngest_of_empty_or_unknown_group() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a");
        registry.set_desired(a.clone(), 1);
        assert_eq!(registry.youngest_task(&a), None);
        assert_eq!(registry.youngest_task(&key("http://b")), None);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a");
        registry.set_desired(a.clone(), 2);
        let kept = TaskId::new();
        let gone = TaskId::new();
        registry.register_task(&a, kept).unwrap();
        registry.register_task(&a, gone).unwrap();

        assert_eq!(registry.unregister_task(&gone), Some(a.clone()));
        assert_eq!(registry.unregister_task(&gone), None);
        assert_eq!(registry.unregister_task(&TaskId::new()), None);
        assert_eq!(registry.running(&a), &[kept]);
    }

    #[test]
    fn test_set_desired_returns_previous() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a");
        assert_eq!(registry.set_desired(a.clone(), 2), None);
        assert_eq!(registry.set_desired(a.clone(), 5), Some(2));
        assert_eq!(registry.desired(&a), Some(5));
    }

    #[test]
    fn test_scaling_to_zero_keeps_group() {
        let mut registry = MemoryRegistry::new();
        let a = key("http://a");
        registry.set_desired(a.clone(), 1);
        registry.register_task(&a, TaskId::new()).unwrap();
        registry.set_desired(a.clone(), 0);

        assert_eq!(registry.deltas()[&a], -1);
        let summary = registry.groups();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].running, 1);
        assert_eq!(summary[0].delta, -1);
    }
}
