//! Launchable task descriptors.

use std::collections::BTreeMap;

use fleet_events::{Offer, Resource};
use fleet_id::{AgentId, GroupKey, TaskId};
use serde::{Deserialize, Serialize};

/// Everything the resource manager needs to start one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: TaskId,
    pub name: String,
    pub group: GroupKey,
    pub agent_id: AgentId,
    pub resources: Vec<Resource>,
    pub container: ContainerSpec,
    pub command: CommandSpec,
}

/// Container image and networking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    pub network: NetworkMode,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
}

/// Container network mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    Host,
    #[default]
    Bridge,
}

/// Host port to container port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_port: u64,
    pub container_port: u64,
}

/// Process command line and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Run `value` through a shell instead of exec'ing it with `arguments`.
    pub shell: bool,
    pub value: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// Builds a task descriptor for a (group, offer) pair.
///
/// Implementations must be pure: no registry or offer mutation, and a fresh
/// task id for every call.
pub trait TaskDescriptorFactory {
    fn build(&self, group: &GroupKey, offer: &Offer) -> TaskDescriptor;
}
