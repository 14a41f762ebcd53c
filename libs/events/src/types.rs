//! Offer, resource and task-status types.
//!
//! These mirror the resource manager's protocol closely enough for the
//! scheduler to make decisions; fields the scheduler never reads are left out.

use chrono::{DateTime, Utc};
use fleet_id::{AgentId, OfferId, TaskId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Resource Names
// =============================================================================

/// Well-known resource names.
pub mod resource_names {
    pub const CPUS: &str = "cpus";
    pub const MEM: &str = "mem";
    pub const PORTS: &str = "ports";
}

// =============================================================================
// Resources
// =============================================================================

/// An inclusive range of values, e.g. ports `31000..=31099`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub begin: u64,
    pub end: u64,
}

impl ValueRange {
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Number of values in the range. An inverted range is empty.
    pub fn len(&self) -> u64 {
        if self.end < self.begin {
            0
        } else {
            self.end - self.begin + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The value carried by a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceValue {
    /// A quantity such as CPU units or megabytes of memory.
    Scalar(f64),

    /// A set of ranges such as port ranges.
    Ranges(Vec<ValueRange>),
}

/// A named resource within an offer or task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub value: ResourceValue,
}

impl Resource {
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Scalar(value),
        }
    }

    pub fn ranges(name: impl Into<String>, ranges: Vec<ValueRange>) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Ranges(ranges),
        }
    }

    /// The scalar quantity, or `None` for range resources.
    pub fn as_scalar(&self) -> Option<f64> {
        match self.value {
            ResourceValue::Scalar(v) => Some(v),
            ResourceValue::Ranges(_) => None,
        }
    }

    /// Total number of values across all ranges; zero for scalar resources.
    pub fn range_count(&self) -> u64 {
        match &self.value {
            ResourceValue::Scalar(_) => 0,
            ResourceValue::Ranges(ranges) => ranges.iter().map(ValueRange::len).sum(),
        }
    }
}

// =============================================================================
// Offers
// =============================================================================

/// A bundle of resources on one agent, advertised for consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Offer {
    /// First resource with the given name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Scalar quantity of the first resource with the given name.
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.resource(name).and_then(Resource::as_scalar)
    }

    /// Number of offered ports.
    pub fn port_count(&self) -> u64 {
        self.resource(resource_names::PORTS)
            .map(Resource::range_count)
            .unwrap_or(0)
    }

    /// Lowest offered port, if any non-empty port range is present.
    pub fn first_port(&self) -> Option<u64> {
        match &self.resource(resource_names::PORTS)?.value {
            ResourceValue::Ranges(ranges) => ranges
                .iter()
                .filter(|r| !r.is_empty())
                .map(|r| r.begin)
                .min(),
            ResourceValue::Scalar(_) => None,
        }
    }
}

// =============================================================================
// Task Status
// =============================================================================

/// Task state as reported by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Staging,
    Starting,
    Running,
    Killing,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl TaskState {
    /// Returns true if the task will never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Failed | Self::Killed | Self::Lost | Self::Error
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Staging => "staging",
            TaskState::Starting => "starting",
            TaskState::Running => "running",
            TaskState::Killing => "killing",
            TaskState::Finished => "finished",
            TaskState::Failed => "failed",
            TaskState::Killed => "killed",
            TaskState::Lost => "lost",
            TaskState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A status update for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    pub fn new(task_id: TaskId, state: TaskState) -> Self {
        Self {
            task_id,
            state,
            agent_id: None,
            message: None,
            timestamp: Some(Utc::now()),
        }
    }
}

/// The resource manager leader the scheduler registered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterInfo {
    pub ip: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl std::fmt::Display for MasterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
