//! Test doubles for fleet crates.
//!
//! - [`OfferBuilder`] for hand-made offers
//! - [`RecordingGateway`] captures every command instead of sending it
//! - [`StaticFactory`] builds minimal task descriptors

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use fleet_events::{resource_names, Offer, Resource, ValueRange};
use fleet_id::{AgentId, GroupKey, OfferId, TaskId};
use fleet_reconcile::task::{CommandSpec, ContainerSpec, NetworkMode};
use fleet_reconcile::{GatewayError, ResourceManagerGateway, TaskDescriptor, TaskDescriptorFactory};

// =============================================================================
// Offers
// =============================================================================

/// Builder for test offers.
#[derive(Debug, Clone)]
pub struct OfferBuilder {
    offer: Offer,
}

impl OfferBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            offer: Offer {
                id: OfferId::parse(id).expect("valid offer id"),
                agent_id: AgentId::parse("agent-1").expect("valid agent id"),
                hostname: "node-1.test".to_string(),
                resources: Vec::new(),
            },
        }
    }

    pub fn agent(mut self, agent_id: &str) -> Self {
        self.offer.agent_id = AgentId::parse(agent_id).expect("valid agent id");
        self
    }

    pub fn cpus(mut self, value: f64) -> Self {
        self.offer
            .resources
            .push(Resource::scalar(resource_names::CPUS, value));
        self
    }

    pub fn mem(mut self, value: f64) -> Self {
        self.offer
            .resources
            .push(Resource::scalar(resource_names::MEM, value));
        self
    }

    pub fn ports(mut self, begin: u64, end: u64) -> Self {
        self.offer.resources.push(Resource::ranges(
            resource_names::PORTS,
            vec![ValueRange::new(begin, end)],
        ));
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.offer.resources.push(resource);
        self
    }

    pub fn build(self) -> Offer {
        self.offer
    }
}

/// An offer carrying cpus, mem and ports.
pub fn acceptable_offer(id: &str) -> Offer {
    OfferBuilder::new(id)
        .cpus(2.0)
        .mem(2048.0)
        .ports(31000, 31099)
        .build()
}

/// An offer missing ports.
pub fn unacceptable_offer(id: &str) -> Offer {
    OfferBuilder::new(id).cpus(2.0).mem(2048.0).build()
}

/// `n` acceptable offers with ids `{prefix}-0 .. {prefix}-{n-1}`.
pub fn acceptable_offers(prefix: &str, n: usize) -> Vec<Offer> {
    (0..n)
        .map(|i| acceptable_offer(&format!("{prefix}-{i}")))
        .collect()
}

// =============================================================================
// Gateway
// =============================================================================

/// A command captured by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Decline(OfferId),
    Launch {
        offer_id: OfferId,
        task: TaskDescriptor,
        refuse_for: Duration,
    },
    Kill(TaskId),
}

/// Gateway that records commands in order.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    commands: Mutex<Vec<RecordedCommand>>,
    fail_after: Option<usize>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` commands, then report the driver as disconnected.
    pub fn failing_after(n: usize) -> Self {
        Self {
            commands: Mutex::default(),
            fail_after: Some(n),
        }
    }

    fn record(&self, command: RecordedCommand) -> Result<(), GatewayError> {
        let mut commands = self.commands.lock().unwrap_or_else(|e| e.into_inner());
        if self.fail_after.is_some_and(|n| commands.len() >= n) {
            return Err(GatewayError::Disconnected);
        }
        commands.push(command);
        Ok(())
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn declined(&self) -> Vec<OfferId> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCommand::Decline(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// (offer, task) pairs in launch order.
    pub fn launched(&self) -> Vec<(OfferId, TaskDescriptor)> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCommand::Launch { offer_id, task, .. } => Some((offer_id, task)),
                _ => None,
            })
            .collect()
    }

    pub fn killed(&self) -> Vec<TaskId> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCommand::Kill(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl ResourceManagerGateway for RecordingGateway {
    fn decline_offer(&self, offer_id: &OfferId) -> Result<(), GatewayError> {
        self.record(RecordedCommand::Decline(offer_id.clone()))
    }

    fn launch_task(
        &self,
        offer_id: &OfferId,
        task: TaskDescriptor,
        refuse_for: Duration,
    ) -> Result<(), GatewayError> {
        self.record(RecordedCommand::Launch {
            offer_id: offer_id.clone(),
            task,
            refuse_for,
        })
    }

    fn kill_task(&self, task_id: &TaskId) -> Result<(), GatewayError> {
        self.record(RecordedCommand::Kill(*task_id))
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds bare descriptors; counts how many it built.
#[derive(Debug, Default)]
pub struct StaticFactory {
    built: AtomicU64,
}

impl StaticFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn built(&self) -> u64 {
        self.built.load(Ordering::SeqCst)
    }
}

impl TaskDescriptorFactory for StaticFactory {
    fn build(&self, group: &GroupKey, offer: &Offer) -> TaskDescriptor {
        self.built.fetch_add(1, Ordering::SeqCst);
        let task_id = TaskId::new();
        TaskDescriptor {
            task_id,
            name: format!("test-{}", task_id.short()),
            group: group.clone(),
            agent_id: offer.agent_id.clone(),
            resources: offer.resources.clone(),
            container: ContainerSpec {
                image: "worker:test".to_string(),
                network: NetworkMode::Bridge,
                port_mappings: Vec::new(),
            },
            command: CommandSpec {
                shell: false,
                value: "/bin/worker".to_string(),
                arguments: vec![format!("--upstream={group}")],
                environment: BTreeMap::new(),
            },
        }
    }
}
