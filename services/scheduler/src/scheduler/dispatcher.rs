//! Event dispatch and the per-event handlers.

use fleet_events::{MasterInfo, Offer, SchedulerEvent, TaskStatus};
use fleet_id::{AgentId, ExecutorId, FrameworkId, OfferId};
use fleet_reconcile::{
    GroupRegistry, PassStats, ReconciliationEngine, ResourceManagerGateway, TaskDescriptorFactory,
};
use tracing::{debug, error, info, instrument, warn};

use super::SchedulerResult;
use crate::state::{SharedRegistry, SharedStore};

/// Reacts to resource-manager events.
pub struct Scheduler<G, F> {
    registry: SharedRegistry,
    store: SharedStore,
    engine: ReconciliationEngine,
    gateway: G,
    factory: F,
}

impl<G, F> Scheduler<G, F>
where
    G: ResourceManagerGateway,
    F: TaskDescriptorFactory,
{
    pub fn new(
        registry: SharedRegistry,
        store: SharedStore,
        engine: ReconciliationEngine,
        gateway: G,
        factory: F,
    ) -> Self {
        Self {
            registry,
            store,
            engine,
            gateway,
            factory,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Handle one event to completion.
    #[instrument(skip_all, fields(event = event.kind()))]
    pub async fn handle(&self, event: SchedulerEvent) -> SchedulerResult<()> {
        match event {
            SchedulerEvent::Registered {
                framework_id,
                master,
            } => self.on_registered(framework_id, master).await,
            SchedulerEvent::Reregistered { master } => {
                self.on_reregistered(&master);
                Ok(())
            }
            SchedulerEvent::OffersReceived { offers } => {
                self.on_offers(offers).await.map(|_| ())
            }
            SchedulerEvent::OfferRescinded { offer_id } => {
                self.on_offer_rescinded(&offer_id);
                Ok(())
            }
            SchedulerEvent::StatusUpdate(status) => {
                self.on_status_update(status).await;
                Ok(())
            }
            SchedulerEvent::FrameworkMessage {
                executor_id,
                agent_id,
                data,
            } => {
                self.on_framework_message(&executor_id, &agent_id, &data);
                Ok(())
            }
            SchedulerEvent::Disconnected => {
                self.on_disconnected();
                Ok(())
            }
            SchedulerEvent::SlaveLost { agent_id } => {
                self.on_slave_lost(&agent_id);
                Ok(())
            }
            SchedulerEvent::ExecutorLost {
                executor_id,
                agent_id,
                status,
            } => {
                self.on_executor_lost(&executor_id, &agent_id, status);
                Ok(())
            }
            SchedulerEvent::Error { message } => {
                self.on_error(&message);
                Ok(())
            }
        }
    }

    async fn on_registered(
        &self,
        framework_id: FrameworkId,
        master: MasterInfo,
    ) -> SchedulerResult<()> {
        info!(framework_id = %framework_id, master = %master, "Framework registered");
        self.store.lock().await.set_framework_id(&framework_id)?;
        Ok(())
    }

    fn on_reregistered(&self, master: &MasterInfo) {
        info!(master = %master, "Framework re-registered");
    }

    /// Run one reconciliation pass over the batch.
    pub async fn on_offers(&self, offers: Vec<Offer>) -> SchedulerResult<PassStats> {
        let mut registry = self.registry.lock().await;
        let stats = self
            .engine
            .reconcile(offers, &mut *registry, &self.gateway, &self.factory)?;
        Ok(stats)
    }

    fn on_offer_rescinded(&self, offer_id: &OfferId) {
        info!(offer_id = %offer_id, "Offer rescinded");
    }

    async fn on_status_update(&self, status: TaskStatus) {
        info!(
            task_id = %status.task_id,
            state = %status.state,
            detail = status.message.as_deref().unwrap_or(""),
            "Task status update"
        );

        if !status.state.is_terminal() {
            return;
        }

        match self.registry.lock().await.unregister_task(&status.task_id) {
            Some(group) => {
                info!(task_id = %status.task_id, group = %group, "Released terminated task")
            }
            None => debug!(task_id = %status.task_id, "Terminal status for untracked task"),
        }
    }

    fn on_framework_message(&self, executor_id: &ExecutorId, agent_id: &AgentId, data: &[u8]) {
        info!(
            executor_id = %executor_id,
            agent_id = %agent_id,
            bytes = data.len(),
            "Framework message received"
        );
    }

    fn on_disconnected(&self) {
        warn!("Disconnected from resource manager");
    }

    fn on_slave_lost(&self, agent_id: &AgentId) {
        warn!(agent_id = %agent_id, "Agent lost");
    }

    fn on_executor_lost(&self, executor_id: &ExecutorId, agent_id: &AgentId, status: i32) {
        warn!(
            executor_id = %executor_id,
            agent_id = %agent_id,
            status,
            "Executor lost"
        );
    }

    fn on_error(&self, message: &str) {
        error!(error = message, "Resource manager reported an error");
    }
}
