//! Scheduler background worker.
//!
//! Drains the event channel, handling one event at a time to completion.

use fleet_events::SchedulerEvent;
use fleet_reconcile::{ResourceManagerGateway, TaskDescriptorFactory};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument};

use super::dispatcher::Scheduler;

/// Scheduler worker that feeds events to the dispatcher.
pub struct SchedulerWorker<G, F> {
    scheduler: Scheduler<G, F>,
    events: mpsc::Receiver<SchedulerEvent>,
}

impl<G, F> SchedulerWorker<G, F>
where
    G: ResourceManagerGateway,
    F: TaskDescriptorFactory,
{
    /// Create a new scheduler worker.
    pub fn new(scheduler: Scheduler<G, F>, events: mpsc::Receiver<SchedulerEvent>) -> Self {
        Self { scheduler, events }
    }

    /// Run until shutdown is signaled or every event sender is dropped.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting scheduler worker");

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed, scheduler worker stopping");
                        break;
                    };
                    let kind = event.kind();
                    if let Err(e) = self.scheduler.handle(event).await {
                        error!(event = kind, error = %e, "Failed to handle scheduler event");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Scheduler worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}
