//! Application state shared across request handlers.

use std::sync::Arc;

use fleet_events::SchedulerEvent;
use fleet_reconcile::MemoryRegistry;
use tokio::sync::{mpsc, Mutex};

use crate::gateway::DriverCommand;
use crate::store::StateStore;

/// Registry shared between the worker and the API. A reconciliation pass
/// holds the lock for its whole duration.
pub type SharedRegistry = Arc<Mutex<MemoryRegistry>>;

/// State store shared between the worker and the API.
pub type SharedStore = Arc<Mutex<StateStore>>;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: SharedRegistry,
    store: SharedStore,
    events: mpsc::Sender<SchedulerEvent>,
    commands: Mutex<mpsc::Receiver<DriverCommand>>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        registry: SharedRegistry,
        store: SharedStore,
        events: mpsc::Sender<SchedulerEvent>,
        commands: mpsc::Receiver<DriverCommand>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                store,
                events,
                commands: Mutex::new(commands),
            }),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.inner.registry
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    /// Sender feeding the scheduler worker.
    pub fn events(&self) -> &mpsc::Sender<SchedulerEvent> {
        &self.inner.events
    }

    /// Commands the worker has queued for the driver.
    pub fn commands(&self) -> &Mutex<mpsc::Receiver<DriverCommand>> {
        &self.inner.commands
    }
}
