//! Offer-driven reconciliation.
//!
//! This library decides, for every batch of resource offers, which tasks to
//! launch and which to kill so that each group's running count converges to
//! its desired count. Key concepts:
//!
//! - **Desired count**: how many workers a group should have (configured).
//! - **Running set**: the tasks the registry currently attributes to a group.
//! - **Delta**: desired minus running, recomputed at the start of every pass.
//!
//! # Invariants
//!
//! - Every offer handed to a pass is either launched-against or declined,
//!   exactly once
//! - A task is registered before its launch command is issued, and
//!   unregistered before its kill command is issued
//! - Assignment is greedy in delivery order; eviction takes the youngest task
//!
//! The resource-manager connection, the task descriptor builder and the
//! registry's backing store are collaborators behind the traits in
//! [`gateway`], [`task`] and [`registry`].

pub mod engine;
pub mod filter;
pub mod gateway;
pub mod registry;
pub mod task;

use std::time::Duration;

use thiserror::Error;

pub use engine::{PassStats, ReconciliationEngine};
pub use filter::OfferFilter;
pub use gateway::{GatewayError, ResourceManagerGateway};
pub use registry::{GroupRegistry, GroupSummary, MemoryRegistry, RegistryError};
pub use task::{TaskDescriptor, TaskDescriptorFactory};

/// Reconciliation errors.
///
/// Expected divergences (no acceptable offers, no task left to kill, unknown
/// task ids) are not errors; only collaborator failures surface here.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A command could not be handed to the resource manager.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The registry refused a mutation.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Default refusal window attached to launches, so the consumed offer's
/// leftover resources are not re-offered immediately.
pub const DEFAULT_REFUSE_WINDOW: Duration = Duration::from_secs(1);
