//! Outbound commands to the resource manager.

use std::time::Duration;

use fleet_id::{OfferId, TaskId};
use thiserror::Error;

use crate::task::TaskDescriptor;

/// Errors handing a command to the resource manager.
///
/// These are transport failures only. Whether a launched task actually runs
/// is reported later through status updates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The driver connection is gone.
    #[error("resource manager driver disconnected")]
    Disconnected,

    /// The outbound command buffer is full.
    #[error("command buffer full")]
    Backpressure,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Fire-and-forget command sink for the resource manager.
///
/// Implementations must not block on the resource manager's response.
pub trait ResourceManagerGateway {
    /// Decline an offer the scheduler will not use.
    fn decline_offer(&self, offer_id: &OfferId) -> Result<(), GatewayError>;

    /// Launch a task against an offer. The offer's unused resources should
    /// not be re-offered for `refuse_for`.
    fn launch_task(
        &self,
        offer_id: &OfferId,
        task: TaskDescriptor,
        refuse_for: Duration,
    ) -> Result<(), GatewayError>;

    /// Kill a running task.
    fn kill_task(&self, task_id: &TaskId) -> Result<(), GatewayError>;
}
