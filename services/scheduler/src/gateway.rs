//! Outbound command queue towards the resource-manager driver.
//!
//! The driver bridge drains [`DriverCommand`]s from the receiving end (see
//! `GET /v1/driver/commands`); the engine only ever sees [`ChannelGateway`].

use std::time::Duration;

use fleet_id::{OfferId, TaskId};
use fleet_reconcile::{GatewayError, ResourceManagerGateway, TaskDescriptor};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// A command for the resource manager, as handed to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverCommand {
    Decline {
        offer_id: OfferId,
    },
    Launch {
        offer_id: OfferId,
        task: TaskDescriptor,
        /// Seconds the offer's leftover resources stay refused.
        refuse_seconds: f64,
    },
    Kill {
        task_id: TaskId,
    },
}

/// Gateway backed by a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelGateway {
    tx: mpsc::Sender<DriverCommand>,
}

impl ChannelGateway {
    pub fn new(tx: mpsc::Sender<DriverCommand>) -> Self {
        Self { tx }
    }

    /// A gateway and the receiver its commands arrive on.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DriverCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    fn send(&self, command: DriverCommand) -> Result<(), GatewayError> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(command) => {
                warn!(command = ?command, "Driver command buffer full");
                GatewayError::Backpressure
            }
            TrySendError::Closed(_) => GatewayError::Disconnected,
        })
    }
}

impl ResourceManagerGateway for ChannelGateway {
    fn decline_offer(&self, offer_id: &OfferId) -> Result<(), GatewayError> {
        self.send(DriverCommand::Decline {
            offer_id: offer_id.clone(),
        })
    }

    fn launch_task(
        &self,
        offer_id: &OfferId,
        task: TaskDescriptor,
        refuse_for: Duration,
    ) -> Result<(), GatewayError> {
        self.send(DriverCommand::Launch {
            offer_id: offer_id.clone(),
            task,
            refuse_seconds: refuse_for.as_secs_f64(),
        })
    }

    fn kill_task(&self, task_id: &TaskId) -> Result<(), GatewayError> {
        self.send(DriverCommand::Kill { task_id: *task_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (gateway, mut rx) = ChannelGateway::channel(8);
        let offer_id = OfferId::parse("o-1").unwrap();
        let task_id = TaskId::new();

        gateway.decline_offer(&offer_id).unwrap();
        gateway.kill_task(&task_id).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            DriverCommand::Decline {
                offer_id: offer_id.clone()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), DriverCommand::Kill { task_id });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_buffer_is_backpressure() {
        let (gateway, _rx) = ChannelGateway::channel(1);
        let offer_id = OfferId::parse("o-1").unwrap();

        gateway.decline_offer(&offer_id).unwrap();
        assert_eq!(
            gateway.decline_offer(&offer_id),
            Err(GatewayError::Backpressure)
        );
    }

    #[test]
    fn test_dropped_receiver_is_disconnected() {
        let (gateway, rx) = ChannelGateway::channel(4);
        drop(rx);

        assert_eq!(
            gateway.kill_task(&TaskId::new()),
            Err(GatewayError::Disconnected)
        );
    }

    #[test]
    fn test_command_wire_format() {
        let command = DriverCommand::Decline {
            offer_id: OfferId::parse("o-9").unwrap(),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "decline");
        assert_eq!(json["offer_id"], "o-9");
    }
}
