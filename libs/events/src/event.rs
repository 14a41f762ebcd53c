//! Scheduler events - one variant per resource-manager callback.

use fleet_id::{AgentId, ExecutorId, FrameworkId, OfferId};
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::types::{MasterInfo, Offer, TaskStatus};

/// All event type names as constants.
pub mod event_types {
    pub const REGISTERED: &str = "registered";
    pub const REREGISTERED: &str = "reregistered";
    pub const OFFERS_RECEIVED: &str = "offers_received";
    pub const OFFER_RESCINDED: &str = "offer_rescinded";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const FRAMEWORK_MESSAGE: &str = "framework_message";
    pub const DISCONNECTED: &str = "disconnected";
    pub const SLAVE_LOST: &str = "slave_lost";
    pub const EXECUTOR_LOST: &str = "executor_lost";
    pub const ERROR: &str = "error";

    pub const ALL: &[&str] = &[
        REGISTERED,
        REREGISTERED,
        OFFERS_RECEIVED,
        OFFER_RESCINDED,
        STATUS_UPDATE,
        FRAMEWORK_MESSAGE,
        DISCONNECTED,
        SLAVE_LOST,
        EXECUTOR_LOST,
        ERROR,
    ];
}

/// An event delivered by the resource manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// The framework registered and was assigned an identity.
    Registered {
        framework_id: FrameworkId,
        master: MasterInfo,
    },

    /// The framework re-registered after a leader change.
    Reregistered { master: MasterInfo },

    /// A batch of resource offers.
    OffersReceived { offers: Vec<Offer> },

    /// An offer is no longer valid.
    OfferRescinded { offer_id: OfferId },

    /// A task changed state.
    StatusUpdate(TaskStatus),

    /// Opaque message from an executor.
    FrameworkMessage {
        executor_id: ExecutorId,
        agent_id: AgentId,
        #[serde(default)]
        data: Vec<u8>,
    },

    /// The connection to the resource manager dropped.
    Disconnected,

    /// An agent was lost; its tasks will be reported through status updates.
    SlaveLost { agent_id: AgentId },

    /// An executor exited.
    ExecutorLost {
        executor_id: ExecutorId,
        agent_id: AgentId,
        status: i32,
    },

    /// Unrecoverable driver error.
    Error { message: String },
}

impl SchedulerEvent {
    /// The event type name, as used in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registered { .. } => event_types::REGISTERED,
            Self::Reregistered { .. } => event_types::REREGISTERED,
            Self::OffersReceived { .. } => event_types::OFFERS_RECEIVED,
            Self::OfferRescinded { .. } => event_types::OFFER_RESCINDED,
            Self::StatusUpdate(_) => event_types::STATUS_UPDATE,
            Self::FrameworkMessage { .. } => event_types::FRAMEWORK_MESSAGE,
            Self::Disconnected => event_types::DISCONNECTED,
            Self::SlaveLost { .. } => event_types::SLAVE_LOST,
            Self::ExecutorLost { .. } => event_types::EXECUTOR_LOST,
            Self::Error { .. } => event_types::ERROR,
        }
    }

    /// Decode an event from a JSON value, distinguishing unknown event types
    /// from malformed payloads.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EventError> {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| EventError::InvalidPayload("missing \"type\" field".to_string()))?;

        if !event_types::ALL.contains(&kind) {
            return Err(EventError::UnknownEventType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| EventError::InvalidPayload(e.to_string()))
    }

    /// Decode an event from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }
}
