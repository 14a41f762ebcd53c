//! Driver bridge endpoints.
//!
//! The process holding the resource-manager connection posts every callback
//! it receives as an event and polls for the commands to send back. These
//! are internal APIs, not operator-facing.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fleet_events::{EventError, SchedulerEvent};
use serde::Serialize;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

use crate::api::error::ApiError;
use crate::gateway::DriverCommand;
use crate::state::AppState;

/// Create driver routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(post_event))
        .route("/commands", get(drain_commands))
}

/// Response for an accepted event.
#[derive(Debug, Serialize)]
pub struct EventAccepted {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Response for a command drain.
#[derive(Debug, Serialize)]
pub struct CommandsResponse {
    pub commands: Vec<DriverCommand>,
}

async fn post_event(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<EventAccepted>), ApiError> {
    let event = SchedulerEvent::from_value(body).map_err(|e| match e {
        EventError::UnknownEventType(kind) => {
            ApiError::bad_request("unknown_event_type", format!("unknown event type {kind:?}"))
        }
        other => ApiError::bad_request("invalid_event", other.to_string()),
    })?;

    let kind = event.kind();
    debug!(event = kind, "Driver event received");

    state.events().send(event).await.map_err(|_| {
        warn!(event = kind, "Scheduler worker is not accepting events");
        ApiError::service_unavailable("worker_unavailable", "scheduler worker is not running")
    })?;

    Ok((StatusCode::ACCEPTED, Json(EventAccepted { kind })))
}

/// Return every queued command, oldest first.
async fn drain_commands(State(state): State<AppState>) -> Json<CommandsResponse> {
    let mut rx = state.commands().lock().await;
    let mut commands = Vec::new();

    loop {
        match rx.try_recv() {
            Ok(command) => commands.push(command),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }

    if !commands.is_empty() {
        debug!(count = commands.len(), "Drained driver commands");
    }
    Json(CommandsResponse { commands })
}
