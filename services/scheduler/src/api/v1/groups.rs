//! Group API endpoints.
//!
//! Operators read per-group state and change desired counts here. Changes
//! are persisted first and take effect on the next offer batch.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use fleet_id::GroupKey;
use fleet_reconcile::GroupSummary;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::error::ApiError;
use crate::state::AppState;

/// Create group routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_groups)).route(
        "/{group}",
        get(get_group).put(set_desired).delete(drain_group),
    )
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to change a group's desired count.
#[derive(Debug, Deserialize)]
pub struct SetDesiredRequest {
    pub desired: u32,
}

/// Response for listing groups.
#[derive(Debug, Serialize)]
pub struct ListGroupsResponse {
    pub groups: Vec<GroupSummary>,
    pub total_running: usize,
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_groups(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry().lock().await;
    Json(ListGroupsResponse {
        groups: registry.groups(),
        total_running: registry.total_running(),
    })
}

async fn get_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<GroupSummary>, ApiError> {
    let group = parse_group(&group)?;
    summary(&state, &group)
        .await
        .map(Json)
        .ok_or_else(|| not_found(&group))
}

async fn set_desired(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Json(req): Json<SetDesiredRequest>,
) -> Result<Json<GroupSummary>, ApiError> {
    let group = parse_group(&group)?;
    apply_desired(&state, &group, req.desired).await?;
    summary(&state, &group)
        .await
        .map(Json)
        .ok_or_else(|| not_found(&group))
}

/// Scale a group to zero. The group stays listed so its remaining tasks are
/// killed on the next pass.
async fn drain_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<GroupSummary>, ApiError> {
    let group = parse_group(&group)?;
    if state.registry().lock().await.desired(&group).is_none() {
        return Err(not_found(&group));
    }

    apply_desired(&state, &group, 0).await?;
    summary(&state, &group)
        .await
        .map(Json)
        .ok_or_else(|| not_found(&group))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_group(raw: &str) -> Result<GroupKey, ApiError> {
    GroupKey::parse(raw).map_err(|e| ApiError::bad_request("invalid_group", e.to_string()))
}

fn not_found(group: &GroupKey) -> ApiError {
    ApiError::not_found("group_not_found", format!("group {group} not found"))
}

async fn apply_desired(state: &AppState, group: &GroupKey, desired: u32) -> Result<(), ApiError> {
    state
        .store()
        .lock()
        .await
        .set_requirement(group, desired)
        .map_err(|e| {
            error!(error = %e, group = %group, "Failed to persist desired count");
            ApiError::internal("internal_error", "failed to persist desired count")
        })?;

    let previous = state
        .registry()
        .lock()
        .await
        .set_desired(group.clone(), desired);
    info!(group = %group, desired, previous = ?previous, "Desired count updated");
    Ok(())
}

async fn summary(state: &AppState, group: &GroupKey) -> Option<GroupSummary> {
    state
        .registry()
        .lock()
        .await
        .groups()
        .into_iter()
        .find(|s| &s.group == group)
}
