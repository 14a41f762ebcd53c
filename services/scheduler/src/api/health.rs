//! Health check endpoints.
//!
//! These endpoints are used by load balancers and orchestration systems
//! to determine if the service is healthy and ready to receive traffic.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,

    /// Service name.
    pub service: String,

    /// Service version.
    pub version: String,

    /// Current timestamp (ISO 8601).
    pub timestamp: String,

    /// Detailed component health (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentHealth>,
}

/// Component health details.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentHealth {
    /// Framework registration with the resource manager.
    pub framework: ComponentStatus,

    /// Scheduler worker accepting events.
    pub worker: ComponentStatus,
}

/// Individual component status.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentStatus {
    /// Status: "ok", "degraded", or "unavailable".
    pub status: String,

    /// Optional message with details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    fn ok(message: Option<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message,
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: "unavailable".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Create health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

/// Basic health check - is the service running?
async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "fleet-scheduler".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        components: None,
    })
}

/// Readiness check - is the scheduler registered and consuming events?
///
/// Returns 503 until a framework id has been recorded.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let framework = match state.store().lock().await.framework() {
        Ok(Some(record)) => ComponentStatus::ok(Some(record.framework_id.to_string())),
        Ok(None) => ComponentStatus::unavailable("not registered"),
        Err(e) => {
            warn!(error = %e, "Failed to read framework registration");
            ComponentStatus::unavailable(e.to_string())
        }
    };

    let worker = if state.events().is_closed() {
        ComponentStatus::unavailable("event channel closed")
    } else {
        ComponentStatus::ok(None)
    };

    let all_ok = framework.status == "ok" && worker.status == "ok";

    let response = HealthResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        service: "fleet-scheduler".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        components: Some(ComponentHealth { framework, worker }),
    };

    if all_ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Liveness check - is the service alive?
async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
