//! API v1 routes.

mod driver;
mod groups;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/groups", groups::routes())
        // Bridge for the resource-manager driver process.
        .nest("/driver", driver::routes())
}
