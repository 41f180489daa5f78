//! Admin/observability API.
//!
//! Read-only JSON endpoints served on the admin listener, consumed by
//! `waypointctl` and monitoring systems.

pub mod handlers;

use axum::{routing::get, Router};

use crate::http::server::AppState;
use handlers::{get_backends, get_circuits, get_health, get_stats};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/backends", get(get_backends))
        .route("/stats", get(get_stats))
        .route("/circuits", get(get_circuits))
        .with_state(state)
}
