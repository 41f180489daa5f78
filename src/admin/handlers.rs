//! Read-only admin endpoints.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::http::stats::StatsSnapshot;

#[derive(Serialize)]
pub struct HealthSummary {
    pub status: &'static str,
    pub healthy_backends: usize,
    pub total_backends: usize,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub healthy: bool,
    pub connections: usize,
    pub weight: u32,
}

/// Overall proxy health: healthy, degraded (some backends out), or
/// unhealthy (none left). Unhealthy also flips the HTTP status to 503 so
/// orchestrators can probe this endpoint directly.
pub async fn get_health(State(state): State<AppState>) -> (StatusCode, Json<HealthSummary>) {
    let backends = state.pool.backends();
    let healthy = backends.iter().filter(|b| b.is_healthy()).count();

    let (status, code) = if healthy == 0 {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    } else if healthy < backends.len() {
        ("degraded", StatusCode::OK)
    } else {
        ("healthy", StatusCode::OK)
    };

    (
        code,
        Json(HealthSummary {
            status,
            healthy_backends: healthy,
            total_backends: backends.len(),
        }),
    )
}

pub async fn get_backends(State(state): State<AppState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .pool
        .backends()
        .iter()
        .map(|b| BackendStatus {
            address: b.address.clone(),
            healthy: b.is_healthy(),
            connections: b.connections(),
            weight: b.weight,
        })
        .collect();

    Json(statuses)
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Circuit states keyed by backend address. Empty until breakers are
/// lazily created, and always empty when the breaker is disabled.
pub async fn get_circuits(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    let circuits = state
        .breakers
        .all_breakers()
        .into_iter()
        .map(|(address, breaker_state)| (address, breaker_state.to_string()))
        .collect();

    Json(circuits)
}
