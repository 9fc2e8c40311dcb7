//! Health and status endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;

/// Snapshot of the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Number of registered connections.
    pub connections: usize,
    /// Display names of registered connections, sorted.
    pub users: Vec<String>,
}

/// Health check handler.
///
/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Hub status.
///
/// GET /api/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    // Count and names come from one read so they always agree.
    let users = state.hub.connected_identities().await;
    Json(StatusResponse {
        connections: users.len(),
        users,
    })
}
