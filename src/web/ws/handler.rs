//! Chat WebSocket handler.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::web::handlers::AppState;

use super::connection;

/// Query parameters for WebSocket connection.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Display name chosen by the peer.
    #[serde(default)]
    pub username: Option<String>,
}

/// WebSocket chat handler.
///
/// GET /ws?username={name}
///
/// A missing or blank name falls back to the configured default. The name is
/// fixed for the lifetime of the connection.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Response {
    let username = resolve_username(query.username.as_deref(), &state.default_username);
    tracing::debug!("WebSocket upgrade requested by {}", username);

    let hub = state.hub.clone();
    let settings = state.settings.clone();
    let permit = state.sessions.permit();

    ws.max_message_size(settings.max_message_size)
        .on_upgrade(move |socket| async move {
            connection::serve(socket, username, hub, settings).await;
            drop(permit);
        })
}

/// Pick the display name for a new connection.
fn resolve_username(requested: Option<&str>, default: &str) -> String {
    match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default.to_string(),
    }
}
