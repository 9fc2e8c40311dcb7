//! Landing page.

use axum::{extract::State, response::Html};
use std::io::ErrorKind;
use std::sync::Arc;

use super::AppState;
use crate::web::error::ApiError;

/// Name of the page template inside the template directory.
const INDEX_TEMPLATE: &str = "index.html";

/// Serve the chat page.
///
/// GET /
///
/// The template is read on every request, so edits show up without a restart.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let path = state.template_path.join(INDEX_TEMPLATE);

    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Ok(Html(page)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("Template not found: {}", path.display());
            Err(ApiError::not_found("page not found"))
        }
        Err(e) => {
            tracing::error!("Failed to read template {}: {}", path.display(), e);
            Err(ApiError::internal("failed to load page"))
        }
    }
}
