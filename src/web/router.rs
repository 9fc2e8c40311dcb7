//! Router configuration.

use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::handlers::{health_check, index, status, AppState};
use super::middleware::create_cors_layer;
use super::ws::chat_ws_handler;
use crate::config::WebConfig;

/// Create the main router.
///
/// - `GET /` chat page
/// - `GET /ws` WebSocket upgrade
/// - `GET /api/status` hub snapshot
/// - `GET /health` liveness check
/// - `GET /static/*` static assets, when enabled
pub fn create_router(app_state: Arc<AppState>, config: &WebConfig) -> Router {
    let api_routes = Router::new().route("/status", get(status));

    let mut router = Router::new()
        .route("/", get(index))
        .route("/ws", get(chat_ws_handler))
        .nest("/api", api_routes)
        .merge(create_health_router::<Arc<AppState>>());

    if config.serve_static {
        if let Some(static_service) = create_static_service(&config.static_path) {
            router = router.nest_service("/static", static_service);
        }
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

/// Serve files from `static_path`, or `None` if the directory is missing.
fn create_static_service(static_path: &str) -> Option<ServeDir> {
    let path = Path::new(static_path);
    if !path.is_dir() {
        tracing::warn!(
            "Static directory not found: {}. Static files will not be served.",
            static_path
        );
        return None;
    }
    tracing::info!("Serving static files from: {}", static_path);
    Some(ServeDir::new(path))
}
