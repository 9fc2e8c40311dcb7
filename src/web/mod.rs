//! HTTP and WebSocket surface of the chat hub.
//!
//! Serves the chat page, upgrades `/ws` requests into hub connections and
//! exposes a small read-only status API.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
