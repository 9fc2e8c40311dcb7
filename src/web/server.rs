//! Web server for the chat hub.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::{Config, WebConfig};
use crate::hub::Hub;
use crate::{ChatHubError, Result};

use super::handlers::AppState;
use super::router::create_router;
use super::ws::{SessionDrain, SessionTracker};

/// Web server for the chat page, the WebSocket endpoint and the status API.
pub struct WebServer {
    /// Address to bind.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Web configuration.
    web_config: WebConfig,
    /// Waits for upgraded sessions, until taken.
    sessions: Option<SessionDrain>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, hub: Hub) -> Result<Self> {
        let addr = config
            .address()
            .parse()
            .map_err(|e| ChatHubError::Config(format!("invalid listen address: {e}")))?;

        Ok(Self::with_state(addr, AppState::new(hub, config), &config.web))
    }

    /// Create a web server around prepared state.
    pub fn with_state(addr: SocketAddr, app_state: AppState, web_config: &WebConfig) -> Self {
        let (tracker, drain) = SessionTracker::new();
        Self {
            addr,
            app_state: Arc::new(app_state.with_sessions(tracker)),
            web_config: web_config.clone(),
            sessions: Some(drain),
        }
    }

    /// Take the handle that waits for WebSocket sessions to end.
    ///
    /// Returns `None` after the first call.
    pub fn take_session_drain(&mut self) -> Option<SessionDrain> {
        self.sessions.take()
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> Router {
        create_router(Arc::clone(&self.app_state), &self.web_config)
            .layer(CompressionLayer::new())
    }

    /// Run the web server until `shutdown` resolves.
    ///
    /// Stops accepting new connections once `shutdown` completes and returns
    /// when in-flight requests have finished.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
