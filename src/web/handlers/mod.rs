//! HTTP handlers and the state they share.

pub mod home;
pub mod status;

pub use home::index;
pub use status::{health_check, status, StatusResponse};

use std::path::PathBuf;

use crate::config::{Config, ConnectionSettings};
use crate::hub::Hub;
use crate::web::ws::SessionTracker;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the running hub.
    pub hub: Hub,
    /// Limits and timings applied to each WebSocket connection.
    pub settings: ConnectionSettings,
    /// Display name used when a peer does not supply one.
    pub default_username: String,
    /// Directory holding `index.html`.
    pub template_path: PathBuf,
    /// Permits for upgraded WebSocket sessions.
    pub sessions: SessionTracker,
}

impl AppState {
    /// Create the state from configuration.
    pub fn new(hub: Hub, config: &Config) -> Self {
        Self {
            hub,
            settings: config.connection_settings(),
            default_username: config.connection.default_username.clone(),
            template_path: PathBuf::from(&config.web.template_path),
            sessions: SessionTracker::new().0,
        }
    }

    /// Track sessions with `sessions`, so its drain can wait for them.
    pub fn with_sessions(mut self, sessions: SessionTracker) -> Self {
        self.sessions = sessions;
        self
    }

    /// Override the template directory.
    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = path.into();
        self
    }
}
