//! chathub - a single-room WebSocket chat hub.
//!
//! Every connected peer sees every chat message, plus announcements when
//! someone joins or leaves. A single coordination loop owns the connection
//! set; each connection runs an inbound and an outbound pump.

pub mod chat;
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod web;

pub use chat::{Message, MessageKind};
pub use config::{Config, ConnectionSettings};
pub use error::{ChatHubError, Result};
pub use hub::{Hub, HubClient};
pub use web::WebServer;
